//! `sandbox-types` – wire vocabulary shared by every sandbox crate.
//!
//! Defines the closed set of bus [`Topic`]s, their JSON payloads, the
//! [`Message`] enum that ties the two together, the [`Event`] envelope routed
//! over the in-process bus, and the workspace-wide [`SandboxError`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A colour in `(white, red, green, blue)` order, one byte per channel.
pub type Wrgb = [u8; 4];

/// Named indicator colours.
pub mod colors {
    use super::Wrgb;

    /// All channels off.
    pub const BLANK: Wrgb = [0, 0, 0, 0];
    pub const RED: Wrgb = [0, 255, 0, 0];
    pub const GREEN: Wrgb = [0, 0, 255, 0];
    pub const BLUE: Wrgb = [0, 0, 0, 255];
}

// ─────────────────────────────────────────────────────────────────────────────
// Topics
// ─────────────────────────────────────────────────────────────────────────────

/// Every bus topic the sandbox consumes or produces.
///
/// `SetServoPct` is both inbound and outbound: the controller reacts to the
/// percent commands it publishes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `avr/fcm/velocity`
    Velocity,
    /// `avr/apriltags/visible`
    ApriltagsVisible,
    /// `avr/pcm/set_servo_open_close`
    SetServoOpenClose,
    /// `avr/pcm/set_servo_pct`
    SetServoPct,
    /// `avr/pcm/set_servo_abs`
    SetServoAbs,
    /// `avr/pcm/set_temp_color`
    SetTempColor,
    /// `avr/pcm/set_base_color`
    SetBaseColor,
}

impl Topic {
    /// All topics, in declaration order.
    pub const ALL: [Topic; 7] = [
        Topic::Velocity,
        Topic::ApriltagsVisible,
        Topic::SetServoOpenClose,
        Topic::SetServoPct,
        Topic::SetServoAbs,
        Topic::SetTempColor,
        Topic::SetBaseColor,
    ];

    /// Topics the controller subscribes to.
    pub const INBOUND: [Topic; 4] = [
        Topic::Velocity,
        Topic::ApriltagsVisible,
        Topic::SetServoOpenClose,
        Topic::SetServoPct,
    ];

    /// Topics the controller publishes to.
    pub const OUTBOUND: [Topic; 4] = [
        Topic::SetServoPct,
        Topic::SetServoAbs,
        Topic::SetTempColor,
        Topic::SetBaseColor,
    ];

    /// The wire name of this topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Velocity => "avr/fcm/velocity",
            Topic::ApriltagsVisible => "avr/apriltags/visible",
            Topic::SetServoOpenClose => "avr/pcm/set_servo_open_close",
            Topic::SetServoPct => "avr/pcm/set_servo_pct",
            Topic::SetServoAbs => "avr/pcm/set_servo_abs",
            Topic::SetTempColor => "avr/pcm/set_temp_color",
            Topic::SetBaseColor => "avr/pcm/set_base_color",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SandboxError::UnknownTopic(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Flight controller velocity report (m/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityPayload {
    #[serde(rename = "vX")]
    pub vx: f64,
    #[serde(rename = "vY")]
    pub vy: f64,
    #[serde(rename = "vZ")]
    pub vz: f64,
}

/// Tag position relative to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelativePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One visual-tag detection. Extra fields on the wire are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDetection {
    pub id: i32,
    pub horizontal_dist: f64,
    /// Degrees.
    pub heading: f64,
    pub pos_rel: RelativePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApriltagsVisiblePayload {
    pub tags: Vec<TagDetection>,
}

/// Open/close button press. `action` is kept as a raw string because any
/// value other than `"open"` / `"close"` must still be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServoOpenClosePayload {
    pub servo: i32,
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoPctPayload {
    pub servo: i32,
    pub percent: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoAbsPayload {
    pub servo: i32,
    pub absolute: i32,
}

/// Show `wrgb` for `time` seconds, then fall back to the base colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempColorPayload {
    pub wrgb: Wrgb,
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseColorPayload {
    pub wrgb: Wrgb,
}

/// Parsed form of [`ServoOpenClosePayload::action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoAction {
    Open,
    Close,
    Other,
}

impl From<&str> for ServoAction {
    fn from(s: &str) -> Self {
        match s {
            "open" => ServoAction::Open,
            "close" => ServoAction::Close,
            _ => ServoAction::Other,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded bus message. Exactly one variant per [`Topic`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Velocity(VelocityPayload),
    ApriltagsVisible(ApriltagsVisiblePayload),
    SetServoOpenClose(ServoOpenClosePayload),
    SetServoPct(ServoPctPayload),
    SetServoAbs(ServoAbsPayload),
    SetTempColor(TempColorPayload),
    SetBaseColor(BaseColorPayload),
}

impl Message {
    /// Convenience constructor for a `set_servo_pct` command.
    pub fn servo_pct(servo: i32, percent: i32) -> Self {
        Message::SetServoPct(ServoPctPayload { servo, percent })
    }

    /// Convenience constructor for a `set_servo_abs` command.
    pub fn servo_abs(servo: i32, absolute: i32) -> Self {
        Message::SetServoAbs(ServoAbsPayload { servo, absolute })
    }

    pub fn temp_color(wrgb: Wrgb, time: f64) -> Self {
        Message::SetTempColor(TempColorPayload { wrgb, time })
    }

    pub fn base_color(wrgb: Wrgb) -> Self {
        Message::SetBaseColor(BaseColorPayload { wrgb })
    }

    /// The topic this message travels on.
    pub fn topic(&self) -> Topic {
        match self {
            Message::Velocity(_) => Topic::Velocity,
            Message::ApriltagsVisible(_) => Topic::ApriltagsVisible,
            Message::SetServoOpenClose(_) => Topic::SetServoOpenClose,
            Message::SetServoPct(_) => Topic::SetServoPct,
            Message::SetServoAbs(_) => Topic::SetServoAbs,
            Message::SetTempColor(_) => Topic::SetTempColor,
            Message::SetBaseColor(_) => Topic::SetBaseColor,
        }
    }

    /// Decode the JSON `payload` received on `topic`.
    ///
    /// # Errors
    ///
    /// [`SandboxError::Codec`] when the payload does not match the topic's
    /// schema.
    pub fn decode(topic: Topic, payload: serde_json::Value) -> Result<Self, SandboxError> {
        let codec_err = |e: serde_json::Error| SandboxError::Codec {
            topic: topic.as_str().to_string(),
            details: e.to_string(),
        };
        let msg = match topic {
            Topic::Velocity => Message::Velocity(serde_json::from_value(payload).map_err(codec_err)?),
            Topic::ApriltagsVisible => {
                Message::ApriltagsVisible(serde_json::from_value(payload).map_err(codec_err)?)
            }
            Topic::SetServoOpenClose => {
                Message::SetServoOpenClose(serde_json::from_value(payload).map_err(codec_err)?)
            }
            Topic::SetServoPct => Message::SetServoPct(serde_json::from_value(payload).map_err(codec_err)?),
            Topic::SetServoAbs => Message::SetServoAbs(serde_json::from_value(payload).map_err(codec_err)?),
            Topic::SetTempColor => {
                Message::SetTempColor(serde_json::from_value(payload).map_err(codec_err)?)
            }
            Topic::SetBaseColor => {
                Message::SetBaseColor(serde_json::from_value(payload).map_err(codec_err)?)
            }
        };
        Ok(msg)
    }

    /// Encode the payload (without the topic) as JSON.
    pub fn encode(&self) -> Result<serde_json::Value, SandboxError> {
        let result = match self {
            Message::Velocity(p) => serde_json::to_value(p),
            Message::ApriltagsVisible(p) => serde_json::to_value(p),
            Message::SetServoOpenClose(p) => serde_json::to_value(p),
            Message::SetServoPct(p) => serde_json::to_value(p),
            Message::SetServoAbs(p) => serde_json::to_value(p),
            Message::SetTempColor(p) => serde_json::to_value(p),
            Message::SetBaseColor(p) => serde_json::to_value(p),
        };
        result.map_err(|e| SandboxError::Codec {
            topic: self.topic().as_str().to_string(),
            details: e.to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Unified event wrapper for the in-process bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "sandbox-middleware::bridge"
    pub source: String,
    pub payload: Message,
}

impl Event {
    /// Wrap `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: Message) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }

    pub fn topic(&self) -> Topic {
        self.payload.topic()
    }
}

/// Global error type spanning bus, codec, bridge and configuration failures.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SandboxError {
    #[error("Bus Channel Error: {0}")]
    Channel(String),

    #[error("Unknown Topic: {0}")]
    UnknownTopic(String),

    #[error("Codec Error on {topic}: {details}")]
    Codec { topic: String, details: String },

    #[error("Bridge Error: {0}")]
    Bridge(String),

    #[error("Config Error: {0}")]
    Config(String),
}
