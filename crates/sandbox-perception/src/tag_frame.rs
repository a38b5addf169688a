//! Tag-relative positioning.
//!
//! The tag detector reports a tag's offset from the camera together with the
//! vehicle heading. [`TagFrame`] rotates that offset by the heading and then
//! corrects for the camera's fixed downward tilt, yielding how far ahead of and
//! to the side of the vehicle's reference point the tag sits.
//!
//! # Example
//!
//! ```rust
//! use sandbox_perception::tag_frame::TagFrame;
//! use sandbox_types::RelativePosition;
//!
//! let pos = TagFrame::default().derive(0.0, RelativePosition { x: 0.0, y: 10.0, z: 0.0 });
//! assert!((pos.f_dist - 41.0).abs() < 1e-9);
//! assert!((pos.s_dist - 10.0).abs() < 1e-9);
//! ```

use sandbox_types::{RelativePosition, TagDetection};

/// Sine of the camera's 25° mounting tilt.
pub const CAMERA_TILT_SIN: f64 = 0.422618262;
/// Cosine of the camera's 25° mounting tilt.
pub const CAMERA_TILT_COS: f64 = 0.906307787;
/// Distance from the camera to the vehicle reference point along the forward
/// axis, in the detector's units.
pub const FORWARD_MOUNT_OFFSET: f64 = 41.0;

/// Tag position after heading rotation and tilt correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPosition {
    pub x_rot: f64,
    pub y_rot: f64,
    /// Forward distance from the reference point.
    pub f_dist: f64,
    /// Side distance from the reference point.
    pub s_dist: f64,
    pub height: f64,
}

/// Camera calibration used to derive tag positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagFrame {
    pub tilt_sin: f64,
    pub tilt_cos: f64,
    pub forward_offset: f64,
}

impl Default for TagFrame {
    fn default() -> Self {
        Self {
            tilt_sin: CAMERA_TILT_SIN,
            tilt_cos: CAMERA_TILT_COS,
            forward_offset: FORWARD_MOUNT_OFFSET,
        }
    }
}

impl TagFrame {
    /// Derive the tag position for a vehicle heading of `heading_deg`.
    pub fn derive(&self, heading_deg: f64, rel: RelativePosition) -> DerivedPosition {
        let (sin_h, cos_h) = heading_deg.to_radians().sin_cos();
        let x_rot = -rel.x * sin_h + rel.y * cos_h;
        let y_rot = rel.x * cos_h + rel.y * sin_h;

        DerivedPosition {
            x_rot,
            y_rot,
            f_dist: self.forward_offset + rel.z * self.tilt_sin + y_rot * self.tilt_cos,
            s_dist: x_rot,
            height: -rel.z * self.tilt_cos + y_rot * self.tilt_sin,
        }
    }

    /// Shorthand for [`derive`](Self::derive) on a detection.
    pub fn derive_detection(&self, detection: &TagDetection) -> DerivedPosition {
        self.derive(detection.heading, detection.pos_rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn rel(x: f64, y: f64, z: f64) -> RelativePosition {
        RelativePosition { x, y, z }
    }

    #[test]
    fn zero_heading_forward_tag() {
        let pos = TagFrame::default().derive(0.0, rel(0.0, 10.0, 0.0));
        assert!((pos.x_rot - 10.0).abs() < EPS);
        assert!(pos.y_rot.abs() < EPS);
        assert!((pos.f_dist - 41.0).abs() < EPS);
        assert!((pos.s_dist - 10.0).abs() < EPS);
        assert!(pos.height.abs() < EPS);
    }

    #[test]
    fn quarter_turn_swaps_axes() {
        // sin(90°) = 1, cos(90°) = 0 -> x_rot = -x, y_rot = y
        let pos = TagFrame::default().derive(90.0, rel(3.0, 5.0, 0.0));
        assert!((pos.x_rot + 3.0).abs() < 1e-6);
        assert!((pos.y_rot - 5.0).abs() < 1e-6);
        assert!((pos.s_dist + 3.0).abs() < 1e-6);
        assert!((pos.f_dist - (41.0 + 5.0 * CAMERA_TILT_COS)).abs() < 1e-6);
        assert!((pos.height - 5.0 * CAMERA_TILT_SIN).abs() < 1e-6);
    }

    #[test]
    fn depth_feeds_forward_distance_and_height() {
        let pos = TagFrame::default().derive(0.0, rel(0.0, 0.0, 100.0));
        assert!((pos.f_dist - (41.0 + 100.0 * CAMERA_TILT_SIN)).abs() < EPS);
        assert!((pos.height + 100.0 * CAMERA_TILT_COS).abs() < EPS);
    }

    #[test]
    fn tilt_constants_match_25_degrees() {
        let tilt = 25.0_f64.to_radians();
        assert!((tilt.sin() - CAMERA_TILT_SIN).abs() < 1e-8);
        assert!((tilt.cos() - CAMERA_TILT_COS).abs() < 1e-8);
    }

    #[test]
    fn derive_detection_uses_heading_and_offset() {
        let detection = TagDetection {
            id: 2,
            horizontal_dist: 0.0,
            heading: 180.0,
            pos_rel: rel(1.0, 2.0, 0.0),
        };
        let pos = TagFrame::default().derive_detection(&detection);
        // sin(180°) ~ 0, cos(180°) = -1
        assert!((pos.x_rot + 2.0).abs() < 1e-6);
        assert!((pos.y_rot + 1.0).abs() < 1e-6);
    }
}
