//! WebSocket bridge between the in-process [`EventBus`] and an external relay.
//!
//! The sandbox never talks to the vehicle's MQTT broker itself. A relay on the
//! vehicle forwards broker traffic over a WebSocket as JSON text frames:
//!
//! ```json
//! {"topic": "avr/pcm/set_servo_pct", "payload": {"servo": 4, "percent": 100}}
//! ```
//!
//! [`BusBridge`]:
//!
//! 1. **Ingests** frames from connected clients, decodes them into
//!    [`Message`]s and publishes them onto the bus.
//! 2. **Forwards** every event on the outbound topics to every client using
//!    the same frame shape.
//!
//! A relay subscribed to the same broker topics it publishes to sends every
//! forwarded frame straight back. Each connection remembers what it forwarded
//! recently ([`EchoFilter`]) and drops the matching inbound copy, so an
//! outbound command reaches the bus once.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use sandbox_types::{Event, Message, SandboxError, Topic};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite};
use tracing::{debug, error, info, trace};

use crate::bus::EventBus;

/// Source tag stamped on events that arrived through the bridge.
pub const BRIDGE_SOURCE: &str = "sandbox-middleware::bridge";

/// One JSON text frame on the bridge WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl Frame {
    /// Build the frame for `message`.
    pub fn from_message(message: &Message) -> Result<Self, SandboxError> {
        Ok(Self {
            topic: message.topic().as_str().to_string(),
            payload: message.encode()?,
        })
    }

    /// Decode the frame into a typed [`Message`].
    ///
    /// # Errors
    ///
    /// [`SandboxError::UnknownTopic`] or [`SandboxError::Codec`].
    pub fn into_message(self) -> Result<Message, SandboxError> {
        let topic: Topic = self.topic.parse()?;
        Message::decode(topic, self.payload)
    }
}

/// Forwarded messages still awaiting their echo on one connection.
pub const ECHO_WINDOW: usize = 64;

/// Per-connection record of forwarded messages, used to recognise echoes.
#[derive(Debug, Default)]
pub struct EchoFilter {
    forwarded: VecDeque<Message>,
}

impl EchoFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a message sent to the relay. The oldest entry is forgotten
    /// once [`ECHO_WINDOW`] is exceeded.
    pub fn record(&mut self, message: Message) {
        if self.forwarded.len() == ECHO_WINDOW {
            self.forwarded.pop_front();
        }
        self.forwarded.push_back(message);
    }

    /// Whether `message` is the echo of a recorded one. A match consumes the
    /// record, so a second identical frame is treated as new traffic.
    pub fn is_echo(&mut self, message: &Message) -> bool {
        match self.forwarded.iter().position(|m| m == message) {
            Some(pos) => {
                self.forwarded.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Bridge between relay WebSocket clients and the internal [`EventBus`].
#[derive(Clone)]
pub struct BusBridge {
    bus: Arc<EventBus>,
}

impl BusBridge {
    /// Create a new bridge backed by `bus`.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Decode one text frame and publish it on the bus.
    ///
    /// Returns the number of receivers the event was handed to.
    pub fn ingest_text(&self, text: &str) -> Result<usize, SandboxError> {
        let message = decode_text(text)?;
        self.bus.publish(Event::new(BRIDGE_SOURCE, message))
    }

    /// Bind a WebSocket server on `addr` and serve clients forever.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Bridge`] if the TCP listener cannot be bound.
    pub async fn run_ws_server(self, addr: SocketAddr) -> Result<(), SandboxError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SandboxError::Bridge(format!("ws bind error on {addr}: {e}")))?;
        info!(%addr, "bus bridge listening");
        self.serve(listener).await
    }

    /// Serve clients on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), SandboxError> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let bridge = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = bridge.handle_ws_client(stream, peer).await {
                            error!(peer = %peer, error = %e, "ws client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "ws accept error");
                }
            }
        }
    }

    async fn handle_ws_client(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), SandboxError> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| SandboxError::Bridge(format!("ws handshake from {peer}: {e}")))?;
        info!(peer = %peer, "relay connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut outbound = self.bus.subscribe_topics(&Topic::OUTBOUND);
        let mut echoes = EchoFilter::new();

        loop {
            tokio::select! {
                event = outbound.recv() => {
                    let Some(event) = event else { break };
                    // Do not echo a relay's own frames back to it.
                    if event.source == BRIDGE_SOURCE {
                        continue;
                    }
                    let frame = Frame::from_message(&event.payload)?;
                    let json = serde_json::to_string(&frame)
                        .map_err(|e| SandboxError::Bridge(e.to_string()))?;
                    if ws_tx.send(tungstenite::Message::Text(json.into())).await.is_err() {
                        break;
                    }
                    echoes.record(event.payload);
                }
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            let message = match decode_text(text.as_str()) {
                                Ok(message) => message,
                                Err(e) => {
                                    debug!(peer = %peer, error = %e, "dropping relay frame");
                                    continue;
                                }
                            };
                            if echoes.is_echo(&message) {
                                trace!(peer = %peer, topic = %message.topic(), "dropping relay echo");
                                continue;
                            }
                            if let Err(e) = self.bus.publish(Event::new(BRIDGE_SOURCE, message)) {
                                debug!(peer = %peer, error = %e, "dropping relay frame");
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        info!(peer = %peer, "relay disconnected");
        Ok(())
    }
}

/// Parse one text frame into a typed [`Message`].
pub fn decode_text(text: &str) -> Result<Message, SandboxError> {
    let frame: Frame = serde_json::from_str(text).map_err(|e| SandboxError::Codec {
        topic: "<frame>".to_string(),
        details: e.to_string(),
    })?;
    frame.into_message()
}
