//! `sandbox-middleware` – message plumbing for the sandbox.
//!
//! Routes decoded bus messages between the controller and the outside world
//! without caring about their meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.
//! - [`bridge`] – WebSocket bridge that exchanges JSON `{topic, payload}`
//!   frames with an external relay in front of the vehicle's broker.

pub mod bridge;
pub mod bus;

pub use bridge::{BRIDGE_SOURCE, BusBridge, ECHO_WINDOW, EchoFilter, Frame, decode_text};
pub use bus::{EventBus, TopicReceiver, TopicSetSubscriber};
pub use sandbox_types::Topic;
