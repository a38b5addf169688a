//! `sandbox-runtime` – the reactive control loop.
//!
//! # Modules
//!
//! - [`controller`] – [`TagReactiveController`][controller::TagReactiveController]:
//!   maps inbound servo, velocity and tag messages to servo and indicator
//!   commands, including the large dumper's timed open/close animation.
//! - [`deferred`] – [`DeferredQueue`][deferred::DeferredQueue]: the timer
//!   queue behind every delay, chaining deadlines per actuator so timed
//!   sequences never overlap.
//! - [`dispatcher`] – [`Dispatcher`][dispatcher::Dispatcher]: the single task
//!   that owns the controller, feeds it bus events and fires its timers.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod controller;
pub mod deferred;
pub mod dispatcher;
pub mod telemetry;

pub use controller::{Actuator, ControllerConfig, Deferred, ServoState, TagReactiveController};
pub use deferred::DeferredQueue;
pub use dispatcher::{CONTROLLER_SOURCE, Dispatcher};
pub use telemetry::{TracerProviderGuard, init_tracing};
