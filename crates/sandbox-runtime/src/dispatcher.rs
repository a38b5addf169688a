//! [`Dispatcher`] – the single task that owns the controller.
//!
//! Each turn of the loop waits for whichever comes first:
//!
//! 1. **Shutdown** – the watch channel flips to `true` (or its sender is
//!    dropped). Pending deferred work is cancelled and the loop exits.
//! 2. **Deferred deadline** – the controller's earliest timer expires; due
//!    items run and their commands are published.
//! 3. **Inbound event** – the next event on one of [`Topic::INBOUND`] is
//!    handed to [`TagReactiveController::handle`].
//!
//! Every command the controller emits on an inbound topic (in practice its own
//! `set_servo_pct`) is handed straight back to it. That is the only path by
//! which the controller observes its own output: copies of its events on the
//! bus are skipped, and the bridge drops a relay's echo of forwarded frames.
//! Percents published by anyone else are handled as usual.

use std::collections::VecDeque;
use std::sync::Arc;

use sandbox_middleware::{EventBus, TopicSetSubscriber};
use sandbox_types::{Event, Message, Topic};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::controller::TagReactiveController;

/// Source tag stamped on every event the controller publishes.
pub const CONTROLLER_SOURCE: &str = "sandbox-runtime::controller";

/// Drives a [`TagReactiveController`] from the bus.
pub struct Dispatcher {
    controller: TagReactiveController,
    bus: Arc<EventBus>,
    inbound: TopicSetSubscriber,
}

impl Dispatcher {
    /// Subscribe to the inbound topics right away so nothing published after
    /// construction is missed.
    pub fn new(controller: TagReactiveController, bus: Arc<EventBus>) -> Self {
        let inbound = bus.subscribe_topics(&Topic::INBOUND);
        Self {
            controller,
            bus,
            inbound,
        }
    }

    /// Run until shutdown or until the bus closes. Returns the controller so
    /// callers can inspect its final state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> TagReactiveController {
        info!("dispatcher started");
        while !*shutdown.borrow() {
            let deadline = self.controller.next_deadline();
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = sleep_until(deadline) => {
                    let out = self.controller.poll_due(Instant::now());
                    self.publish_all(out);
                }
                event = self.inbound.recv() => {
                    let Some(event) = event else {
                        info!("bus closed");
                        break;
                    };
                    if event.source == CONTROLLER_SOURCE {
                        continue;
                    }
                    let out = self.controller.handle(&event.payload, Instant::now());
                    self.publish_all(out);
                }
            }
        }

        let dropped = self.controller.cancel_pending();
        info!(dropped, "dispatcher stopped");
        self.controller
    }

    /// Publish `messages` and loop those on inbound topics back into the
    /// controller, publishing whatever that produces in turn.
    fn publish_all(&mut self, messages: Vec<Message>) {
        let mut queue = VecDeque::from(messages);
        while let Some(message) = queue.pop_front() {
            let topic = message.topic();
            let loop_back = Topic::INBOUND.contains(&topic).then(|| message.clone());
            if let Err(e) = self.bus.publish(Event::new(CONTROLLER_SOURCE, message)) {
                warn!(%topic, error = %e, "publish failed");
            }
            if let Some(message) = loop_back {
                queue.extend(self.controller.handle(&message, Instant::now()));
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
