//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! Each [`Topic`] gets its own channel. Every publish is additionally mirrored
//! onto a global channel so that a consumer interested in several topics can
//! read them through one [`TopicSetSubscriber`] in arrival order.

use std::collections::HashMap;

use sandbox_types::{Event, SandboxError, Topic};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
pub const DEFAULT_CAPACITY: usize = 256;

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    global: broadcast::Sender<Event>,
    topics: HashMap<Topic, broadcast::Sender<Event>>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, as [`broadcast::channel`] does.
    pub fn new(capacity: usize) -> Self {
        let (global, _) = broadcast::channel(capacity);
        let topics = Topic::ALL
            .into_iter()
            .map(|topic| (topic, broadcast::channel(capacity).0))
            .collect();
        Self { global, topics }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of topic receivers that were handed the event.
    /// Returns `Ok(0)` when no subscribers are currently listening on the
    /// topic (this is a normal condition, not an error).
    ///
    /// # Errors
    ///
    /// [`SandboxError::Channel`] when `topic` disagrees with the topic of the
    /// event's message.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, SandboxError> {
        if event.topic() != topic {
            return Err(SandboxError::Channel(format!(
                "event for {} published on {}",
                event.topic(),
                topic
            )));
        }
        // A send error only means nobody is listening right now.
        let _ = self.global.send(event.clone());
        Ok(self.topic_sender(topic).send(event).unwrap_or(0))
    }

    /// Publish `event` on the topic of its own message.
    pub fn publish(&self, event: Event) -> Result<usize, SandboxError> {
        self.publish_to(event.topic(), event)
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Subscribe to every event whose topic is in `topics`, in publish order.
    pub fn subscribe_topics(&self, topics: &[Topic]) -> TopicSetSubscriber {
        TopicSetSubscriber {
            topics: topics.to_vec(),
            receiver: self.global.subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        // Every topic is inserted in `new`.
        &self.topics[&topic]
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

// ---------------------------------------------------------------------------
// Multi-topic subscriber
// ---------------------------------------------------------------------------

/// A subscriber that only delivers events whose topic is in its set.
pub struct TopicSetSubscriber {
    topics: Vec<Topic>,
    receiver: broadcast::Receiver<Event>,
}

impl TopicSetSubscriber {
    /// Wait for the next event that matches this subscriber's topic set.
    ///
    /// Returns `None` when the bus is closed and no further events will arrive.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.topics.contains(&event.topic()) => {
                    return Some(event);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topics = ?self.topics, lagged_by = n, "TopicSetSubscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Topics accepted by this subscriber.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }
}
