//! [`DeferredQueue`] – per-actuator timer queue.
//!
//! Holds follow-up work that must run after a fixed delay. Items are keyed by
//! the actuator they belong to, and the deadline of a new item is chained
//! after the last pending deadline of the same key, so the timed sequences of
//! one actuator run back to back and never overlap.
//!
//! The queue never sleeps itself. The owner asks for
//! [`next_deadline`](DeferredQueue::next_deadline), waits until then, and calls
//! [`pop_due`](DeferredQueue::pop_due).
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use sandbox_runtime::deferred::DeferredQueue;
//!
//! let mut queue = DeferredQueue::new();
//! let t0 = Instant::now();
//! queue.schedule("dumper", Duration::from_secs(1), t0, "settle");
//! // Chained after the first item, not 0.5 s from now.
//! let second = queue.schedule("dumper", Duration::from_millis(500), t0, "release");
//! assert_eq!(second, t0 + Duration::from_millis(1500));
//!
//! assert!(queue.pop_due(t0 + Duration::from_secs(1)) == vec![("dumper", "settle")]);
//! ```

use std::time::Duration;

use tokio::time::Instant;

struct Entry<K, T> {
    key: K,
    deadline: Instant,
    item: T,
}

/// Deadline-ordered queue of deferred items with per-key FIFO chaining.
pub struct DeferredQueue<K, T> {
    /// Sorted by deadline; equal deadlines keep insertion order.
    entries: Vec<Entry<K, T>>,
}

impl<K, T> Default for DeferredQueue<K, T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: Copy + Eq, T> DeferredQueue<K, T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `item` for `key` to run `delay` after the later of `now` and the
    /// last pending deadline for `key`.
    ///
    /// Returns the deadline assigned to the item.
    pub fn schedule(&mut self, key: K, delay: Duration, now: Instant, item: T) -> Instant {
        let start = match self.last_deadline(key) {
            Some(last) if last > now => last,
            _ => now,
        };
        let deadline = start + delay;
        let pos = self.entries.partition_point(|e| e.deadline <= deadline);
        self.entries.insert(pos, Entry { key, deadline, item });
        deadline
    }

    /// Latest pending deadline for `key`.
    pub fn last_deadline(&self, key: K) -> Option<Instant> {
        self.entries
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.deadline)
            .max()
    }

    /// Earliest pending deadline across all keys.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.first().map(|e| e.deadline)
    }

    /// Remove and return every item whose deadline is at or before `now`, in
    /// deadline order.
    pub fn pop_due(&mut self, now: Instant) -> Vec<(K, T)> {
        let due = self.entries.partition_point(|e| e.deadline <= now);
        self.entries.drain(..due).map(|e| (e.key, e.item)).collect()
    }

    /// Drop everything. Returns how many items were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Number of pending items for `key`.
    pub fn pending(&self, key: K) -> usize {
        self.entries.iter().filter(|e| e.key == key).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn nothing_is_due_before_the_deadline() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(1, ms(750), t0, "a");

        assert!(q.pop_due(t0 + ms(749)).is_empty());
        assert_eq!(q.pop_due(t0 + ms(750)), vec![(1, "a")]);
        assert!(q.next_deadline().is_none());
    }

    #[test]
    fn same_key_items_are_chained() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        let first = q.schedule(4, ms(1000), t0, "first");
        let second = q.schedule(4, ms(750), t0 + ms(200), "second");

        assert_eq!(first, t0 + ms(1000));
        assert_eq!(second, t0 + ms(1750));
        assert_eq!(q.pending(4), 2);

        assert_eq!(q.pop_due(t0 + ms(1000)), vec![(4, "first")]);
        assert!(q.pop_due(t0 + ms(1500)).is_empty());
        assert_eq!(q.pop_due(t0 + ms(1750)), vec![(4, "second")]);
    }

    #[test]
    fn chaining_restarts_from_now_once_idle() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(4, ms(100), t0, ());
        q.pop_due(t0 + ms(100));

        let deadline = q.schedule(4, ms(100), t0 + ms(500), ());
        assert_eq!(deadline, t0 + ms(600));
    }

    #[test]
    fn different_keys_do_not_chain() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(4, ms(1000), t0, "large");
        let small = q.schedule(5, ms(130), t0, "small");

        assert_eq!(small, t0 + ms(130));
        assert_eq!(q.next_deadline(), Some(t0 + ms(130)));
        assert_eq!(q.pop_due(t0 + ms(1000)), vec![(5, "small"), (4, "large")]);
    }

    #[test]
    fn equal_deadlines_keep_insertion_order() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(1, ms(10), t0, "a");
        q.schedule(2, ms(10), t0, "b");
        q.schedule(3, ms(10), t0, "c");

        let keys: Vec<_> = q.pop_due(t0 + ms(10)).into_iter().map(|(_, v)| v).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn cancel_all_empties_every_key() {
        let t0 = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(4, ms(10), t0, ());
        q.schedule(4, ms(10), t0, ());
        q.schedule(5, ms(10), t0, ());

        assert_eq!(q.cancel_all(), 3);
        assert_eq!(q.pending(4), 0);
        assert!(q.next_deadline().is_none());
    }
}
