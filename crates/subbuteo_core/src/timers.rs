//! Cancellable one-shot timers driven by the caller's clock.
//!
//! Nothing here blocks or spawns: a [`TimerQueue`] only remembers what is due
//! when, and [`TimerQueue::drain_due`] hands back the payloads whose deadline
//! has passed. Cancelling a handle guarantees its payload is never returned.

use serde::{Deserialize, Serialize};

/// Opaque handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Scheduled<E> {
    handle: TimerHandle,
    due_ms: u64,
    payload: E,
}

/// Pending timers, fired in `(due time, scheduling order)` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerQueue<E> {
    next_id: u64,
    pending: Vec<Scheduled<E>>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            next_id: 1,
            pending: Vec::new(),
        }
    }
}

impl<E> TimerQueue<E> {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire at `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, payload: E) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled {
            handle,
            due_ms,
            payload,
        });
        handle
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        before != self.pending.len()
    }

    /// Cancel every pending timer.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Whether `handle` is still pending.
    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|t| t.due_ms).min()
    }

    /// Remove and return the earliest timer due at or before `now_ms`.
    ///
    /// Popping one at a time lets the caller cancel or schedule timers in
    /// reaction to each payload before the next one is considered.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerHandle, u64, E)> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.handle))
            .map(|(i, _)| i)?;
        let timer = self.pending.remove(index);
        Some((timer.handle, timer.due_ms, timer.payload))
    }

    /// Remove and return every payload due at or before `now_ms`, in order.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<(TimerHandle, E)> {
        let mut fired = Vec::new();
        while let Some((handle, _, payload)) = self.pop_due(now_ms) {
            fired.push((handle, payload));
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(300, "c");
        queue.schedule(100, "a");
        queue.schedule(200, "b");

        let fired: Vec<_> = queue.drain_due(250).into_iter().map(|(_, e)| e).collect();
        assert_eq!(fired, vec!["a", "b"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_due(), Some(300));
    }

    #[test]
    fn test_ties_fire_in_scheduling_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(100, 1);
        queue.schedule(100, 2);
        queue.schedule(100, 3);
        let fired: Vec<_> = queue.drain_due(100).into_iter().map(|(_, e)| e).collect();
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(100, "toss");
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert!(queue.drain_due(10_000).is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let mut queue = TimerQueue::new();
        let a = queue.schedule(1, ());
        queue.schedule(2, ());
        queue.cancel_all();
        assert!(queue.is_empty());
        assert!(!queue.is_pending(a));
    }

    #[test]
    fn test_handles_are_unique_after_cancel() {
        let mut queue = TimerQueue::new();
        let a = queue.schedule(1, ());
        queue.cancel(a);
        let b = queue.schedule(1, ());
        assert_ne!(a, b);
    }
}
