//! Cancellable delayed actions polled against the host clock.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<T> {
    due_ms: f64,
    payload: T,
}

/// Pending timers, fired in due order with ties broken by scheduling order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: BTreeMap<TimerId, Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn schedule(&mut self, due_ms: f64, payload: T) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.entries.insert(id, Entry { due_ms, payload });
        id
    }

    /// Returns whether the timer was still pending. Cancelling a fired or
    /// cancelled timer is a no-op.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Cancels everything, returning how many timers were pending.
    pub fn clear(&mut self) -> usize {
        let pending = self.entries.len();
        self.entries.clear();
        pending
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns the earliest timer due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(f64, T)> {
        let id = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.due_ms <= now_ms)
            .min_by(|(a_id, a), (b_id, b)| a.due_ms.total_cmp(&b.due_ms).then(a_id.cmp(b_id)))
            .map(|(id, _)| *id)?;
        self.entries
            .remove(&id)
            .map(|entry| (entry.due_ms, entry.payload))
    }
}
