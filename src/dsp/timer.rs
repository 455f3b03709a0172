//! The engine's single logical timer queue, keyed on context sample time.
//!
//! Scheduling hands back a [`TimerToken`]. Cancelling removes the timer
//! synchronously, so a cancelled timer can never be returned by
//! [`TimerQueue::pop_due`].

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(u64);

#[derive(Debug)]
pub struct TimerQueue<T> {
    /// Ordered by (due sample, token) so equal deadlines fire in schedule order.
    pending: BTreeMap<(u64, TimerToken), T>,
    next_token: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        TimerQueue {
            pending: BTreeMap::new(),
            next_token: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: u64, payload: T) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.pending.insert((due, token), payload);
        token
    }

    /// Remove a pending timer. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let key = self.pending.keys().find(|(_, t)| *t == token).copied();
        match key {
            Some(k) => self.pending.remove(&k).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.keys().any(|(_, t)| *t == token)
    }

    /// Earliest deadline still pending.
    pub fn next_due(&self) -> Option<u64> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Pop the earliest timer if it is due at `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<(TimerToken, T)> {
        let (due, token) = *self.pending.keys().next()?;
        if due > now {
            return None;
        }
        self.pending.remove(&(due, token)).map(|p| (token, p))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
