/// Frame-driven timers: cancellable scheduled continuations and one-shot
/// countdowns.
///
/// Nothing here reads a wall clock. Time only moves when the owner calls
/// `advance`/`tick` with the frame delta, which keeps every timer
/// deterministic under test.

use std::time::Duration;

/// Cancellation token for a scheduled continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    due: Duration,
    payload: T,
}

/// A set of pending continuations keyed by due time.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Time elapsed since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `payload` to fire once `delay` has elapsed.
    pub fn schedule(&mut self, delay: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due: self.now + delay,
            payload,
        });
        id
    }

    /// Cancel a pending continuation. Returns false if it already fired or
    /// was cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Move time forward by `dt` and return every payload that came due,
    /// earliest first. Ties keep scheduling order.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now += dt;
        let now = self.now;

        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.due <= now);
        self.entries = pending;

        // Ids are monotonic, so they break ties in scheduling order.
        due.sort_by_key(|e| (e.due, e.id.0));
        due.into_iter().map(|e| e.payload).collect()
    }
}

/// A single one-shot timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: Option<Duration>,
}

impl Countdown {
    /// Start (or restart) the countdown.
    pub fn start(&mut self, duration: Duration) {
        self.remaining = if duration.is_zero() {
            None
        } else {
            Some(duration)
        };
    }

    pub fn clear(&mut self) {
        self.remaining = None;
    }

    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn remaining(&self) -> Duration {
        self.remaining.unwrap_or(Duration::ZERO)
    }

    /// Advance by `dt`. Returns true on the tick the countdown expires.
    pub fn tick(&mut self, dt: Duration) -> bool {
        match self.remaining {
            Some(left) if left <= dt => {
                self.remaining = None;
                true
            }
            Some(left) => {
                self.remaining = Some(left - dt);
                false
            }
            None => false,
        }
    }
}
