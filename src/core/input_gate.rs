/// Input gate — drops advance/choose signals during cooldown windows.

use std::time::Duration;

use crate::core::scheduler::Countdown;

/// Answers one question: is player input accepted right now?
///
/// Suppressed signals are dropped, never queued. Two windows feed the
/// lock: the cooldown armed on dialogue entry, and a short debounce
/// re-armed after every accepted signal.
#[derive(Debug, Clone, Default)]
pub struct InputGate {
    cooldown: Countdown,
    debounce: Duration,
}

impl InputGate {
    /// A gate that re-locks for `debounce` after each accepted signal.
    /// A zero debounce disables the per-signal lock.
    pub fn new(debounce: Duration) -> Self {
        Self {
            cooldown: Countdown::default(),
            debounce,
        }
    }

    pub fn arm(&mut self, cooldown: Duration) {
        self.cooldown.start(cooldown);
    }

    pub fn is_locked(&self) -> bool {
        self.cooldown.is_running()
    }

    /// Force the lock open.
    pub fn release(&mut self) {
        self.cooldown.clear();
    }

    /// Consume a signal. Returns false if it must be dropped.
    pub fn accept(&mut self) -> bool {
        if self.is_locked() {
            return false;
        }
        self.cooldown.start(self.debounce);
        true
    }

    /// Returns true on the tick the lock clears.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.cooldown.tick(dt)
    }
}
