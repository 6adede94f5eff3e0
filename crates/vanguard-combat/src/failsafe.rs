//! Attack watchdog.
//!
//! Animation callbacks can be late or never arrive. The supervisor holds a
//! deadline per attack; once simulation time passes it, the owning state
//! machine forces itself back to Idle.

use vanguard_common::GameTime;

/// Deadline timer for one attack instance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FailsafeSupervisor {
    deadline: Option<GameTime>,
}

impl FailsafeSupervisor {
    /// Create a disarmed supervisor.
    #[must_use]
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm with a new deadline, replacing any previous one.
    pub fn arm(&mut self, deadline: GameTime) {
        self.deadline = Some(deadline);
    }

    /// Stop watching.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// True while a deadline is pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline.
    #[must_use]
    pub const fn deadline(&self) -> Option<GameTime> {
        self.deadline
    }

    /// Reports expiry once when `now` has reached the deadline, then disarms.
    pub fn poll(&mut self, now: GameTime) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            },
            _ => false,
        }
    }
}
