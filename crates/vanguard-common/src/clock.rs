//! Simulation clock.
//!
//! The clock only moves forward: every tick adds a non-negative delta to the
//! running total. Deltas that are negative, NaN or infinite count as zero.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Absolute simulation time in seconds.
pub type GameTime = f64;

/// Monotonic simulation clock advanced once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    now: GameTime,
    last_delta: f32,
    ticks: u64,
}

impl SimClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: 0.0,
            last_delta: 0.0,
            ticks: 0,
        }
    }

    /// Creates a clock starting at the given time.
    #[must_use]
    pub fn starting_at(now: GameTime) -> Self {
        Self {
            now: now.max(0.0),
            ..Self::new()
        }
    }

    /// Advances by `dt` seconds and returns the sanitized delta actually applied.
    pub fn advance(&mut self, dt: f32) -> f32 {
        let dt = sanitize_delta(dt);
        self.now += f64::from(dt);
        self.last_delta = dt;
        self.ticks += 1;
        dt
    }

    /// Current time in seconds.
    #[must_use]
    pub const fn now(&self) -> GameTime {
        self.now
    }

    /// Delta applied by the most recent tick.
    #[must_use]
    pub const fn last_delta(&self) -> f32 {
        self.last_delta
    }

    /// Number of ticks processed.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Clamps a frame delta to a finite, non-negative value.
#[must_use]
pub fn sanitize_delta(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        if dt != 0.0 {
            trace!("Ignoring invalid frame delta {dt}");
        }
        0.0
    }
}
