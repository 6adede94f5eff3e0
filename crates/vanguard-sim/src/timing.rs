//! Frame timing.
//!
//! Turns variable frame deltas into a whole number of fixed simulation
//! steps, so combat timers advance identically whatever the frame rate.

/// Fixed timestep accumulator.
#[derive(Debug, Clone)]
pub struct FixedStep {
    /// Accumulated, not yet simulated time
    accumulator: f32,
    /// Fixed timestep delta
    fixed_dt: f32,
    /// Maximum delta time to prevent spiral of death
    max_dt: f32,
    /// Maximum steps per frame
    max_updates: u32,
    /// Steps taken in total
    steps: u64,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(1.0 / 60.0, 0.25)
    }
}

impl FixedStep {
    /// Create an accumulator stepping `fixed_dt` seconds at a time.
    #[must_use]
    pub fn new(fixed_dt: f32, max_dt: f32) -> Self {
        let fixed_dt = fixed_dt.max(0.001); // Minimum 1ms
        Self {
            accumulator: 0.0,
            fixed_dt,
            max_dt: max_dt.max(fixed_dt),
            max_updates: 10,
            steps: 0,
        }
    }

    /// Get the fixed timestep value.
    #[must_use]
    pub const fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Total steps handed out so far.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Accumulate a frame delta.
    /// Returns the number of fixed updates that should be performed.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        let dt = if dt.is_finite() { dt.clamp(0.0, self.max_dt) } else { 0.0 };
        self.accumulator += dt;
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < self.max_updates {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // If we're still behind, reset accumulator
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        self.steps += u64::from(count);
        count
    }

    /// Fraction of a step left in the accumulator (0.0-1.0).
    #[must_use]
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.fixed_dt).clamp(0.0, 1.0)
    }

    /// Reset timing (call after pause or loading).
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_whole_steps() {
        let mut step = FixedStep::new(0.05, 0.25);
        assert_eq!(step.accumulate(0.03), 0);
        assert_eq!(step.accumulate(0.03), 1);
        assert!((step.alpha() - 0.2).abs() < 1e-4);
        assert_eq!(step.accumulate(0.1), 2);
        assert_eq!(step.steps(), 3);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut step = FixedStep::new(0.125, 0.5);
        assert_eq!(step.accumulate(10.0), 4);
    }

    #[test]
    fn test_bad_deltas_ignored() {
        let mut step = FixedStep::default();
        assert_eq!(step.accumulate(f32::NAN), 0);
        assert_eq!(step.accumulate(-1.0), 0);
        assert_eq!(step.alpha(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut step = FixedStep::new(0.1, 0.25);
        step.accumulate(0.05);
        step.reset();
        assert_eq!(step.alpha(), 0.0);
        assert_eq!(step.accumulate(0.05), 0);
    }
}
