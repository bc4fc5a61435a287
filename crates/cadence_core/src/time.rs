//! Simulation time
//!
//! Fixed 60Hz tick rate by default; the frame loop may pass any `dt`.

use std::time::Duration;

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Simulation time tracker, advanced once per frame.
#[derive(Debug, Clone)]
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
    last_dt: f32,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            accumulated_time: Duration::ZERO,
            last_dt: 0.0,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Advance by one frame of `dt` seconds. Negative or non-finite
    /// deltas count as a tick without advancing the clock; the clock
    /// saturates at `Duration::MAX`.
    pub fn advance(&mut self, dt: f32) {
        self.tick_count += 1;
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.last_dt = dt;
        let step = Duration::try_from_secs_f32(dt).unwrap_or(Duration::MAX);
        self.accumulated_time = self.accumulated_time.saturating_add(step);
    }

    /// Delta passed to the most recent frame.
    pub fn last_dt(&self) -> f32 {
        self.last_dt
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_ticks_and_time() {
        let mut time = SimulationTime::new();
        time.advance(0.5);
        time.advance(0.25);
        assert_eq!(time.tick_count(), 2);
        assert_eq!(time.total_time(), Duration::from_millis(750));
        assert_eq!(time.last_dt(), 0.25);
    }

    #[test]
    fn bad_delta_does_not_move_clock() {
        let mut time = SimulationTime::new();
        time.advance(-1.0);
        time.advance(f32::NAN);
        assert_eq!(time.tick_count(), 2);
        assert_eq!(time.total_time(), Duration::ZERO);
    }

    #[test]
    fn huge_delta_saturates_instead_of_panicking() {
        let mut time = SimulationTime::new();
        time.advance(1.0e20);
        assert_eq!(time.total_time(), Duration::MAX);
        time.advance(f32::MAX);
        time.advance(0.5);
        assert_eq!(time.tick_count(), 3);
        assert_eq!(time.total_time(), Duration::MAX);
    }
}
