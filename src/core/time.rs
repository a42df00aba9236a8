//! Frame timing

use std::time::{Duration, Instant};

/// Wall-clock frame timer
///
/// `update` measures the time since the previous call. `advance` feeds a
/// fixed duration instead, which keeps tests and headless runs deterministic.
#[derive(Debug, Clone)]
pub struct Time {
    last: Instant,
    delta: Duration,
    total: Duration,
    frame_count: u64,
}

impl Time {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            delta: Duration::ZERO,
            total: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Measure the frame that just ended
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last);
        self.last = now;
        self.advance(delta);
    }

    /// Count a frame of the given length without reading the clock
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.total += delta;
        self.frame_count += 1;
    }

    /// Forget the time spent since the last update, e.g. after a long stall
    pub fn reset_clock(&mut self) {
        self.last = Instant::now();
    }

    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    #[must_use]
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.total
    }

    #[must_use]
    pub fn total_secs(&self) -> f64 {
        self.total.as_secs_f64()
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let mut time = Time::new();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(20));

        assert_eq!(time.delta(), Duration::from_millis(20));
        assert_eq!(time.total(), Duration::from_millis(36));
        assert_eq!(time.frame_count(), 2);
        assert!((time.delta_secs() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_update_counts_frames() {
        let mut time = Time::new();
        time.update();
        time.update();
        assert_eq!(time.frame_count(), 2);
        assert!(time.total() >= time.delta());
    }
}
