//! Frame statistics

use std::collections::VecDeque;
use std::time::Duration;

/// Rolling frame time statistics
#[derive(Debug)]
pub struct FrameStats {
    /// Frame time history for averaging
    frame_times: VecDeque<Duration>,
    max_samples: usize,
    fps: f32,
    avg_frame_time_ms: f32,
    min_frame_time_ms: f32,
    max_frame_time_ms: f32,
    total_frames: u64,
    /// Fixed steps run during the most recent frame
    fixed_steps: u32,
    total_fixed_steps: u64,
}

impl FrameStats {
    const DEFAULT_SAMPLES: usize = 120;

    #[must_use]
    pub fn new() -> Self {
        Self::with_samples(Self::DEFAULT_SAMPLES)
    }

    #[must_use]
    pub fn with_samples(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples,
            fps: 0.0,
            avg_frame_time_ms: 0.0,
            min_frame_time_ms: 0.0,
            max_frame_time_ms: 0.0,
            total_frames: 0,
            fixed_steps: 0,
            total_fixed_steps: 0,
        }
    }

    /// Record a frame and the number of fixed steps it ran
    pub fn record_frame(&mut self, delta: Duration, fixed_steps: u32) {
        self.total_frames += 1;
        self.fixed_steps = fixed_steps;
        self.total_fixed_steps += u64::from(fixed_steps);

        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(delta);

        self.update_stats();
    }

    fn update_stats(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;

        for &dt in &self.frame_times {
            total += dt;
            min = min.min(dt);
            max = max.max(dt);
        }

        let count = self.frame_times.len() as f32;
        let total_secs = total.as_secs_f32();

        if total_secs > 0.0 {
            self.avg_frame_time_ms = (total_secs / count) * 1000.0;
            self.fps = count / total_secs;
        } else {
            self.avg_frame_time_ms = 0.0;
            self.fps = 0.0;
        }

        self.min_frame_time_ms = min.as_secs_f32() * 1000.0;
        self.max_frame_time_ms = max.as_secs_f32() * 1000.0;
    }

    #[must_use]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[must_use]
    pub fn avg_frame_time_ms(&self) -> f32 {
        self.avg_frame_time_ms
    }

    #[must_use]
    pub fn min_frame_time_ms(&self) -> f32 {
        self.min_frame_time_ms
    }

    #[must_use]
    pub fn max_frame_time_ms(&self) -> f32 {
        self.max_frame_time_ms
    }

    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    #[must_use]
    pub fn fixed_steps(&self) -> u32 {
        self.fixed_steps
    }

    #[must_use]
    pub fn total_fixed_steps(&self) -> u64 {
        self.total_fixed_steps
    }

    #[must_use]
    pub fn format_stats(&self) -> String {
        format!(
            "FPS: {:.1} | Frame: {:.2}ms (min: {:.2}, max: {:.2}) | Fixed steps: {}",
            self.fps,
            self.avg_frame_time_ms,
            self.min_frame_time_ms,
            self.max_frame_time_ms,
            self.fixed_steps
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame statistics plus periodic logging
#[derive(Debug)]
pub struct DebugInfo {
    /// Log the statistics every `log_interval` of frame time
    pub enabled: bool,
    pub frame_stats: FrameStats,
    log_interval: Duration,
    since_log: Duration,
}

impl DebugInfo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            frame_stats: FrameStats::new(),
            log_interval: Duration::from_secs(5),
            since_log: Duration::ZERO,
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn set_log_interval(&mut self, interval: Duration) {
        self.log_interval = interval;
    }

    #[must_use]
    pub fn log_interval(&self) -> Duration {
        self.log_interval
    }

    /// Record a frame, returning whether the statistics were logged
    pub fn record_frame(&mut self, delta: Duration, fixed_steps: u32) -> bool {
        self.frame_stats.record_frame(delta, fixed_steps);
        self.since_log += delta;

        if !self.enabled || self.since_log < self.log_interval {
            return false;
        }
        self.since_log = Duration::ZERO;
        log::debug!("{}", self.frame_stats.format_stats());
        true
    }
}

impl Default for DebugInfo {
    fn default() -> Self {
        Self::new()
    }
}
