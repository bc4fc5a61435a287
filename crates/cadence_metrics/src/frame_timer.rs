//! Frame timing utilities

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Measures wall-clock time between `begin` and `end` of each frame.
pub struct FrameTimer {
    frame_start: Option<Instant>,
    frame_times: RingBuffer<Duration>,
    frames: u64,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frame_start: None,
            frame_times: RingBuffer::new(capacity),
            frames: 0,
        }
    }

    pub fn begin(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    /// Close the current frame. A missing `begin` records nothing.
    pub fn end(&mut self) -> Duration {
        let Some(start) = self.frame_start.take() else {
            return Duration::ZERO;
        };
        let elapsed = start.elapsed();
        self.frame_times.push(elapsed);
        self.frames += 1;
        elapsed
    }

    /// Total number of completed frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn fps(&self) -> f64 {
        let avg = self.frame_times.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.frame_times.average().as_secs_f64() * 1000.0
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.frame_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}
