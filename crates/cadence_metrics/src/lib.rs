//! Cadence Metrics - scheduler instrumentation
//!
//! Frame timing, per-system update timings and named event counters.
//! Every type collapses to a zero-sized no-op when the `metrics`
//! feature is disabled, so call sites never need their own `cfg`.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use cadence_metrics::{FrameTimer, SystemProfiler};
//!
//! let mut timer = FrameTimer::new(60); // Track last 60 frames
//! let mut profiler = SystemProfiler::new(60);
//! timer.begin();
//! profiler.time_system("sprite_render", || { /* ... */ });
//! timer.end();
//! println!("FPS: {:.1}", timer.fps());
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod system_profiler;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use system_profiler::SystemProfiler;

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
mod stubs {
    use std::time::Duration;

    pub struct FrameTimer;

    impl FrameTimer {
        pub fn new(_capacity: usize) -> Self { Self }
        pub fn begin(&mut self) {}
        pub fn end(&mut self) -> Duration { Duration::ZERO }
        pub fn frames(&self) -> u64 { 0 }
        pub fn fps(&self) -> f64 { 0.0 }
        pub fn frame_time_ms(&self) -> f64 { 0.0 }
        pub fn frame_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    }

    pub struct RingBuffer<T>(std::marker::PhantomData<T>);

    impl<T> RingBuffer<T> {
        pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
        pub fn push(&mut self, _value: T) {}
        pub fn len(&self) -> usize { 0 }
        pub fn is_empty(&self) -> bool { true }
    }

    #[derive(Default)]
    pub struct SystemProfiler;

    impl SystemProfiler {
        pub fn new(_window: usize) -> Self { Self }
        pub fn record(&mut self, _name: &str, _elapsed: Duration) {}
        pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
        pub fn average(&self, _name: &str) -> Duration { Duration::ZERO }
        pub fn last(&self, _name: &str) -> Duration { Duration::ZERO }
        pub fn total(&self, _name: &str) -> Duration { Duration::ZERO }
        pub fn calls(&self, _name: &str) -> u64 { 0 }
        pub fn reset(&mut self) {}
        pub fn names(&self) -> impl Iterator<Item = &str> { std::iter::empty() }
    }

    #[derive(Default)]
    pub struct Counter;

    impl Counter {
        pub fn new() -> Self { Self }
        pub fn increment(&mut self, _name: &str, _value: u64) {}
        pub fn get(&self, _name: &str) -> u64 { 0 }
        pub fn reset_all(&mut self) {}
        pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> { std::iter::empty() }
    }
}

#[cfg(not(feature = "metrics"))]
pub use stubs::{Counter, FrameTimer, RingBuffer, SystemProfiler};
