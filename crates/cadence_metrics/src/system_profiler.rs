//! Rolling per-system update timings

use super::ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Records how long each named system spent in `update`.
///
/// Samples arrive after a phase has joined, so the profiler itself is
/// only ever touched from the frame loop thread.
pub struct SystemProfiler {
    window: usize,
    timings: HashMap<String, SystemTiming>,
}

struct SystemTiming {
    samples: RingBuffer<Duration>,
    total: Duration,
    calls: u64,
}

impl SystemProfiler {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            timings: HashMap::new(),
        }
    }

    pub fn record(&mut self, name: &str, elapsed: Duration) {
        let window = self.window;
        let timing = self
            .timings
            .entry(name.to_string())
            .or_insert_with(|| SystemTiming {
                samples: RingBuffer::new(window),
                total: Duration::ZERO,
                calls: 0,
            });
        timing.samples.push(elapsed);
        timing.total += elapsed;
        timing.calls += 1;
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    /// Average over the rolling window.
    pub fn average(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .map(|t| t.samples.average())
            .unwrap_or(Duration::ZERO)
    }

    pub fn last(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .and_then(|t| t.samples.latest().copied())
            .unwrap_or(Duration::ZERO)
    }

    pub fn total(&self, name: &str) -> Duration {
        self.timings
            .get(name)
            .map(|t| t.total)
            .unwrap_or(Duration::ZERO)
    }

    pub fn calls(&self, name: &str) -> u64 {
        self.timings.get(name).map(|t| t.calls).unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.timings.keys().map(String::as_str)
    }
}

impl Default for SystemProfiler {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_and_totals() {
        let mut profiler = SystemProfiler::new(2);
        profiler.record("sprites", Duration::from_millis(2));
        profiler.record("sprites", Duration::from_millis(4));
        profiler.record("sprites", Duration::from_millis(6));

        assert_eq!(profiler.calls("sprites"), 3);
        assert_eq!(profiler.total("sprites"), Duration::from_millis(12));
        assert_eq!(profiler.average("sprites"), Duration::from_millis(5));
        assert_eq!(profiler.last("sprites"), Duration::from_millis(6));
        assert_eq!(profiler.calls("shapes"), 0);
    }
}
