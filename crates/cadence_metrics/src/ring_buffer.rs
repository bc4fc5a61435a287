//! Fixed-capacity sample window for rolling statistics

use std::time::Duration;

/// Keeps the most recent `capacity` samples, overwriting the oldest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    samples: Vec<T>,
    capacity: usize,
    next: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    pub fn push(&mut self, sample: T) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.next] = sample;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    /// Most recently pushed sample.
    pub fn latest(&self) -> Option<&T> {
        if self.samples.is_empty() {
            return None;
        }
        let idx = (self.next + self.capacity - 1) % self.capacity;
        self.samples.get(idx.min(self.samples.len() - 1))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next = 0;
    }
}

impl RingBuffer<Duration> {
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    pub fn min_max(&self) -> (Duration, Duration) {
        let mut iter = self.samples.iter().copied();
        let Some(first) = iter.next() else {
            return (Duration::ZERO, Duration::ZERO);
        };
        iter.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_drops_oldest_sample() {
        let mut buffer = RingBuffer::new(3);

        buffer.push(Duration::from_millis(10));
        buffer.push(Duration::from_millis(20));
        buffer.push(Duration::from_millis(30));
        assert_eq!(buffer.average(), Duration::from_millis(20));

        buffer.push(Duration::from_millis(40));
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.average(), Duration::from_millis(30)); // (20 + 30 + 40) / 3
        assert_eq!(buffer.latest(), Some(&Duration::from_millis(40)));
        assert_eq!(
            buffer.min_max(),
            (Duration::from_millis(20), Duration::from_millis(40))
        );
    }

    #[test]
    fn empty_window_reports_zero() {
        let buffer: RingBuffer<Duration> = RingBuffer::new(4);
        assert!(buffer.latest().is_none());
        assert_eq!(buffer.average(), Duration::ZERO);
        assert_eq!(buffer.min_max(), (Duration::ZERO, Duration::ZERO));
    }
}
