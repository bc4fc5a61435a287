//! Named counters for tracking scheduler events

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Counter {
    counters: BTreeMap<String, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &str, value: u64) {
        if let Some(count) = self.counters.get_mut(name) {
            *count += value;
        } else {
            self.counters.insert(name.to_string(), value);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    /// Counters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_in_name_order() {
        let mut counter = Counter::new();
        counter.increment("jobs.dispatched", 3);
        counter.increment("components.added", 1);
        counter.increment("jobs.dispatched", 2);

        let names: Vec<_> = counter.iter().collect();
        assert_eq!(names, vec![("components.added", 1), ("jobs.dispatched", 5)]);
    }
}
