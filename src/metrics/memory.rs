//! In-process metrics collector.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use super::MetricsSink;

/// Counter identity: name plus sorted tags.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(super) struct CounterKey {
    pub name: String,
    pub tags: Vec<(String, String)>,
}

impl CounterKey {
    fn new(name: &str, tags: &[(&str, &str)]) -> Self {
        let mut tags: Vec<(String, String)> = tags
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        tags.sort();
        Self {
            name: name.to_string(),
            tags,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct TimerStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

/// Thread-safe metrics collector with read accessors.
///
/// Lock poisoning is ignored: a panic elsewhere must not stop metrics from
/// being recorded, and recording never fails.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    pub(super) gauges: RwLock<BTreeMap<String, f64>>,
    pub(super) counters: Mutex<BTreeMap<CounterKey, u64>>,
    pub(super) timers: Mutex<BTreeMap<String, TimerStats>>,
}

impl InMemoryMetrics {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gauge value, if it was ever set.
    #[must_use]
    pub fn gauge(&self, name: &str) -> Option<f64> {
        let gauges = self.gauges.read().unwrap_or_else(PoisonError::into_inner);
        gauges.get(name).copied()
    }

    /// Value of the counter with exactly these tags.
    #[must_use]
    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> u64 {
        let key = CounterKey::new(name, tags);
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.get(&key).copied().unwrap_or(0)
    }

    /// Sum of the counter across all tag combinations.
    #[must_use]
    pub fn counter_total(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters
            .iter()
            .filter(|(k, _)| k.name == name)
            .map(|(_, v)| *v)
            .sum()
    }

    /// Number of intervals recorded for a timer.
    #[must_use]
    pub fn timer_count(&self, name: &str) -> u64 {
        self.timer_stats(name).count
    }

    /// Total time recorded for a timer.
    #[must_use]
    pub fn timer_total(&self, name: &str) -> Duration {
        self.timer_stats(name).total
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let gauges = self.gauges.read().unwrap_or_else(PoisonError::into_inner);
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        gauges.is_empty() && counters.is_empty() && timers.is_empty()
    }

    fn timer_stats(&self, name: &str) -> TimerStats {
        let timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        timers.get(name).copied().unwrap_or_default()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn set_gauge(&self, name: &str, value: f64) {
        let mut gauges = self.gauges.write().unwrap_or_else(PoisonError::into_inner);
        gauges.insert(name.to_string(), value);
    }

    fn increment(&self, name: &str, tags: &[(&str, &str)]) {
        let key = CounterKey::new(name, tags);
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        *counters.entry(key).or_insert(0) += 1;
    }

    fn record_duration(&self, name: &str, elapsed: Duration) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        let stats = timers.entry(name.to_string()).or_default();
        stats.count += 1;
        stats.total += elapsed;
        stats.max = stats.max.max(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = InMemoryMetrics::new();
        assert!(metrics.is_empty());
        assert_eq!(metrics.gauge("g"), None);
        assert_eq!(metrics.counter("c", &[]), 0);
        assert_eq!(metrics.timer_count("t"), 0);
    }

    #[test]
    fn test_gauge_overwrites() {
        let metrics = InMemoryMetrics::new();
        metrics.set_gauge("g", 1.0);
        metrics.set_gauge("g", 0.0);
        assert_eq!(metrics.gauge("g"), Some(0.0));
    }

    #[test]
    fn test_counter_tags_are_distinct() {
        let metrics = InMemoryMetrics::new();
        metrics.increment("c", &[("learning", "true")]);
        metrics.increment("c", &[("learning", "true")]);
        metrics.increment("c", &[("learning", "false")]);

        assert_eq!(metrics.counter("c", &[("learning", "true")]), 2);
        assert_eq!(metrics.counter("c", &[("learning", "false")]), 1);
        assert_eq!(metrics.counter("c", &[]), 0);
        assert_eq!(metrics.counter_total("c"), 3);
    }

    #[test]
    fn test_tag_order_is_irrelevant() {
        let metrics = InMemoryMetrics::new();
        metrics.increment("c", &[("a", "1"), ("b", "2")]);
        assert_eq!(metrics.counter("c", &[("b", "2"), ("a", "1")]), 1);
    }

    #[test]
    fn test_timer_accumulates() {
        let metrics = InMemoryMetrics::new();
        metrics.record_duration("t", Duration::from_millis(3));
        metrics.record_duration("t", Duration::from_millis(5));
        assert_eq!(metrics.timer_count("t"), 2);
        assert_eq!(metrics.timer_total("t"), Duration::from_millis(8));
    }
}
