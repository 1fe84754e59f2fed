//! Instrumentation sink.
//!
//! The admission engine only ever writes metrics; it never reads them back
//! and a metrics failure can never change a decision. Three shapes are used:
//! - **Gauge**: live "buffering enabled" flag (`0` or `1`).
//! - **Counter**: decisions taken, tagged (e.g. `learning=true`).
//! - **Timer**: elapsed time of policy evaluation and aggregation.

mod memory;
mod output;

use std::time::{Duration, Instant};

pub use memory::InMemoryMetrics;

/// Gauge: 1 while buffering is active, 0 while inactive.
pub const BUFFERING_ENABLED_GAUGE: &str = "admission.buffering.enabled";
/// Counter: executions whose aggregate decision was BUFFER. Tagged `learning`.
pub const EXECUTIONS_BUFFERED: &str = "admission.executions.buffered";
/// Counter: executions whose aggregate decision was ENQUEUE.
pub const EXECUTIONS_ENQUEUED: &str = "admission.executions.enqueued";
/// Timer: policy evaluation, aggregation and application.
pub const ACTUATOR_ELAPSED: &str = "admission.actuator.elapsed";

/// Write-only metrics recorder.
pub trait MetricsSink: Send + Sync {
    /// Sets a gauge to `value`.
    fn set_gauge(&self, name: &str, value: f64);

    /// Increments a tagged counter by one.
    fn increment(&self, name: &str, tags: &[(&str, &str)]);

    /// Records one timed interval.
    fn record_duration(&self, name: &str, elapsed: Duration);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn set_gauge(&self, _name: &str, _value: f64) {}

    fn increment(&self, _name: &str, _tags: &[(&str, &str)]) {}

    fn record_duration(&self, _name: &str, _elapsed: Duration) {}
}

/// Records the time from construction to drop.
///
/// Dropping on every exit path, including `?` returns, means the interval is
/// recorded whichever branch is taken.
#[must_use = "the interval is recorded when the timer is dropped"]
pub struct Timer<'a> {
    sink: &'a dyn MetricsSink,
    name: &'a str,
    start: Instant,
}

impl<'a> Timer<'a> {
    /// Starts timing.
    pub fn start(sink: &'a dyn MetricsSink, name: &'a str) -> Self {
        Self {
            sink,
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink.record_duration(self.name, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_records_on_drop() {
        let metrics = InMemoryMetrics::new();
        {
            let _timer = Timer::start(&metrics, ACTUATOR_ELAPSED);
        }
        assert_eq!(metrics.timer_count(ACTUATOR_ELAPSED), 1);
    }

    #[test]
    fn test_timer_records_on_early_return() {
        fn failing(metrics: &InMemoryMetrics) -> Result<u32, String> {
            let _timer = Timer::start(metrics, ACTUATOR_ELAPSED);
            let parsed = "not a number".parse::<u32>().map_err(|e| e.to_string())?;
            Ok(parsed)
        }

        let metrics = InMemoryMetrics::new();
        assert!(failing(&metrics).is_err());
        assert_eq!(metrics.timer_count(ACTUATOR_ELAPSED), 1);
    }

    #[test]
    fn test_noop_accepts_everything() {
        let sink = NoopMetrics;
        sink.set_gauge(BUFFERING_ENABLED_GAUGE, 1.0);
        sink.increment(EXECUTIONS_ENQUEUED, &[]);
        sink.record_duration(ACTUATOR_ELAPSED, Duration::from_millis(1));
    }
}
