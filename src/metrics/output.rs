//! Prometheus text exposition for [`InMemoryMetrics`].

use std::fmt::Write;
use std::sync::PoisonError;

use super::memory::InMemoryMetrics;

fn metric_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

impl InMemoryMetrics {
    /// Renders every metric in Prometheus text format.
    ///
    /// Dots in names become underscores; counters get a `_total` suffix and
    /// timers are exposed as `_seconds_count`, `_seconds_sum` and
    /// `_seconds_max`.
    #[must_use]
    pub fn to_prometheus_text(&self) -> String {
        let mut out = String::new();

        {
            let gauges = self.gauges.read().unwrap_or_else(PoisonError::into_inner);
            for (name, value) in gauges.iter() {
                let name = metric_name(name);
                let _ = writeln!(out, "# TYPE {name} gauge");
                let _ = writeln!(out, "{name} {value}");
            }
        }

        {
            let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
            let mut last_name: Option<&str> = None;
            for (key, value) in counters.iter() {
                let name = format!("{}_total", metric_name(&key.name));
                if last_name != Some(key.name.as_str()) {
                    let _ = writeln!(out, "# TYPE {name} counter");
                    last_name = Some(key.name.as_str());
                }
                if key.tags.is_empty() {
                    let _ = writeln!(out, "{name} {value}");
                } else {
                    let labels = key
                        .tags
                        .iter()
                        .map(|(k, v)| format!("{}=\"{v}\"", metric_name(k)))
                        .collect::<Vec<_>>()
                        .join(",");
                    let _ = writeln!(out, "{name}{{{labels}}} {value}");
                }
            }
        }

        {
            let timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
            for (name, stats) in timers.iter() {
                let name = format!("{}_seconds", metric_name(name));
                let _ = writeln!(out, "# TYPE {name} summary");
                let _ = writeln!(out, "{name}_count {}", stats.count);
                let _ = writeln!(out, "{name}_sum {}", stats.total.as_secs_f64());
                let _ = writeln!(out, "{name}_max {}", stats.max.as_secs_f64());
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::metrics::{
        MetricsSink, ACTUATOR_ELAPSED, BUFFERING_ENABLED_GAUGE, EXECUTIONS_BUFFERED,
        EXECUTIONS_ENQUEUED,
    };

    use super::*;

    #[test]
    fn test_prometheus_output() {
        let metrics = InMemoryMetrics::new();
        metrics.set_gauge(BUFFERING_ENABLED_GAUGE, 1.0);
        metrics.increment(EXECUTIONS_BUFFERED, &[("learning", "true")]);
        metrics.increment(EXECUTIONS_BUFFERED, &[("learning", "false")]);
        metrics.increment(EXECUTIONS_ENQUEUED, &[]);
        metrics.record_duration(ACTUATOR_ELAPSED, Duration::from_millis(2));

        let output = metrics.to_prometheus_text();

        assert!(output.contains("# TYPE admission_buffering_enabled gauge"));
        assert!(output.contains("admission_buffering_enabled 1"));
        assert!(output.contains("admission_executions_buffered_total{learning=\"true\"} 1"));
        assert!(output.contains("admission_executions_buffered_total{learning=\"false\"} 1"));
        assert!(output.contains("admission_executions_enqueued_total 1"));
        assert!(output.contains("admission_actuator_elapsed_seconds_count 1"));
        assert_eq!(output.matches("# TYPE admission_executions_buffered_total counter").count(), 1);
    }

    #[test]
    fn test_empty_output() {
        assert!(InMemoryMetrics::new().to_prometheus_text().is_empty());
    }
}
