//! Prometheus text exposition format.
//!
//! Renders the latest scaling snapshot as gauges for scraping by a
//! Prometheus server or compatible agent.

use tidepool_state::ScalingMetrics;

/// Render a scaling snapshot into Prometheus text format.
pub fn render_prometheus(metrics: &ScalingMetrics) -> String {
    let gauges: [(&str, &str, f64); 8] = [
        (
            "tidepool_current_instances",
            "Instances currently in the pool.",
            metrics.current_instances as f64,
        ),
        (
            "tidepool_target_instances",
            "Pool size the current load calls for.",
            metrics.target_instances as f64,
        ),
        (
            "tidepool_cpu_utilization",
            "CPU utilization in percent.",
            metrics.cpu_utilization,
        ),
        (
            "tidepool_memory_utilization",
            "Memory utilization in percent.",
            metrics.memory_utilization,
        ),
        (
            "tidepool_response_time_ms",
            "Average response time in milliseconds.",
            metrics.response_time_ms,
        ),
        (
            "tidepool_throughput",
            "Requests per second.",
            metrics.throughput,
        ),
        (
            "tidepool_error_rate",
            "Error rate in percent.",
            metrics.error_rate,
        ),
        (
            "tidepool_sample_stale",
            "1 if the last sample reused stale load figures.",
            if metrics.stale { 1.0 } else { 0.0 },
        ),
    ];

    let mut out = String::new();
    for (name, help, value) in gauges {
        out.push_str(&format!("# HELP {name} {help}\n"));
        out.push_str(&format!("# TYPE {name} gauge\n"));
        out.push_str(&format!("{name} {value:.2}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ScalingMetrics {
        ScalingMetrics {
            current_instances: 3,
            target_instances: 4,
            cpu_utilization: 72.5,
            memory_utilization: 41.0,
            response_time_ms: 130.25,
            throughput: 1500.0,
            error_rate: 0.8,
            timestamp: 1000,
            stale: false,
        }
    }

    #[test]
    fn render_contains_all_gauges() {
        let output = render_prometheus(&snapshot());

        assert!(output.contains("# TYPE tidepool_current_instances gauge"));
        assert!(output.contains("tidepool_current_instances 3.00"));
        assert!(output.contains("tidepool_target_instances 4.00"));
        assert!(output.contains("tidepool_cpu_utilization 72.50"));
        assert!(output.contains("tidepool_response_time_ms 130.25"));
        assert!(output.contains("tidepool_sample_stale 0.00"));
    }

    #[test]
    fn render_flags_stale_samples() {
        let mut metrics = snapshot();
        metrics.stale = true;
        assert!(render_prometheus(&metrics).contains("tidepool_sample_stale 1.00"));
    }
}
