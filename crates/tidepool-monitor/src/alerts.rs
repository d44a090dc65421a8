//! Threshold checks run against every recorded snapshot.

use tidepool_state::{Alert, AlertKind, AlertSeverity, ScalingMetrics};

use crate::config::AlertThresholds;

/// Compare a snapshot against the thresholds. One alert per breach, in
/// cpu, memory, response time, error rate order.
pub fn check_thresholds(
    metrics: &ScalingMetrics,
    thresholds: &AlertThresholds,
    now: u64,
) -> Vec<Alert> {
    let checks = [
        (
            AlertKind::HighCpu,
            AlertSeverity::Warning,
            "CPU utilization",
            "%",
            metrics.cpu_utilization,
            thresholds.cpu_utilization,
        ),
        (
            AlertKind::HighMemory,
            AlertSeverity::Warning,
            "Memory utilization",
            "%",
            metrics.memory_utilization,
            thresholds.memory_utilization,
        ),
        (
            AlertKind::HighResponseTime,
            AlertSeverity::Warning,
            "Response time",
            "ms",
            metrics.response_time_ms,
            thresholds.response_time_ms,
        ),
        (
            AlertKind::HighErrorRate,
            AlertSeverity::Critical,
            "Error rate",
            "%",
            metrics.error_rate,
            thresholds.error_rate,
        ),
    ];

    checks
        .into_iter()
        .filter(|(_, _, _, _, value, threshold)| value > threshold)
        .map(|(kind, severity, label, unit, value, threshold)| Alert {
            kind,
            severity,
            message: format!("{label} {value:.1}{unit} exceeds {threshold:.1}{unit}"),
            metric_value: value,
            threshold,
            timestamp: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(cpu: f64, memory: f64, response_ms: f64, errors: f64) -> ScalingMetrics {
        ScalingMetrics {
            current_instances: 2,
            target_instances: 2,
            cpu_utilization: cpu,
            memory_utilization: memory,
            response_time_ms: response_ms,
            throughput: 100.0,
            error_rate: errors,
            timestamp: 1000,
            stale: false,
        }
    }

    #[test]
    fn quiet_snapshot_raises_nothing() {
        let snapshot = metrics(50.0, 60.0, 100.0, 1.0);
        let alerts = check_thresholds(&snapshot, &AlertThresholds::default(), 5);
        assert!(alerts.is_empty());
    }

    #[test]
    fn thresholds_are_strict() {
        let snapshot = metrics(80.0, 85.0, 200.0, 5.0);
        let alerts = check_thresholds(&snapshot, &AlertThresholds::default(), 5);
        assert!(alerts.is_empty());
    }

    #[test]
    fn every_breach_is_reported() {
        let snapshot = metrics(92.0, 90.0, 350.0, 7.5);
        let alerts = check_thresholds(&snapshot, &AlertThresholds::default(), 42);
        let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::HighCpu,
                AlertKind::HighMemory,
                AlertKind::HighResponseTime,
                AlertKind::HighErrorRate
            ]
        );
        assert_eq!(alerts[3].severity, AlertSeverity::Critical);
        assert!(alerts[..3].iter().all(|a| a.severity == AlertSeverity::Warning));
        assert!(alerts.iter().all(|a| a.timestamp == 42));
        assert_eq!(alerts[0].message, "CPU utilization 92.0% exceeds 80.0%");
        assert_eq!(alerts[2].message, "Response time 350.0ms exceeds 200.0ms");
    }
}
