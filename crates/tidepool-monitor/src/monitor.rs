//! Scaling monitor — bounded histories plus derived analytics.
//!
//! Each `record_*` call appends to its ring and recomputes the analytics
//! that depend on it, so readers always see a view consistent with the
//! latest append.

use std::sync::RwLock;

use tracing::{error, warn};

use tidepool_state::{
    epoch_secs, Alert, AlertSeverity, BoundedHistory, ScalingDecision, ScalingMetrics,
};

use crate::alerts::check_thresholds;
use crate::analysis::{analyze_decisions, compute_trends, DecisionPatterns, TrendReport};
use crate::config::MonitorConfig;
use crate::export::MetricsExport;
use crate::health::{self, AlertCounts, HealthReport, HealthStatus};

/// Watches metrics and decisions and reports on scaling health.
pub struct ScalingMonitor {
    config: MonitorConfig,
    metrics: BoundedHistory<ScalingMetrics>,
    decisions: BoundedHistory<ScalingDecision>,
    alerts: BoundedHistory<Alert>,
    trends: RwLock<TrendReport>,
    patterns: RwLock<DecisionPatterns>,
}

impl ScalingMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            metrics: BoundedHistory::new(config.metrics_capacity),
            decisions: BoundedHistory::new(config.decision_capacity),
            alerts: BoundedHistory::new(config.alert_capacity),
            trends: RwLock::new(TrendReport::default()),
            patterns: RwLock::new(DecisionPatterns::default()),
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Record a snapshot, raise any threshold alerts, and refresh trends.
    ///
    /// Returns the alerts raised by this snapshot.
    pub fn record_metrics(&self, metrics: &ScalingMetrics) -> Vec<Alert> {
        self.metrics.push(metrics.clone());

        let raised = check_thresholds(metrics, &self.config.thresholds, epoch_secs());
        for alert in &raised {
            match alert.severity {
                AlertSeverity::Warning => {
                    warn!(
                        kind = ?alert.kind,
                        value = alert.metric_value,
                        threshold = alert.threshold,
                        "{}",
                        alert.message
                    )
                }
                AlertSeverity::Critical => {
                    error!(
                        kind = ?alert.kind,
                        value = alert.metric_value,
                        threshold = alert.threshold,
                        "{}",
                        alert.message
                    )
                }
            }
            self.alerts.push(alert.clone());
        }

        let trends = compute_trends(&self.metrics.snapshot(), self.config.trend_threshold);
        *self.trends.write().expect("trends lock") = trends;

        raised
    }

    /// Record an executed decision and refresh decision patterns.
    pub fn record_decision(&self, decision: &ScalingDecision) {
        self.decisions.push(decision.clone());
        let patterns = analyze_decisions(&self.decisions.snapshot());
        *self.patterns.write().expect("patterns lock") = patterns;
    }

    pub fn trends(&self) -> TrendReport {
        self.trends.read().expect("trends lock").clone()
    }

    pub fn patterns(&self) -> DecisionPatterns {
        self.patterns.read().expect("patterns lock").clone()
    }

    /// Alerts raised within the configured window.
    pub fn alert_counts(&self) -> AlertCounts {
        let since = epoch_secs().saturating_sub(self.config.alert_window_secs);
        self.alerts.with(|alerts| AlertCounts::since(alerts.iter(), since))
    }

    pub fn health_score(&self) -> f64 {
        health::health_score(&self.alert_counts(), &self.patterns(), &self.config)
    }

    /// Score, status bucket, alert counts, trends and recommendations.
    pub fn health_report(&self) -> HealthReport {
        let alert_counts = self.alert_counts();
        let trends = self.trends();
        let patterns = self.patterns();
        let health_score = health::health_score(&alert_counts, &patterns, &self.config);
        let recommendations = health::recommendations(&trends, &patterns, &self.config);

        HealthReport {
            health_score,
            status: HealthStatus::from_score(health_score),
            alert_counts,
            trends,
            patterns,
            recommendations,
        }
    }

    pub fn metrics_history(&self) -> Vec<ScalingMetrics> {
        self.metrics.snapshot()
    }

    pub fn decision_history(&self) -> Vec<ScalingDecision> {
        self.decisions.snapshot()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.snapshot()
    }

    pub fn latest_metrics(&self) -> Option<ScalingMetrics> {
        self.metrics.latest()
    }

    /// Everything the monitor holds, as an export document.
    pub fn export(&self) -> MetricsExport {
        MetricsExport {
            export_timestamp: epoch_secs(),
            metrics_history: self.metrics_history(),
            decision_history: self.decision_history(),
            alerts: self.alerts(),
            patterns: self.patterns(),
        }
    }
}

impl Default for ScalingMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TrendDirection;
    use tidepool_state::{AlertKind, ScalingAction};

    fn metrics(cpu: f64, memory: f64, response_ms: f64, errors: f64) -> ScalingMetrics {
        ScalingMetrics {
            current_instances: 2,
            target_instances: 2,
            cpu_utilization: cpu,
            memory_utilization: memory,
            response_time_ms: response_ms,
            throughput: 300.0,
            error_rate: errors,
            timestamp: epoch_secs(),
            stale: false,
        }
    }

    fn decision(action: ScalingAction, timestamp: u64) -> ScalingDecision {
        ScalingDecision {
            id: format!("decision-{timestamp}"),
            action,
            reason: "test".to_string(),
            metrics: metrics(50.0, 50.0, 100.0, 0.0),
            confidence: match action {
                ScalingAction::ScaleUp => 0.8,
                ScalingAction::ScaleDown => 0.7,
            },
            timestamp,
        }
    }

    #[test]
    fn fresh_monitor_is_excellent() {
        let monitor = ScalingMonitor::default();
        let report = monitor.health_report();
        assert_eq!(report.health_score, 100.0);
        assert_eq!(report.status, HealthStatus::Excellent);
        assert_eq!(report.alert_counts, AlertCounts::default());
    }

    #[test]
    fn simultaneous_breaches_raise_multiple_alerts() {
        let monitor = ScalingMonitor::default();
        let raised = monitor.record_metrics(&metrics(95.0, 90.0, 50.0, 1.0));
        assert_eq!(raised.len(), 2);
        assert_eq!(monitor.alerts().len(), 2);
        assert_eq!(monitor.alert_counts().warning, 2);
    }

    #[test]
    fn one_critical_alert_costs_exactly_twenty() {
        let monitor = ScalingMonitor::default();
        monitor.record_metrics(&metrics(50.0, 50.0, 100.0, 1.0));
        let before = monitor.health_score();

        let raised = monitor.record_metrics(&metrics(50.0, 50.0, 100.0, 6.0));
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, AlertKind::HighErrorRate);
        assert_eq!(before - monitor.health_score(), 20.0);
    }

    #[test]
    fn warnings_accumulate_across_calls() {
        let monitor = ScalingMonitor::default();
        monitor.record_metrics(&metrics(85.0, 50.0, 100.0, 0.0));
        monitor.record_metrics(&metrics(85.0, 50.0, 100.0, 0.0));
        monitor.record_metrics(&metrics(85.0, 50.0, 100.0, 0.0));
        assert_eq!(monitor.health_score(), 85.0);
        assert_eq!(monitor.health_report().status, HealthStatus::Good);
    }

    #[test]
    fn histories_are_bounded() {
        let monitor = ScalingMonitor::new(MonitorConfig {
            metrics_capacity: 5,
            decision_capacity: 3,
            alert_capacity: 4,
            ..Default::default()
        });
        for _ in 0..10 {
            monitor.record_metrics(&metrics(95.0, 50.0, 100.0, 0.0));
            monitor.record_decision(&decision(ScalingAction::ScaleUp, 1000));
        }
        assert_eq!(monitor.metrics_history().len(), 5);
        assert_eq!(monitor.decision_history().len(), 3);
        assert_eq!(monitor.alerts().len(), 4);
    }

    #[test]
    fn trends_follow_recorded_metrics() {
        let monitor = ScalingMonitor::default();
        for cpu in [40.0, 40.0, 40.0, 60.0, 60.0, 60.0] {
            monitor.record_metrics(&metrics(cpu, 50.0, 100.0, 0.0));
        }
        let trends = monitor.trends();
        assert_eq!(trends.cpu.direction, TrendDirection::Increasing);
        assert_eq!(trends.memory.direction, TrendDirection::Stable);
        assert_eq!(trends.cpu.samples, 6);
    }

    #[test]
    fn thrashing_lowers_score_and_recommends() {
        let monitor = ScalingMonitor::default();
        // 12 decisions across one hour.
        for i in 0..12u64 {
            let action = if i % 2 == 0 {
                ScalingAction::ScaleUp
            } else {
                ScalingAction::ScaleDown
            };
            monitor.record_decision(&decision(action, 10_000 + i * 300));
        }
        let patterns = monitor.patterns();
        assert_eq!(patterns.total_decisions, 12);
        assert!(patterns.scaling_frequency > 10.0);

        let report = monitor.health_report();
        assert_eq!(report.health_score, 85.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("reduce scaling frequency")));
    }

    #[test]
    fn export_captures_all_histories() {
        let monitor = ScalingMonitor::default();
        monitor.record_metrics(&metrics(95.0, 50.0, 100.0, 0.0));
        monitor.record_metrics(&metrics(50.0, 50.0, 100.0, 0.0));
        monitor.record_decision(&decision(ScalingAction::ScaleUp, 1000));

        let export = monitor.export();
        assert_eq!(export.metrics_history.len(), 2);
        assert_eq!(export.decision_history.len(), 1);
        assert_eq!(export.alerts.len(), 1);
        assert_eq!(export.patterns.total_decisions, 1);
    }
}
