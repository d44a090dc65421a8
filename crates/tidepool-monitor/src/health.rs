//! Health scoring and recommendations.

use serde::{Deserialize, Serialize};

use tidepool_state::{Alert, AlertSeverity};

use crate::analysis::{DecisionPatterns, TrendDirection, TrendReport};
use crate::config::MonitorConfig;

/// Health bucket for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 75.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Fair
        } else if score >= 25.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AlertCounts {
    pub warning: usize,
    pub critical: usize,
    pub total: usize,
}

impl AlertCounts {
    /// Count alerts with `timestamp >= since`.
    pub fn since<'a>(alerts: impl IntoIterator<Item = &'a Alert>, since: u64) -> Self {
        let mut counts = Self::default();
        for alert in alerts.into_iter().filter(|a| a.timestamp >= since) {
            match alert.severity {
                AlertSeverity::Warning => counts.warning += 1,
                AlertSeverity::Critical => counts.critical += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

/// Aggregate health view returned to collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub health_score: f64,
    pub status: HealthStatus,
    pub alert_counts: AlertCounts,
    pub trends: TrendReport,
    pub patterns: DecisionPatterns,
    pub recommendations: Vec<String>,
}

/// Whether the engine is acting more often than the configured limit.
pub fn is_thrashing(patterns: &DecisionPatterns, config: &MonitorConfig) -> bool {
    patterns.scaling_frequency > config.max_scaling_frequency_per_hour
}

/// Score before clamping: 100 minus the alert and thrashing penalties.
pub fn raw_health_score(
    counts: &AlertCounts,
    patterns: &DecisionPatterns,
    config: &MonitorConfig,
) -> f64 {
    let weights = &config.weights;
    let mut score = 100.0;
    score -= weights.critical_alert * counts.critical as f64;
    score -= weights.warning_alert * counts.warning as f64;
    if is_thrashing(patterns, config) {
        score -= weights.excessive_scaling;
    }
    score
}

/// Health score clamped to [0, 100].
pub fn health_score(
    counts: &AlertCounts,
    patterns: &DecisionPatterns,
    config: &MonitorConfig,
) -> f64 {
    raw_health_score(counts, patterns, config).clamp(0.0, 100.0)
}

/// Advice derived from trend averages and decision patterns.
pub fn recommendations(
    trends: &TrendReport,
    patterns: &DecisionPatterns,
    config: &MonitorConfig,
) -> Vec<String> {
    let limits = &config.recommendations;
    let mut advice = Vec::new();

    if trends.cpu.samples > 0 {
        if trends.cpu.average > limits.high_cpu {
            advice.push(format!(
                "Average CPU utilization is {:.1}%: scale up or add capacity",
                trends.cpu.average
            ));
        } else if trends.cpu.average < limits.low_cpu {
            advice.push(format!(
                "Average CPU utilization is {:.1}%: scale down to reduce cost",
                trends.cpu.average
            ));
        }
        if trends.cpu.direction == TrendDirection::Increasing {
            advice.push("CPU utilization is increasing: prepare for a scale-up".to_string());
        }
    }

    if trends.memory.samples > 0 && trends.memory.average > limits.high_memory {
        advice.push(format!(
            "Average memory utilization is {:.1}%: scale up or reduce memory footprint",
            trends.memory.average
        ));
    }

    if trends.response_time.samples > 0
        && trends.response_time.average > limits.high_response_time_ms
    {
        advice.push(format!(
            "Average response time is {:.0}ms: add instances or optimize request handling",
            trends.response_time.average
        ));
    }

    if is_thrashing(patterns, config) {
        advice.push(format!(
            "Scaling {:.1}/h exceeds {:.1}/h: reduce scaling frequency or raise the cooldown",
            patterns.scaling_frequency, config.max_scaling_frequency_per_hour
        ));
    }

    if advice.is_empty() {
        advice.push("System operating within normal parameters".to_string());
    }
    advice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Trend;

    fn trend(average: f64, direction: TrendDirection) -> Trend {
        Trend {
            direction,
            average,
            older_mean: average,
            newer_mean: average,
            samples: 10,
        }
    }

    fn quiet_trends() -> TrendReport {
        TrendReport {
            cpu: trend(50.0, TrendDirection::Stable),
            memory: trend(50.0, TrendDirection::Stable),
            response_time: trend(100.0, TrendDirection::Stable),
        }
    }

    #[test]
    fn status_buckets() {
        assert_eq!(HealthStatus::from_score(100.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(90.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(75.0), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(50.0), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_score(25.0), HealthStatus::Poor);
        assert_eq!(HealthStatus::from_score(24.9), HealthStatus::Critical);
    }

    #[test]
    fn penalties_apply_per_alert() {
        let config = MonitorConfig::default();
        let patterns = DecisionPatterns::default();
        let counts = AlertCounts {
            warning: 2,
            critical: 1,
            total: 3,
        };
        assert_eq!(raw_health_score(&counts, &patterns, &config), 70.0);
    }

    #[test]
    fn thrashing_costs_fifteen() {
        let config = MonitorConfig::default();
        let patterns = DecisionPatterns {
            scaling_frequency: 12.0,
            ..Default::default()
        };
        assert_eq!(
            raw_health_score(&AlertCounts::default(), &patterns, &config),
            85.0
        );
    }

    #[test]
    fn score_is_clamped() {
        let config = MonitorConfig::default();
        let counts = AlertCounts {
            warning: 0,
            critical: 9,
            total: 9,
        };
        let patterns = DecisionPatterns::default();
        assert_eq!(raw_health_score(&counts, &patterns, &config), -80.0);
        assert_eq!(health_score(&counts, &patterns, &config), 0.0);
    }

    #[test]
    fn weights_are_configurable() {
        let mut config = MonitorConfig::default();
        config.weights.critical_alert = 50.0;
        let counts = AlertCounts {
            warning: 0,
            critical: 1,
            total: 1,
        };
        assert_eq!(
            health_score(&counts, &DecisionPatterns::default(), &config),
            50.0
        );
    }

    #[test]
    fn counts_only_recent_alerts() {
        use tidepool_state::AlertKind;
        let alert = |severity, timestamp| Alert {
            kind: AlertKind::HighCpu,
            severity,
            message: String::new(),
            metric_value: 0.0,
            threshold: 0.0,
            timestamp,
        };
        let alerts = vec![
            alert(AlertSeverity::Critical, 100),
            alert(AlertSeverity::Warning, 5000),
            alert(AlertSeverity::Critical, 6000),
        ];
        let counts = AlertCounts::since(&alerts, 1000);
        assert_eq!(
            counts,
            AlertCounts {
                warning: 1,
                critical: 1,
                total: 2
            }
        );
    }

    #[test]
    fn quiet_system_gets_default_advice() {
        let advice = recommendations(
            &quiet_trends(),
            &DecisionPatterns::default(),
            &MonitorConfig::default(),
        );
        assert_eq!(advice, vec!["System operating within normal parameters"]);
    }

    #[test]
    fn hot_cpu_recommends_scale_up() {
        let mut trends = quiet_trends();
        trends.cpu = trend(85.0, TrendDirection::Increasing);
        let advice =
            recommendations(&trends, &DecisionPatterns::default(), &MonitorConfig::default());
        assert!(advice[0].contains("scale up"));
        assert!(advice[1].contains("increasing"));
    }

    #[test]
    fn idle_cpu_recommends_scale_down() {
        let mut trends = quiet_trends();
        trends.cpu = trend(12.0, TrendDirection::Stable);
        let advice =
            recommendations(&trends, &DecisionPatterns::default(), &MonitorConfig::default());
        assert_eq!(advice.len(), 1);
        assert!(advice[0].contains("scale down"));
    }

    #[test]
    fn thrashing_recommends_reducing_frequency() {
        let patterns = DecisionPatterns {
            scaling_frequency: 30.0,
            ..Default::default()
        };
        let advice = recommendations(&quiet_trends(), &patterns, &MonitorConfig::default());
        assert!(advice.iter().any(|a| a.contains("reduce scaling frequency")));
    }
}
