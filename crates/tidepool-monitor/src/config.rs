//! Monitor tuning. Every threshold and weight is configurable; the
//! defaults reproduce the stock behavior.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub thresholds: AlertThresholds,
    pub weights: HealthWeights,
    pub recommendations: RecommendationThresholds,
    /// Scaling actions per hour above which the pool is considered to be
    /// thrashing.
    pub max_scaling_frequency_per_hour: f64,
    /// Alerts younger than this count towards the health score.
    pub alert_window_secs: u64,
    /// Relative change between history halves that counts as a trend.
    pub trend_threshold: f64,
    pub metrics_capacity: usize,
    pub decision_capacity: usize,
    pub alert_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            weights: HealthWeights::default(),
            recommendations: RecommendationThresholds::default(),
            max_scaling_frequency_per_hour: 10.0,
            alert_window_secs: 3600,
            trend_threshold: 0.10,
            metrics_capacity: 100,
            decision_capacity: 100,
            alert_capacity: 100,
        }
    }
}

/// Alert thresholds; a snapshot strictly above a threshold raises an alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertThresholds {
    /// CPU percent (warning).
    pub cpu_utilization: f64,
    /// Memory percent (warning).
    pub memory_utilization: f64,
    /// Milliseconds (warning).
    pub response_time_ms: f64,
    /// Error percent (critical).
    pub error_rate: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_utilization: 80.0,
            memory_utilization: 85.0,
            response_time_ms: 200.0,
            error_rate: 5.0,
        }
    }
}

/// Health score penalties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthWeights {
    pub critical_alert: f64,
    pub warning_alert: f64,
    pub excessive_scaling: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            critical_alert: 20.0,
            warning_alert: 5.0,
            excessive_scaling: 15.0,
        }
    }
}

/// Trend averages that produce recommendations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub high_cpu: f64,
    pub low_cpu: f64,
    pub high_memory: f64,
    pub high_response_time_ms: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            high_cpu: 70.0,
            low_cpu: 30.0,
            high_memory: 80.0,
            high_response_time_ms: 200.0,
        }
    }
}
