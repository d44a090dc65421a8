//! Trend and decision-pattern analysis over the bounded histories.

use serde::{Deserialize, Serialize};

use tidepool_state::{ScalingAction, ScalingDecision, ScalingMetrics};

/// Direction of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

/// Summary of one metric series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Mean over the whole series.
    pub average: f64,
    pub older_mean: f64,
    pub newer_mean: f64,
    pub samples: usize,
}

/// Trends for the three tracked series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrendReport {
    pub cpu: Trend,
    pub memory: Trend,
    pub response_time: Trend,
}

/// Classify a series by comparing the mean of its newer half against its
/// older half. Relative change above `threshold` is a trend.
pub fn compute_trend(values: &[f64], threshold: f64) -> Trend {
    if values.is_empty() {
        return Trend::default();
    }
    let average = mean(values);
    if values.len() < 2 {
        return Trend {
            direction: TrendDirection::Stable,
            average,
            older_mean: average,
            newer_mean: average,
            samples: values.len(),
        };
    }

    let (older, newer) = values.split_at(values.len() / 2);
    let older_mean = mean(older);
    let newer_mean = mean(newer);

    let direction = if older_mean == 0.0 {
        if newer_mean > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Stable
        }
    } else {
        let change = (newer_mean - older_mean) / older_mean;
        if change > threshold {
            TrendDirection::Increasing
        } else if change < -threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    };

    Trend {
        direction,
        average,
        older_mean,
        newer_mean,
        samples: values.len(),
    }
}

/// Trends for cpu, memory and response time over `history`.
pub fn compute_trends(history: &[ScalingMetrics], threshold: f64) -> TrendReport {
    let series = |f: fn(&ScalingMetrics) -> f64| -> Vec<f64> { history.iter().map(f).collect() };
    TrendReport {
        cpu: compute_trend(&series(|m| m.cpu_utilization), threshold),
        memory: compute_trend(&series(|m| m.memory_utilization), threshold),
        response_time: compute_trend(&series(|m| m.response_time_ms), threshold),
    }
}

/// How the engine has been acting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DecisionPatterns {
    pub total_decisions: usize,
    pub scale_up_count: usize,
    pub scale_down_count: usize,
    /// Hours between the oldest and newest decision.
    pub span_hours: f64,
    /// Decisions per hour over the span.
    pub scaling_frequency: f64,
    /// Fraction of decisions with confidence above 0.7.
    pub success_rate: f64,
}

/// Summarize decisions, oldest first.
///
/// Frequency needs at least two decisions; a zero-second span is treated
/// as one second.
pub fn analyze_decisions(decisions: &[ScalingDecision]) -> DecisionPatterns {
    let total = decisions.len();
    if total == 0 {
        return DecisionPatterns::default();
    }

    let scale_up_count = decisions
        .iter()
        .filter(|d| d.action == ScalingAction::ScaleUp)
        .count();
    let confident = decisions.iter().filter(|d| d.confidence > 0.7).count();

    let first = decisions.iter().map(|d| d.timestamp).min().unwrap_or(0);
    let last = decisions.iter().map(|d| d.timestamp).max().unwrap_or(0);
    let span_secs = last.saturating_sub(first);
    let span_hours = span_secs as f64 / 3600.0;

    let scaling_frequency = if total < 2 {
        0.0
    } else {
        total as f64 / (span_secs.max(1) as f64 / 3600.0)
    };

    DecisionPatterns {
        total_decisions: total,
        scale_up_count,
        scale_down_count: total - scale_up_count,
        span_hours,
        scaling_frequency,
        success_rate: confident as f64 / total as f64,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
