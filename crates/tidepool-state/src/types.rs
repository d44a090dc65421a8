//! Domain types exchanged between the Tidepool components.
//!
//! Snapshots, decisions, alerts and distribution records are immutable
//! once created; all of them serialize to JSON for the metrics export.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::LoadBalancingStrategy;

/// Identifier of a compute instance in the pool.
pub type InstanceId = String;

/// Identifier returned by `distribute_load` callers that need a string
/// when the pool is empty.
pub const UNAVAILABLE_INSTANCE: &str = "unavailable";

// ── Metrics ───────────────────────────────────────────────────────

/// Point-in-time load snapshot produced by the metrics sampler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingMetrics {
    pub current_instances: u32,
    /// Proportional estimate of the pool size the load calls for.
    pub target_instances: u32,
    /// CPU utilization, percent.
    pub cpu_utilization: f64,
    /// Memory utilization, percent.
    pub memory_utilization: f64,
    /// Average response time in milliseconds.
    pub response_time_ms: f64,
    /// Requests per second.
    pub throughput: f64,
    /// Error rate, percent.
    pub error_rate: f64,
    /// Unix timestamp (seconds).
    pub timestamp: u64,
    /// Set when the load figures were reused from an earlier sample
    /// because the provider was unavailable.
    #[serde(default)]
    pub stale: bool,
}

// ── Decisions ─────────────────────────────────────────────────────

/// Direction of a scaling action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingAction {
    ScaleUp,
    ScaleDown,
}

impl ScalingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScaleUp => "scale_up",
            Self::ScaleDown => "scale_down",
        }
    }
}

impl fmt::Display for ScalingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scaling decision emitted by the decision engine. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingDecision {
    pub id: String,
    pub action: ScalingAction,
    pub reason: String,
    /// The snapshot that triggered the decision.
    pub metrics: ScalingMetrics,
    /// Fixed per-action weight in [0, 1].
    pub confidence: f64,
    /// Unix timestamp (seconds).
    pub timestamp: u64,
}

/// Externally visible status of the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStatus {
    Idle,
    ScalingUp,
    ScalingDown,
    Error,
    Maintenance,
}

impl ScalingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ScalingUp => "scaling_up",
            Self::ScalingDown => "scaling_down",
            Self::Error => "error",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ScalingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Alerts ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// Which threshold an alert was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighCpu,
    HighMemory,
    HighResponseTime,
    HighErrorRate,
}

/// A threshold breach recorded by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub metric_value: f64,
    pub threshold: f64,
    /// Unix timestamp (seconds).
    pub timestamp: u64,
}

// ── Distribution ──────────────────────────────────────────────────

/// One load-distribution selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionRecord {
    /// Unix timestamp (seconds).
    pub timestamp: u64,
    pub instance_id: InstanceId,
    pub strategy: LoadBalancingStrategy,
    /// Active connections on the chosen instance when it was picked.
    pub connections_at_selection: u64,
}

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
