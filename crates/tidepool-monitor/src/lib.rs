//! tidepool-monitor — scaling analytics and health reporting.
//!
//! Consumes the metrics snapshots and decisions produced by the control
//! loop, keeps bounded histories of both, and derives:
//!
//! - per-series trends (cpu, memory, response time)
//! - decision patterns (counts, frequency per hour, success rate)
//! - threshold alerts on every recorded snapshot
//! - a 0–100 health score with a status bucket and recommendations
//!
//! # Architecture
//!
//! ```text
//! ScalingMonitor
//!   ├── record_metrics()  → alerts + recompute trends
//!   ├── record_decision() → recompute patterns
//!   ├── health_report()   → score, status, alert counts, trends, advice
//!   └── export()          → MetricsExport (JSON document)
//! ```

pub mod alerts;
pub mod analysis;
pub mod config;
pub mod export;
pub mod health;
pub mod monitor;

pub use analysis::{DecisionPatterns, Trend, TrendDirection, TrendReport};
pub use config::{AlertThresholds, HealthWeights, MonitorConfig, RecommendationThresholds};
pub use export::{load_export, write_export, MetricsExport};
pub use health::{AlertCounts, HealthReport, HealthStatus};
pub use monitor::ScalingMonitor;
