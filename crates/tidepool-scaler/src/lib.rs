//! tidepool-scaler — the horizontal-scaling subsystem assembled.
//!
//! `HorizontalScaler` wires the sampler, decision engine, load distributor
//! and monitor together and exposes the operations collaborators use:
//!
//! ```text
//! HorizontalScaler
//!   ├── start_monitoring() / stop_monitoring()   background control loop
//!   │     sample → evaluate → execute → record, every 30s (60s after a failure)
//!   ├── distribute_load(request)                 inline, per request
//!   ├── scaling_status() / health_report()       read-only reporting
//!   └── export_metrics(path)                     JSON export, never panics
//! ```
//!
//! There is no global instance: construct one per pool and pass it (or an
//! `Arc` of it) to whatever owns the request path.

pub mod config;
pub mod control_loop;
pub mod scaler;

pub use config::{LoopConfig, ScalerConfig};
pub use control_loop::CycleOutcome;
pub use scaler::{HorizontalScaler, ScalingStatusReport};

pub use tidepool_balancer::{DistributorConfig, LoadRequest};
pub use tidepool_metrics::{SystemLoad, SystemLoadProvider};
pub use tidepool_monitor::{load_export, HealthReport, MetricsExport, MonitorConfig};
pub use tidepool_state::{LoadBalancingStrategy, ScalingConfig};
