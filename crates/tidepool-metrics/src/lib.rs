//! tidepool-metrics — point-in-time load sampling for the scaler.
//!
//! # Architecture
//!
//! ```text
//! MetricsSampler
//!   ├── PoolView            ← current pool size (owned by the engine)
//!   ├── SystemLoadProvider  ← injected: cpu %, memory %, latency, rps, errors
//!   └── sample() → ScalingMetrics (stale copy of last sample on provider failure)
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for a /metrics endpoint
//! ```

pub mod prometheus;
pub mod provider;
pub mod sampler;

pub use prometheus::render_prometheus;
pub use provider::{
    JsonFileLoadProvider, ProviderError, StaticLoadProvider, SystemLoad, SystemLoadProvider,
};
pub use sampler::{MetricsSampler, SampleError};
