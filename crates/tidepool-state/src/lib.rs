//! tidepool-state — shared types for the Tidepool horizontal scaler.
//!
//! Holds everything the sampler, decision engine, load distributor and
//! monitor exchange with each other:
//!
//! - `ScalingConfig` and its validation / TOML loading
//! - `ScalingMetrics`, `ScalingDecision`, `Alert`, `DistributionRecord`
//! - `InstancePool` (single writer) and `PoolView` (shared readers)
//! - `BoundedHistory<T>`, the fixed-capacity ring used for every history
//!
//! # Sharing
//!
//! `PoolView` and `BoundedHistory` are `Send + Sync` and meant to be
//! wrapped in `Arc` and shared between the control loop and request
//! handlers.

pub mod config;
pub mod error;
pub mod history;
pub mod pool;
pub mod types;

pub use config::{LoadBalancingStrategy, ScalingConfig};
pub use error::{ConfigError, ConfigResult};
pub use history::BoundedHistory;
pub use pool::{InstancePool, PoolView};
pub use types::*;
