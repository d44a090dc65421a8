//! tidepool-autoscale — metrics-driven pool scaling.
//!
//! Compares a `ScalingMetrics` snapshot against the configured targets and
//! moves the instance pool by one step at a time.
//!
//! # Scaling Algorithm
//!
//! ```text
//! if (cpu > target_cpu or memory > target_memory or response_ms > 200)
//!    and instances < max:
//!     ScaleUp    (confidence 0.8)
//!
//! if cpu < target_cpu * 0.5 and memory < target_memory * 0.5
//!    and instances > min:
//!     ScaleDown  (confidence 0.7)
//! ```
//!
//! The asymmetric thresholds give hysteresis; the single step bounds the
//! amplitude of any oscillation. An optional cooldown (`enforce_cooldown`)
//! suppresses back-to-back actions in the same direction.

pub mod engine;
pub mod error;

pub use engine::DecisionEngine;
pub use error::{ScaleError, ScaleResult};
