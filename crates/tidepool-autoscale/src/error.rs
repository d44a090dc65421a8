//! Errors returned when executing a scaling decision.

use thiserror::Error;

use tidepool_state::{ScalingAction, ScalingStatus};

/// Result type alias for engine operations.
pub type ScaleResult<T> = Result<T, ScaleError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScaleError {
    /// The step would leave `[min_instances, max_instances]`.
    #[error("cannot {action}: pool at {current}, bound is {bound}")]
    AtBound {
        action: ScalingAction,
        current: u32,
        bound: u32,
    },

    /// The engine was put into a side state by an operator.
    #[error("scaling suspended while engine is {0}")]
    Suspended(ScalingStatus),

    #[error("{action} cooldown active for another {remaining_secs}s")]
    CooldownActive {
        action: ScalingAction,
        remaining_secs: u64,
    },
}
