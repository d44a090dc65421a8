//! Error types for Tidepool configuration.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a `ScalingConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min_instances ({min}) exceeds max_instances ({max})")]
    InvalidBounds { min: u32, max: u32 },

    #[error("{field} must be greater than zero")]
    ZeroInstances { field: &'static str },

    #[error("{field} must be within (0, 100], got {value}")]
    InvalidTarget { field: &'static str, value: f64 },

    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
