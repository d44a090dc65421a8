//! Scaler configuration — one document covering every component.
//!
//! ```toml
//! [scaling]
//! min_instances = 2
//! max_instances = 12
//! strategy = "least_connections"
//!
//! [monitor]
//! max_scaling_frequency_per_hour = 6.0
//!
//! [loop]
//! interval_secs = 30
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tidepool_balancer::DistributorConfig;
use tidepool_monitor::MonitorConfig;
use tidepool_state::{ConfigError, ConfigResult, ScalingConfig};

/// Control-loop timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoopConfig {
    /// Seconds between iterations.
    pub interval_secs: u64,
    /// Seconds to wait after a failed or stale iteration.
    pub backoff_secs: u64,
    /// Seconds `stop_monitoring` waits for the loop to exit.
    pub stop_timeout_secs: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            backoff_secs: 60,
            stop_timeout_secs: 5,
        }
    }
}

impl LoopConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScalerConfig {
    pub scaling: ScalingConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub distributor: DistributorConfig,
    #[serde(default, rename = "loop")]
    pub control_loop: LoopConfig,
}

impl ScalerConfig {
    /// Config with the given scaling section and defaults elsewhere.
    pub fn with_scaling(scaling: ScalingConfig) -> Self {
        Self {
            scaling,
            ..Default::default()
        }
    }

    /// Parse and validate a scaler config from TOML text.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: ScalerConfig =
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.scaling.validate()?;
        Ok(config)
    }

    /// Load and validate a scaler config from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidepool_state::LoadBalancingStrategy;

    #[test]
    fn parse_full_document() {
        let config = ScalerConfig::from_toml_str(
            r#"
[scaling]
min_instances = 2
max_instances = 12
target_cpu_utilization = 65.0
strategy = "ip_hash"

[monitor]
max_scaling_frequency_per_hour = 6.0

[monitor.weights]
critical_alert = 25.0

[distributor]
history_capacity = 500

[loop]
interval_secs = 15
"#,
        )
        .unwrap();

        assert_eq!(config.scaling.min_instances, 2);
        assert_eq!(config.scaling.strategy, LoadBalancingStrategy::IpHash);
        assert_eq!(config.monitor.max_scaling_frequency_per_hour, 6.0);
        assert_eq!(config.monitor.weights.critical_alert, 25.0);
        assert_eq!(config.monitor.weights.warning_alert, 5.0);
        assert_eq!(config.distributor.history_capacity, 500);
        assert_eq!(config.distributor.response_time_window, 100);
        assert_eq!(config.control_loop.interval(), Duration::from_secs(15));
        assert_eq!(config.control_loop.backoff(), Duration::from_secs(60));
    }

    #[test]
    fn optional_sections_default() {
        let doc = "[scaling]\nmin_instances = 1\nmax_instances = 4\n";
        let config = ScalerConfig::from_toml_str(doc).unwrap();
        assert_eq!(config.monitor, MonitorConfig::default());
        assert_eq!(config.control_loop, LoopConfig::default());
    }

    #[test]
    fn missing_scaling_section_is_a_parse_error() {
        assert!(matches!(
            ScalerConfig::from_toml_str("[loop]\ninterval_secs = 5\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(matches!(
            ScalerConfig::from_toml_str("[scaling]\nmin_instances = 9\nmax_instances = 4\n"),
            Err(ConfigError::InvalidBounds { min: 9, max: 4 })
        ));
    }
}
