//! Scaling configuration — bounds, utilization targets, and the default
//! load-balancing strategy.
//!
//! Created once at startup and read-only afterwards. Construction sites
//! call [`ScalingConfig::validate`] before anything is built on top of it.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Load-balancing algorithm used by the distributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingStrategy {
    #[default]
    RoundRobin,
    LeastConnections,
    WeightedRoundRobin,
    IpHash,
    LeastResponseTime,
    ConsistentHash,
}

impl LoadBalancingStrategy {
    /// Every strategy, in declaration order.
    pub const ALL: [LoadBalancingStrategy; 6] = [
        Self::RoundRobin,
        Self::LeastConnections,
        Self::WeightedRoundRobin,
        Self::IpHash,
        Self::LeastResponseTime,
        Self::ConsistentHash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::LeastConnections => "least_connections",
            Self::WeightedRoundRobin => "weighted_round_robin",
            Self::IpHash => "ip_hash",
            Self::LeastResponseTime => "least_response_time",
            Self::ConsistentHash => "consistent_hash",
        }
    }
}

impl fmt::Display for LoadBalancingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Autoscaling parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingConfig {
    /// Pool floor. Must be > 0 and <= `max_instances`.
    pub min_instances: u32,
    /// Pool ceiling.
    pub max_instances: u32,
    /// CPU utilization target, percent.
    #[serde(default = "default_target_cpu")]
    pub target_cpu_utilization: f64,
    /// Memory utilization target, percent.
    #[serde(default = "default_target_memory")]
    pub target_memory_utilization: f64,
    /// Minimum seconds between same-direction actions. Only enforced
    /// when `enforce_cooldown` is set.
    #[serde(default = "default_cooldown")]
    pub scaling_cooldown: u64,
    /// Strategy used by `distribute_load`.
    #[serde(default)]
    pub strategy: LoadBalancingStrategy,
    #[serde(default)]
    pub enforce_cooldown: bool,
}

fn default_target_cpu() -> f64 {
    70.0
}

fn default_target_memory() -> f64 {
    80.0
}

fn default_cooldown() -> u64 {
    300
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_instances: 1,
            max_instances: 10,
            target_cpu_utilization: default_target_cpu(),
            target_memory_utilization: default_target_memory(),
            scaling_cooldown: default_cooldown(),
            strategy: LoadBalancingStrategy::default(),
            enforce_cooldown: false,
        }
    }
}

impl ScalingConfig {
    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_instances == 0 {
            return Err(ConfigError::ZeroInstances {
                field: "min_instances",
            });
        }
        if self.max_instances == 0 {
            return Err(ConfigError::ZeroInstances {
                field: "max_instances",
            });
        }
        if self.min_instances > self.max_instances {
            return Err(ConfigError::InvalidBounds {
                min: self.min_instances,
                max: self.max_instances,
            });
        }
        check_target("target_cpu_utilization", self.target_cpu_utilization)?;
        check_target("target_memory_utilization", self.target_memory_utilization)?;
        Ok(())
    }

    /// Parse and validate a `ScalingConfig` from TOML text.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: ScalingConfig =
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a `ScalingConfig` from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_toml_str(&content)
    }
}

fn check_target(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_nan() || value <= 0.0 || value > 100.0 {
        return Err(ConfigError::InvalidTarget { field, value });
    }
    Ok(())
}
