//! Metrics sampler — combines the pool size with provider load figures.
//!
//! Sampling never fails once a first snapshot exists: if the provider is
//! unavailable the previous figures are reused and the snapshot is marked
//! stale, so the control loop can back off instead of stalling.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use tidepool_state::{epoch_secs, PoolView, ScalingConfig, ScalingMetrics};

use crate::provider::{ProviderError, SystemLoad, SystemLoadProvider};

/// Errors returned by [`MetricsSampler::sample`].
#[derive(Debug, Error)]
pub enum SampleError {
    /// The provider failed before any snapshot was taken.
    #[error("no snapshot available: {0}")]
    NoSnapshot(#[source] ProviderError),
}

/// Produces `ScalingMetrics` snapshots.
pub struct MetricsSampler {
    pool: PoolView,
    provider: Arc<dyn SystemLoadProvider>,
    config: ScalingConfig,
    last: Mutex<Option<ScalingMetrics>>,
}

impl MetricsSampler {
    pub fn new(
        pool: PoolView,
        provider: Arc<dyn SystemLoadProvider>,
        config: ScalingConfig,
    ) -> Self {
        Self {
            pool,
            provider,
            config,
            last: Mutex::new(None),
        }
    }

    /// Take a snapshot of the current load.
    pub fn sample(&self) -> Result<ScalingMetrics, SampleError> {
        let current_instances = self.pool.current();

        match self.provider.sample_system_load() {
            Ok(load) => {
                let metrics = ScalingMetrics {
                    current_instances,
                    target_instances: self.estimate_target(current_instances, &load),
                    cpu_utilization: load.cpu_utilization,
                    memory_utilization: load.memory_utilization,
                    response_time_ms: load.response_time_ms,
                    throughput: load.throughput,
                    error_rate: load.error_rate,
                    timestamp: epoch_secs(),
                    stale: false,
                };
                debug!(
                    instances = current_instances,
                    cpu = metrics.cpu_utilization,
                    memory = metrics.memory_utilization,
                    response_ms = metrics.response_time_ms,
                    "metrics sampled"
                );
                *self.last.lock().expect("last sample lock") = Some(metrics.clone());
                Ok(metrics)
            }
            Err(e) => {
                let last = self.last.lock().expect("last sample lock");
                match last.as_ref() {
                    Some(previous) => {
                        warn!(error = %e, "load provider unavailable, reusing last snapshot");
                        let reused = SystemLoad {
                            cpu_utilization: previous.cpu_utilization,
                            memory_utilization: previous.memory_utilization,
                            response_time_ms: previous.response_time_ms,
                            throughput: previous.throughput,
                            error_rate: previous.error_rate,
                        };
                        Ok(ScalingMetrics {
                            current_instances,
                            target_instances: self.estimate_target(current_instances, &reused),
                            timestamp: epoch_secs(),
                            stale: true,
                            ..previous.clone()
                        })
                    }
                    None => Err(SampleError::NoSnapshot(e)),
                }
            }
        }
    }

    /// Most recent fresh snapshot, if any.
    pub fn last_snapshot(&self) -> Option<ScalingMetrics> {
        self.last.lock().expect("last sample lock").clone()
    }

    /// Proportional pool size for the given load, clamped to the
    /// configured bounds. Informational only; the engine steps by one.
    fn estimate_target(&self, current: u32, load: &SystemLoad) -> u32 {
        let cpu_ratio = load.cpu_utilization / self.config.target_cpu_utilization;
        let memory_ratio = load.memory_utilization / self.config.target_memory_utilization;
        let ratio = cpu_ratio.max(memory_ratio);
        if !ratio.is_finite() {
            return current.clamp(self.config.min_instances, self.config.max_instances);
        }
        let desired = (current as f64 * ratio).ceil().max(0.0) as u32;
        desired.clamp(self.config.min_instances, self.config.max_instances)
    }
}
