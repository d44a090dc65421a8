//! Horizontal scaler — the public face of the subsystem.
//!
//! Owns the decision engine, sampler, monitor and load distributor, shared
//! with the background loop through an `Arc`. Request handlers reach the
//! distributor through `&self`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tidepool_autoscale::DecisionEngine;
use tidepool_balancer::{LoadDistributor, LoadRequest};
use tidepool_metrics::{render_prometheus, MetricsSampler, SystemLoadProvider};
use tidepool_monitor::{write_export, HealthReport, ScalingMonitor};
use tidepool_state::{
    ConfigResult, InstanceId, LoadBalancingStrategy, PoolView, ScalingConfig, ScalingStatus,
};

use crate::config::{LoopConfig, ScalerConfig};
use crate::control_loop::{self, Core, CycleOutcome};

/// Snapshot returned by [`HorizontalScaler::scaling_status`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingStatusReport {
    pub status: ScalingStatus,
    pub current_instances: u32,
    pub target_instances: u32,
    pub config: ScalingConfig,
    pub recent_decision_count: usize,
    pub monitoring_active: bool,
    /// Selections per instance over the distributor's retained history.
    pub distribution: BTreeMap<InstanceId, u64>,
}

/// Background loop bookkeeping.
struct LoopSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Autoscaling, load distribution and scaling health for one pool.
pub struct HorizontalScaler {
    core: Arc<Core>,
    pool: PoolView,
    loop_config: LoopConfig,
    slot: Mutex<Option<LoopSlot>>,
}

impl HorizontalScaler {
    /// Build a scaler. Fails if the scaling config is invalid.
    pub fn new(config: ScalerConfig, provider: Arc<dyn SystemLoadProvider>) -> ConfigResult<Self> {
        let engine = DecisionEngine::new(config.scaling.clone())?;
        let pool = engine.pool_view();
        let sampler = MetricsSampler::new(pool.clone(), provider, config.scaling.clone());
        let monitor = ScalingMonitor::new(config.monitor);

        info!(
            min = config.scaling.min_instances,
            max = config.scaling.max_instances,
            strategy = %config.scaling.strategy,
            "horizontal scaler initialized"
        );

        Ok(Self {
            core: Arc::new(Core {
                engine,
                sampler,
                monitor,
                distributor: LoadDistributor::new(config.distributor),
            }),
            pool,
            loop_config: config.control_loop,
            slot: Mutex::new(None),
        })
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.core.engine
    }

    pub fn monitor(&self) -> &ScalingMonitor {
        &self.core.monitor
    }

    pub fn distributor(&self) -> &LoadDistributor {
        &self.core.distributor
    }

    // ── Control loop ───────────────────────────────────────────

    /// Spawn the background control loop on the current tokio runtime.
    ///
    /// Returns `false` (and changes nothing) if the loop is already
    /// running or there is no runtime to spawn it on.
    pub fn start_monitoring(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("scaling monitoring requires a tokio runtime, not started");
            return false;
        };

        let mut slot = self.slot.lock().expect("loop slot lock");
        if slot.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            warn!("scaling monitoring already active");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(control_loop::run(
            Arc::clone(&self.core),
            self.loop_config.clone(),
            shutdown_rx,
        ));
        *slot = Some(LoopSlot {
            handle,
            shutdown_tx,
        });
        info!("scaling monitoring started");
        true
    }

    /// Signal the loop to stop and wait up to the configured timeout for
    /// it to exit. A loop that does not exit in time is aborted.
    pub async fn stop_monitoring(&self) {
        let slot = self.slot.lock().expect("loop slot lock").take();
        let Some(LoopSlot {
            mut handle,
            shutdown_tx,
        }) = slot
        else {
            debug!("scaling monitoring not active");
            return;
        };

        let _ = shutdown_tx.send(true);
        match tokio::time::timeout(self.loop_config.stop_timeout(), &mut handle).await {
            Ok(Ok(())) => info!("scaling monitoring stopped"),
            Ok(Err(e)) => error!(error = %e, "scaling loop task failed"),
            Err(_) => {
                warn!(
                    timeout_secs = self.loop_config.stop_timeout_secs,
                    "scaling loop did not stop in time, aborting"
                );
                handle.abort();
            }
        }
    }

    pub fn monitoring_active(&self) -> bool {
        self.slot
            .lock()
            .expect("loop slot lock")
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Run one sample → evaluate → execute → record iteration inline.
    pub fn run_cycle(&self) -> CycleOutcome {
        self.core.run_cycle()
    }

    // ── Load distribution ──────────────────────────────────────

    /// Pick an instance for `request` with the configured strategy.
    ///
    /// `None` means the pool is empty.
    pub fn distribute_load(&self, request: &LoadRequest) -> Option<InstanceId> {
        self.distribute_load_with(self.core.engine.config().strategy, request)
    }

    /// Pick an instance for `request` with an explicit strategy.
    pub fn distribute_load_with(
        &self,
        strategy: LoadBalancingStrategy,
        request: &LoadRequest,
    ) -> Option<InstanceId> {
        let instances = self.pool.active_instances();
        self.core.distributor.select(strategy, request, &instances)
    }

    pub fn update_instance_metrics(&self, instance_id: &str, response_time_ms: f64) {
        self.core
            .distributor
            .update_instance_metrics(instance_id, response_time_ms);
    }

    pub fn set_instance_weight(&self, instance_id: &str, weight: f64) {
        self.core.distributor.set_instance_weight(instance_id, weight);
    }

    pub fn release_connection(&self, instance_id: &str) {
        self.core.distributor.release_connection(instance_id);
    }

    // ── Reporting ──────────────────────────────────────────────

    pub fn scaling_status(&self) -> ScalingStatusReport {
        let engine = &self.core.engine;
        let current_instances = engine.current_instances();
        let target_instances = self
            .core
            .monitor
            .latest_metrics()
            .map(|m| m.target_instances)
            .unwrap_or(current_instances);

        ScalingStatusReport {
            status: engine.status(),
            current_instances,
            target_instances,
            config: engine.config().clone(),
            recent_decision_count: engine.decision_count(),
            monitoring_active: self.monitoring_active(),
            distribution: self.core.distributor.distribution_summary(),
        }
    }

    pub fn health_report(&self) -> HealthReport {
        self.core.monitor.health_report()
    }

    /// Latest snapshot in Prometheus text format, if one was recorded.
    pub fn render_prometheus(&self) -> Option<String> {
        self.core
            .monitor
            .latest_metrics()
            .map(|m| render_prometheus(&m))
    }

    /// Write histories, alerts and decision patterns to `path` as JSON.
    ///
    /// Returns `false` on any I/O or serialization failure; the error is
    /// logged, never propagated.
    pub fn export_metrics(&self, path: &Path) -> bool {
        let export = self.core.monitor.export();
        match write_export(path, &export) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    metrics = export.metrics_history.len(),
                    decisions = export.decision_history.len(),
                    alerts = export.alerts.len(),
                    "scaling metrics exported"
                );
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "scaling metrics export failed");
                false
            }
        }
    }
}

impl Drop for HorizontalScaler {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock()
            && let Some(slot) = slot.take()
        {
            let _ = slot.shutdown_tx.send(true);
        }
    }
}
