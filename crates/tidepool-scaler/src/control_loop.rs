//! The sample → evaluate → execute → record control loop.
//!
//! One iteration is a plain synchronous function (`Core::run_cycle`); the
//! background task is a timer around it that runs each iteration on the
//! blocking pool, since providers may do synchronous I/O. A failed or stale
//! iteration is logged and the next one is scheduled after the backoff
//! interval; the loop itself never exits on an iteration error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use tidepool_autoscale::{DecisionEngine, ScaleError};
use tidepool_balancer::LoadDistributor;
use tidepool_metrics::MetricsSampler;
use tidepool_monitor::ScalingMonitor;
use tidepool_state::ScalingAction;

use crate::config::LoopConfig;

/// Result of one control-loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The pool was moved by one step.
    Scaled {
        action: ScalingAction,
        from: u32,
        to: u32,
    },
    /// Metrics recorded, no action warranted.
    Steady,
    /// A decision was made but the engine refused to execute it.
    Refused(ScaleError),
    /// The provider was down; the last snapshot was reused and ignored.
    Stale,
    /// No snapshot could be produced.
    Failed(String),
}

impl CycleOutcome {
    /// Whether the next iteration should wait for the backoff interval.
    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Stale | CycleOutcome::Failed(_))
    }
}

/// Components the loop drives.
pub(crate) struct Core {
    pub engine: DecisionEngine,
    pub sampler: MetricsSampler,
    pub monitor: ScalingMonitor,
    pub distributor: LoadDistributor,
}

impl Core {
    pub fn run_cycle(&self) -> CycleOutcome {
        let metrics = match self.sampler.sample() {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, "metrics collection failed");
                return CycleOutcome::Failed(e.to_string());
            }
        };

        if metrics.stale {
            warn!(
                instances = metrics.current_instances,
                "skipping iteration on stale metrics"
            );
            return CycleOutcome::Stale;
        }

        self.monitor.record_metrics(&metrics);

        let Some(decision) = self.engine.evaluate(&metrics) else {
            return CycleOutcome::Steady;
        };

        match self.engine.execute(&decision) {
            Ok((from, to)) => {
                self.monitor.record_decision(&decision);
                if decision.action == ScalingAction::ScaleDown {
                    let active = self.engine.pool_view().active_instances();
                    self.distributor.retain_instances(&active);
                }
                CycleOutcome::Scaled {
                    action: decision.action,
                    from,
                    to,
                }
            }
            Err(e) => {
                warn!(id = %decision.id, error = %e, "scaling decision not executed");
                CycleOutcome::Refused(e)
            }
        }
    }
}

/// Delay before the iteration following `outcome`.
pub fn next_delay(outcome: &CycleOutcome, config: &LoopConfig) -> Duration {
    if outcome.is_failure() {
        config.backoff()
    } else {
        config.interval()
    }
}

/// Run iterations until `shutdown` flips (or its sender is dropped).
pub(crate) async fn run(core: Arc<Core>, config: LoopConfig, mut shutdown: watch::Receiver<bool>) {
    info!(
        interval_secs = config.interval_secs,
        backoff_secs = config.backoff_secs,
        "scaling loop started"
    );

    loop {
        let cycle = Arc::clone(&core);
        let outcome = match tokio::task::spawn_blocking(move || cycle.run_cycle()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "scaling iteration panicked");
                CycleOutcome::Failed(e.to_string())
            }
        };
        let delay = next_delay(&outcome, &config);
        debug!(?outcome, delay_secs = delay.as_secs(), "scaling iteration finished");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                info!("scaling loop shutting down");
                break;
            }
        }
    }
}
