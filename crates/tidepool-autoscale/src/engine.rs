//! Decision engine — evaluates snapshots and steps the instance pool.
//!
//! The engine is the single owner of the `InstancePool`. Everyone else
//! (sampler, load distributor) gets a read-only `PoolView`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use tidepool_state::{
    epoch_secs, BoundedHistory, ConfigResult, InstancePool, PoolView, ScalingAction,
    ScalingConfig, ScalingDecision, ScalingMetrics, ScalingStatus,
};

use crate::error::{ScaleError, ScaleResult};

/// Response time above which the pool scales up regardless of targets.
pub const RESPONSE_TIME_CEILING_MS: f64 = 200.0;

pub const SCALE_UP_CONFIDENCE: f64 = 0.8;
pub const SCALE_DOWN_CONFIDENCE: f64 = 0.7;

/// Executed decisions kept by the engine.
pub const DECISION_HISTORY_CAPACITY: usize = 50;

/// Last action times, for the optional cooldown gate.
#[derive(Debug, Default)]
struct CooldownState {
    last_scale_up: u64,
    last_scale_down: u64,
}

impl CooldownState {
    fn last(&self, action: ScalingAction) -> u64 {
        match action {
            ScalingAction::ScaleUp => self.last_scale_up,
            ScalingAction::ScaleDown => self.last_scale_down,
        }
    }

    fn mark(&mut self, action: ScalingAction, now: u64) {
        match action {
            ScalingAction::ScaleUp => self.last_scale_up = now,
            ScalingAction::ScaleDown => self.last_scale_down = now,
        }
    }
}

/// Decides when to add or remove instances and applies the change.
pub struct DecisionEngine {
    config: ScalingConfig,
    pool: InstancePool,
    status: Mutex<ScalingStatus>,
    history: BoundedHistory<ScalingDecision>,
    cooldown: Mutex<CooldownState>,
    next_id: AtomicU64,
}

impl DecisionEngine {
    /// Validate `config` and create an engine whose pool starts at
    /// `min_instances`.
    pub fn new(config: ScalingConfig) -> ConfigResult<Self> {
        config.validate()?;
        let pool = InstancePool::new(config.min_instances, config.max_instances);
        Ok(Self {
            config,
            pool,
            status: Mutex::new(ScalingStatus::Idle),
            history: BoundedHistory::new(DECISION_HISTORY_CAPACITY),
            cooldown: Mutex::new(CooldownState::default()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    /// Read-only handle on the pool size.
    pub fn pool_view(&self) -> PoolView {
        self.pool.view()
    }

    pub fn current_instances(&self) -> u32 {
        self.pool.current()
    }

    pub fn status(&self) -> ScalingStatus {
        *self.status.lock().expect("status lock")
    }

    /// Decide whether `metrics` calls for a scaling action.
    ///
    /// At most one decision per call; scale-up is checked first. Stale
    /// snapshots never produce a decision.
    pub fn evaluate(&self, metrics: &ScalingMetrics) -> Option<ScalingDecision> {
        if metrics.stale {
            debug!("skipping evaluation of stale snapshot");
            return None;
        }

        let config = &self.config;
        let instances = metrics.current_instances;

        let overloaded = metrics.cpu_utilization > config.target_cpu_utilization
            || metrics.memory_utilization > config.target_memory_utilization
            || metrics.response_time_ms > RESPONSE_TIME_CEILING_MS;

        let (action, reason, confidence) = if overloaded && instances < config.max_instances {
            (
                ScalingAction::ScaleUp,
                "High resource utilization",
                SCALE_UP_CONFIDENCE,
            )
        } else if metrics.cpu_utilization < config.target_cpu_utilization * 0.5
            && metrics.memory_utilization < config.target_memory_utilization * 0.5
            && instances > config.min_instances
        {
            (
                ScalingAction::ScaleDown,
                "Low resource utilization",
                SCALE_DOWN_CONFIDENCE,
            )
        } else {
            return None;
        };

        let now = epoch_secs();
        if let Some(remaining) = self.cooldown_remaining(action, now) {
            debug!(%action, remaining_secs = remaining, "decision suppressed by cooldown");
            return None;
        }

        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        let decision = ScalingDecision {
            id: format!("decision-{now}-{seq}"),
            action,
            reason: reason.to_string(),
            metrics: metrics.clone(),
            confidence,
            timestamp: now,
        };
        debug!(
            id = %decision.id,
            %action,
            instances,
            cpu = metrics.cpu_utilization,
            memory = metrics.memory_utilization,
            response_ms = metrics.response_time_ms,
            "scaling decision"
        );
        Some(decision)
    }

    /// Apply a decision: move the pool by exactly one step and append the
    /// decision to history.
    ///
    /// Returns the `(from, to)` pool sizes. Refuses when the engine is in
    /// `Maintenance` or `Error`, when the step would leave the configured
    /// bounds, or when an enforced cooldown is still running.
    pub fn execute(&self, decision: &ScalingDecision) -> ScaleResult<(u32, u32)> {
        let action = decision.action;
        let now = epoch_secs();

        {
            let mut status = self.status.lock().expect("status lock");
            if matches!(*status, ScalingStatus::Maintenance | ScalingStatus::Error) {
                return Err(ScaleError::Suspended(*status));
            }
            if let Some(remaining_secs) = self.cooldown_remaining(action, now) {
                return Err(ScaleError::CooldownActive {
                    action,
                    remaining_secs,
                });
            }
            *status = match action {
                ScalingAction::ScaleUp => ScalingStatus::ScalingUp,
                ScalingAction::ScaleDown => ScalingStatus::ScalingDown,
            };
        }

        let result = self.pool.step(action);
        self.settle();

        match result {
            Ok((from, to)) => {
                self.cooldown.lock().expect("cooldown lock").mark(action, now);
                self.history.push(decision.clone());
                info!(
                    id = %decision.id,
                    %action,
                    from,
                    to,
                    reason = %decision.reason,
                    "pool scaled"
                );
                Ok((from, to))
            }
            Err(current) => {
                let bound = match action {
                    ScalingAction::ScaleUp => self.pool.max(),
                    ScalingAction::ScaleDown => self.pool.min(),
                };
                warn!(id = %decision.id, %action, current, bound, "scaling step refused at bound");
                Err(ScaleError::AtBound {
                    action,
                    current,
                    bound,
                })
            }
        }
    }

    /// Executed decisions, oldest first.
    pub fn decision_history(&self) -> Vec<ScalingDecision> {
        self.history.snapshot()
    }

    pub fn decision_count(&self) -> usize {
        self.history.len()
    }

    /// Suspend execution for operator maintenance.
    pub fn enter_maintenance(&self) {
        *self.status.lock().expect("status lock") = ScalingStatus::Maintenance;
        info!("decision engine entered maintenance");
    }

    /// Flag the engine as failed; execution stays suspended until
    /// [`resume`](Self::resume).
    pub fn mark_error(&self) {
        *self.status.lock().expect("status lock") = ScalingStatus::Error;
        warn!("decision engine marked as errored");
    }

    /// Return to `Idle` from a side state.
    pub fn resume(&self) {
        *self.status.lock().expect("status lock") = ScalingStatus::Idle;
        info!("decision engine resumed");
    }

    /// Leave `ScalingUp`/`ScalingDown` for `Idle`, unless an operator moved
    /// the engine into a side state meanwhile.
    fn settle(&self) {
        let mut status = self.status.lock().expect("status lock");
        if matches!(*status, ScalingStatus::ScalingUp | ScalingStatus::ScalingDown) {
            *status = ScalingStatus::Idle;
        }
    }

    fn cooldown_remaining(&self, action: ScalingAction, now: u64) -> Option<u64> {
        if !self.config.enforce_cooldown {
            return None;
        }
        let last = self.cooldown.lock().expect("cooldown lock").last(action);
        if last == 0 {
            return None;
        }
        let elapsed = now.saturating_sub(last);
        (elapsed < self.config.scaling_cooldown).then(|| self.config.scaling_cooldown - elapsed)
    }
}
