//! Load distributor — maps requests onto the active instance list.
//!
//! Per-instance stats live behind one narrow mutex that is held for the
//! duration of a selection; counters are atomics; the selection history is
//! a `BoundedHistory`. The distributor is `Send + Sync` and meant to be
//! shared through an `Arc`.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tidepool_state::{
    epoch_secs, BoundedHistory, DistributionRecord, InstanceId, LoadBalancingStrategy,
};

use crate::request::LoadRequest;
use crate::strategy::{strategy_for, SelectionState};

/// Distributor tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DistributorConfig {
    /// Selections kept in the distribution history.
    pub history_capacity: usize,
    /// Response-time samples kept per instance.
    pub response_time_window: usize,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            response_time_window: 100,
        }
    }
}

/// Mutable per-instance state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceStats {
    pub active_connections: u64,
    /// Most recent response times in milliseconds, oldest first.
    pub recent_response_times: VecDeque<f64>,
    pub weight: f64,
}

impl Default for InstanceStats {
    fn default() -> Self {
        Self {
            active_connections: 0,
            recent_response_times: VecDeque::new(),
            weight: 1.0,
        }
    }
}

impl InstanceStats {
    /// Mean of the recorded response times, `None` without samples.
    pub fn mean_response_time(&self) -> Option<f64> {
        if self.recent_response_times.is_empty() {
            return None;
        }
        let sum: f64 = self.recent_response_times.iter().sum();
        Some(sum / self.recent_response_times.len() as f64)
    }
}

/// Selects an instance per request and tracks per-instance load.
pub struct LoadDistributor {
    config: DistributorConfig,
    stats: Mutex<HashMap<InstanceId, InstanceStats>>,
    round_robin: AtomicUsize,
    weighted_cursor: AtomicUsize,
    history: BoundedHistory<DistributionRecord>,
}

impl LoadDistributor {
    pub fn new(config: DistributorConfig) -> Self {
        let history = BoundedHistory::new(config.history_capacity);
        Self {
            config,
            stats: Mutex::new(HashMap::new()),
            round_robin: AtomicUsize::new(0),
            weighted_cursor: AtomicUsize::new(0),
            history,
        }
    }

    /// Pick an instance for `request`.
    ///
    /// Returns `None` when `active_instances` is empty; that is an
    /// expected transient state, not an error.
    pub fn select(
        &self,
        strategy: LoadBalancingStrategy,
        request: &LoadRequest,
        active_instances: &[InstanceId],
    ) -> Option<InstanceId> {
        if active_instances.is_empty() {
            debug!(%strategy, "no active instances to distribute to");
            return None;
        }

        let (instance_id, connections) = {
            let mut stats = self.stats.lock().expect("instance stats lock");
            let mut state = SelectionState {
                stats: &mut *stats,
                round_robin: &self.round_robin,
                weighted_cursor: &self.weighted_cursor,
            };
            let idx = strategy_for(strategy).select(&mut state, request, active_instances);
            let instance_id = active_instances[idx.min(active_instances.len() - 1)].clone();
            let connections = stats
                .get(&instance_id)
                .map(|s| s.active_connections)
                .unwrap_or(0);
            (instance_id, connections)
        };

        self.history.push(DistributionRecord {
            timestamp: epoch_secs(),
            instance_id: instance_id.clone(),
            strategy,
            connections_at_selection: connections,
        });

        Some(instance_id)
    }

    /// Record an observed response time (milliseconds) for an instance.
    /// Negative and non-finite samples are dropped.
    pub fn update_instance_metrics(&self, instance_id: &str, response_time_ms: f64) {
        if !response_time_ms.is_finite() || response_time_ms < 0.0 {
            debug!(
                instance = instance_id,
                response_time_ms, "ignoring invalid response time sample"
            );
            return;
        }
        let mut stats = self.stats.lock().expect("instance stats lock");
        let entry = stats.entry(instance_id.to_string()).or_default();
        entry.recent_response_times.push_back(response_time_ms);
        while entry.recent_response_times.len() > self.config.response_time_window.max(1) {
            entry.recent_response_times.pop_front();
        }
    }

    /// Set an instance's weight for weighted round robin. Negative (and
    /// NaN) weights are stored as zero.
    pub fn set_instance_weight(&self, instance_id: &str, weight: f64) {
        let weight = if weight.is_nan() { 0.0 } else { weight.max(0.0) };
        let mut stats = self.stats.lock().expect("instance stats lock");
        stats.entry(instance_id.to_string()).or_default().weight = weight;
        debug!(instance = instance_id, weight, "instance weight updated");
    }

    /// Release one connection claimed by least-connections selection.
    pub fn release_connection(&self, instance_id: &str) {
        let mut stats = self.stats.lock().expect("instance stats lock");
        if let Some(entry) = stats.get_mut(instance_id) {
            entry.active_connections = entry.active_connections.saturating_sub(1);
        }
    }

    /// Drop stats for instances no longer in `active_instances`.
    ///
    /// Returns the number of entries removed.
    pub fn retain_instances(&self, active_instances: &[InstanceId]) -> usize {
        let mut stats = self.stats.lock().expect("instance stats lock");
        let before = stats.len();
        stats.retain(|id, _| active_instances.contains(id));
        let removed = before - stats.len();
        if removed > 0 {
            debug!(removed, remaining = stats.len(), "pruned stats for retired instances");
        }
        removed
    }

    /// Copy of an instance's stats.
    pub fn instance_stats(&self, instance_id: &str) -> Option<InstanceStats> {
        let stats = self.stats.lock().expect("instance stats lock");
        stats.get(instance_id).cloned()
    }

    /// All recorded selections, oldest first.
    pub fn distribution_history(&self) -> Vec<DistributionRecord> {
        self.history.snapshot()
    }

    /// Selection counts per instance over the retained history.
    pub fn distribution_summary(&self) -> BTreeMap<InstanceId, u64> {
        self.history.with(|records| {
            let mut counts = BTreeMap::new();
            for record in records {
                *counts.entry(record.instance_id.clone()).or_insert(0) += 1;
            }
            counts
        })
    }
}

impl Default for LoadDistributor {
    fn default() -> Self {
        Self::new(DistributorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use tidepool_state::UNAVAILABLE_INSTANCE;

    fn pool(n: usize) -> Vec<InstanceId> {
        (0..n).map(|i| format!("instance-{i}")).collect()
    }

    #[test]
    fn empty_pool_is_unavailable() {
        let distributor = LoadDistributor::default();
        for strategy in LoadBalancingStrategy::ALL {
            assert!(distributor.select(strategy, &LoadRequest::new(), &[]).is_none());
        }
        let routed = distributor
            .select(LoadBalancingStrategy::RoundRobin, &LoadRequest::new(), &[])
            .unwrap_or_else(|| UNAVAILABLE_INSTANCE.to_string());
        assert_eq!(routed, "unavailable");
        assert!(distributor.distribution_history().is_empty());
    }

    #[test]
    fn round_robin_is_fair_over_one_cycle() {
        let distributor = LoadDistributor::default();
        let instances = pool(5);

        let picked: HashSet<InstanceId> = (0..5)
            .filter_map(|_| {
                distributor.select(
                    LoadBalancingStrategy::RoundRobin,
                    &LoadRequest::new(),
                    &instances,
                )
            })
            .collect();
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn round_robin_counter_survives_resize() {
        let distributor = LoadDistributor::default();
        let request = LoadRequest::new();

        distributor.select(LoadBalancingStrategy::RoundRobin, &request, &pool(2));
        distributor.select(LoadBalancingStrategy::RoundRobin, &request, &pool(2));
        distributor.select(LoadBalancingStrategy::RoundRobin, &request, &pool(2));
        // Counter is at 3; 3 % 4 = 3.
        let pick = distributor.select(LoadBalancingStrategy::RoundRobin, &request, &pool(4));
        assert_eq!(pick.as_deref(), Some("instance-3"));
    }

    #[test]
    fn least_connections_records_claimed_connection() {
        let distributor = LoadDistributor::default();
        let instances = pool(2);

        let first = distributor
            .select(LoadBalancingStrategy::LeastConnections, &LoadRequest::new(), &instances)
            .unwrap();
        assert_eq!(first, "instance-0");
        let second = distributor
            .select(LoadBalancingStrategy::LeastConnections, &LoadRequest::new(), &instances)
            .unwrap();
        assert_eq!(second, "instance-1");

        let history = distributor.distribution_history();
        assert_eq!(history[0].connections_at_selection, 1);
        assert_eq!(history[0].strategy, LoadBalancingStrategy::LeastConnections);

        distributor.release_connection("instance-0");
        distributor.release_connection("instance-0");
        assert_eq!(
            distributor.instance_stats("instance-0").unwrap().active_connections,
            0
        );
        let third = distributor
            .select(LoadBalancingStrategy::LeastConnections, &LoadRequest::new(), &instances)
            .unwrap();
        assert_eq!(third, "instance-0");
    }

    #[test]
    fn negative_weight_is_clamped() {
        let distributor = LoadDistributor::default();
        distributor.set_instance_weight("instance-0", -4.0);
        assert_eq!(distributor.instance_stats("instance-0").unwrap().weight, 0.0);

        distributor.set_instance_weight("instance-0", f64::NAN);
        assert_eq!(distributor.instance_stats("instance-0").unwrap().weight, 0.0);

        distributor.set_instance_weight("instance-0", 2.5);
        assert_eq!(distributor.instance_stats("instance-0").unwrap().weight, 2.5);
    }

    #[test]
    fn response_time_window_is_bounded() {
        let distributor = LoadDistributor::new(DistributorConfig {
            history_capacity: 10,
            response_time_window: 3,
        });
        for ms in [10.0, 20.0, 30.0, 40.0, 50.0] {
            distributor.update_instance_metrics("instance-0", ms);
        }
        let stats = distributor.instance_stats("instance-0").unwrap();
        assert_eq!(stats.recent_response_times, VecDeque::from([30.0, 40.0, 50.0]));
        assert_eq!(stats.mean_response_time(), Some(40.0));
    }

    #[test]
    fn least_response_time_uses_recorded_samples() {
        let distributor = LoadDistributor::default();
        let instances = pool(3);
        distributor.update_instance_metrics("instance-0", 250.0);
        distributor.update_instance_metrics("instance-1", 35.0);
        distributor.update_instance_metrics("instance-2", 90.0);

        let pick = distributor
            .select(LoadBalancingStrategy::LeastResponseTime, &LoadRequest::new(), &instances)
            .unwrap();
        assert_eq!(pick, "instance-1");
    }

    #[test]
    fn invalid_response_times_are_ignored() {
        let distributor = LoadDistributor::default();
        let instances = pool(3);
        distributor.update_instance_metrics("instance-0", f64::NAN);
        distributor.update_instance_metrics("instance-0", f64::INFINITY);
        distributor.update_instance_metrics("instance-0", -5.0);
        distributor.update_instance_metrics("instance-1", 10.0);
        distributor.update_instance_metrics("instance-2", 20.0);

        assert!(distributor.instance_stats("instance-0").is_none());
        let pick = distributor
            .select(LoadBalancingStrategy::LeastResponseTime, &LoadRequest::new(), &instances)
            .unwrap();
        assert_eq!(pick, "instance-1");
    }

    #[test]
    fn retired_instances_are_pruned() {
        let distributor = LoadDistributor::default();
        for id in pool(4) {
            distributor.update_instance_metrics(&id, 50.0);
        }
        distributor.set_instance_weight("instance-1", 3.0);

        assert_eq!(distributor.retain_instances(&pool(2)), 2);
        assert!(distributor.instance_stats("instance-2").is_none());
        assert!(distributor.instance_stats("instance-3").is_none());
        assert_eq!(distributor.instance_stats("instance-1").unwrap().weight, 3.0);
        assert_eq!(distributor.retain_instances(&pool(2)), 0);
    }

    #[test]
    fn history_is_capped_and_summarized() {
        let distributor = LoadDistributor::new(DistributorConfig {
            history_capacity: 4,
            response_time_window: 100,
        });
        let instances = pool(2);
        for _ in 0..10 {
            distributor.select(LoadBalancingStrategy::RoundRobin, &LoadRequest::new(), &instances);
        }
        assert_eq!(distributor.distribution_history().len(), 4);

        let summary = distributor.distribution_summary();
        assert_eq!(summary.get("instance-0"), Some(&2));
        assert_eq!(summary.get("instance-1"), Some(&2));
    }

    #[test]
    fn concurrent_least_connections_balances_claims() {
        let distributor = Arc::new(LoadDistributor::default());
        let instances = Arc::new(pool(4));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let distributor = Arc::clone(&distributor);
                let instances = Arc::clone(&instances);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        distributor.select(
                            LoadBalancingStrategy::LeastConnections,
                            &LoadRequest::new(),
                            &instances,
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // 800 claims spread evenly because argmin and increment are atomic.
        for id in instances.iter() {
            assert_eq!(distributor.instance_stats(id).unwrap().active_connections, 200);
        }
    }
}
