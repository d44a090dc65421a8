//! Selection strategies.
//!
//! Every strategy implements [`Balance`]; [`strategy_for`] maps the
//! configured `LoadBalancingStrategy` tag to its implementation. Adding a
//! strategy means adding a tag and an impl, nothing else.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use sha2::{Digest, Sha256};

use tidepool_state::{InstanceId, LoadBalancingStrategy};

use crate::distributor::InstanceStats;
use crate::request::LoadRequest;

/// Distributor-local state a strategy may read or update.
///
/// The distributor holds its stats lock for the whole selection, so a
/// strategy's read-then-update is atomic with respect to other callers.
pub struct SelectionState<'a> {
    pub stats: &'a mut HashMap<InstanceId, InstanceStats>,
    pub round_robin: &'a AtomicUsize,
    pub weighted_cursor: &'a AtomicUsize,
}

impl SelectionState<'_> {
    fn weight(&self, id: &str) -> f64 {
        self.stats.get(id).map(|s| s.weight).unwrap_or(1.0)
    }

    fn connections(&self, id: &str) -> u64 {
        self.stats.get(id).map(|s| s.active_connections).unwrap_or(0)
    }

    fn mean_response_time(&self, id: &str) -> Option<f64> {
        self.stats.get(id).and_then(|s| s.mean_response_time())
    }
}

/// A load-balancing algorithm.
pub trait Balance: Send + Sync {
    /// Pick an index into `instances`. Callers guarantee `instances` is
    /// non-empty.
    fn select(
        &self,
        state: &mut SelectionState<'_>,
        request: &LoadRequest,
        instances: &[InstanceId],
    ) -> usize;
}

pub struct RoundRobin;
pub struct LeastConnections;
pub struct WeightedRoundRobin;
pub struct IpHash;
pub struct LeastResponseTime;
pub struct ConsistentHash;

static ROUND_ROBIN: RoundRobin = RoundRobin;
static LEAST_CONNECTIONS: LeastConnections = LeastConnections;
static WEIGHTED_ROUND_ROBIN: WeightedRoundRobin = WeightedRoundRobin;
static IP_HASH: IpHash = IpHash;
static LEAST_RESPONSE_TIME: LeastResponseTime = LeastResponseTime;
static CONSISTENT_HASH: ConsistentHash = ConsistentHash;

/// Implementation for a strategy tag.
pub fn strategy_for(strategy: LoadBalancingStrategy) -> &'static dyn Balance {
    match strategy {
        LoadBalancingStrategy::RoundRobin => &ROUND_ROBIN,
        LoadBalancingStrategy::LeastConnections => &LEAST_CONNECTIONS,
        LoadBalancingStrategy::WeightedRoundRobin => &WEIGHTED_ROUND_ROBIN,
        LoadBalancingStrategy::IpHash => &IP_HASH,
        LoadBalancingStrategy::LeastResponseTime => &LEAST_RESPONSE_TIME,
        LoadBalancingStrategy::ConsistentHash => &CONSISTENT_HASH,
    }
}

impl Balance for RoundRobin {
    fn select(
        &self,
        state: &mut SelectionState<'_>,
        _request: &LoadRequest,
        instances: &[InstanceId],
    ) -> usize {
        // Never reset on resize; the modulo absorbs pool changes.
        state.round_robin.fetch_add(1, Ordering::Relaxed) % instances.len()
    }
}

impl Balance for LeastConnections {
    fn select(
        &self,
        state: &mut SelectionState<'_>,
        _request: &LoadRequest,
        instances: &[InstanceId],
    ) -> usize {
        let idx = instances
            .iter()
            .enumerate()
            .min_by_key(|(_, id)| state.connections(id))
            .map(|(i, _)| i)
            .unwrap_or(0);

        state
            .stats
            .entry(instances[idx].clone())
            .or_default()
            .active_connections += 1;
        idx
    }
}

impl Balance for WeightedRoundRobin {
    fn select(
        &self,
        state: &mut SelectionState<'_>,
        _request: &LoadRequest,
        instances: &[InstanceId],
    ) -> usize {
        let tick = state.weighted_cursor.fetch_add(1, Ordering::Relaxed);
        let weights: Vec<f64> = instances.iter().map(|id| state.weight(id)).collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return 0;
        }

        let cursor = (tick % 100) as f64 / 100.0 * total;
        let mut cumulative = 0.0;
        for (i, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if cumulative > cursor {
                return i;
            }
        }
        // Float rounding at the top of the range.
        weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
    }
}

impl Balance for IpHash {
    fn select(
        &self,
        _state: &mut SelectionState<'_>,
        request: &LoadRequest,
        instances: &[InstanceId],
    ) -> usize {
        (stable_hash(request.client_ip_or_unknown()) % instances.len() as u64) as usize
    }
}

impl Balance for LeastResponseTime {
    fn select(
        &self,
        state: &mut SelectionState<'_>,
        _request: &LoadRequest,
        instances: &[InstanceId],
    ) -> usize {
        let mut best: Option<(usize, f64)> = None;
        for (i, id) in instances.iter().enumerate() {
            // Instances without samples never beat one with data.
            let Some(mean) = state.mean_response_time(id).filter(|m| m.is_finite()) else {
                continue;
            };
            if best.is_none_or(|(_, b)| mean < b) {
                best = Some((i, mean));
            }
        }
        best.map(|(i, _)| i).unwrap_or(0)
    }
}

impl Balance for ConsistentHash {
    fn select(
        &self,
        _state: &mut SelectionState<'_>,
        request: &LoadRequest,
        instances: &[InstanceId],
    ) -> usize {
        (stable_hash(&request.canonical_key()) % instances.len() as u64) as usize
    }
}

/// Process-independent 64-bit hash: the first eight bytes of SHA-256.
pub fn stable_hash(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
