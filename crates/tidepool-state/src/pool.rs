//! Instance pool — the pool size owned by the decision engine.
//!
//! `InstancePool` is the single writer; it hands out `PoolView`s to the
//! sampler and the load distributor. Writes use `Release` and reads use
//! `Acquire`, so a completed step is visible to every read that starts
//! after it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::types::{InstanceId, ScalingAction};

/// The mutable pool size. Always within `[min, max]`.
#[derive(Debug)]
pub struct InstancePool {
    current: Arc<AtomicU32>,
    min: u32,
    max: u32,
}

impl InstancePool {
    /// Create a pool starting at `min`. Callers validate `min <= max`.
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            current: Arc::new(AtomicU32::new(min)),
            min,
            max,
        }
    }

    pub fn current(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Move the pool one step in the given direction.
    ///
    /// Returns `(from, to)` on success, or `Err(current)` when the step
    /// would leave `[min, max]`; the pool is untouched in that case.
    pub fn step(&self, action: ScalingAction) -> Result<(u32, u32), u32> {
        let (min, max) = (self.min, self.max);
        self.current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match action {
                ScalingAction::ScaleUp if n < max => Some(n + 1),
                ScalingAction::ScaleDown if n > min => Some(n - 1),
                _ => None,
            })
            .map(|from| {
                let to = match action {
                    ScalingAction::ScaleUp => from + 1,
                    ScalingAction::ScaleDown => from - 1,
                };
                (from, to)
            })
    }

    /// A read-only handle sharing this pool's size.
    pub fn view(&self) -> PoolView {
        PoolView {
            current: Arc::clone(&self.current),
        }
    }
}

/// Read-only, cheaply clonable view of the pool size.
#[derive(Debug, Clone)]
pub struct PoolView {
    current: Arc<AtomicU32>,
}

impl PoolView {
    pub fn current(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    /// Identifiers of the currently active instances, `instance-0..N`.
    pub fn active_instances(&self) -> Vec<InstanceId> {
        (0..self.current()).map(instance_id).collect()
    }
}

/// Identifier of the instance at `index` in the pool.
pub fn instance_id(index: u32) -> InstanceId {
    format!("instance-{index}")
}
