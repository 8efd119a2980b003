//! Engine lane occupancy.
//!
//! Each engine owns a fixed set of lanes; a lane hosts one operation at a
//! time and carries a "next free" cycle marker. Lanes are owned and mutated
//! only by the run that created them, never shared across runs.

use crate::kernel::Engine;
use crate::machine::MachineSpec;

/// Per-lane next-free markers for every engine.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    next_free: [Vec<u64>; Engine::COUNT],
}

impl ResourcePool {
    /// Fresh pool with all lanes free at cycle zero.
    pub fn new(spec: &MachineSpec) -> Self {
        let next_free = std::array::from_fn(|i| {
            let engine = Engine::all()[i];
            vec![0u64; spec.lanes(engine)]
        });
        Self { next_free }
    }

    /// Earliest cycle at which any lane of `engine` is free.
    ///
    /// Returns `None` for an engine with no lanes.
    pub fn earliest_free(&self, engine: Engine) -> Option<u64> {
        self.next_free[engine.index()].iter().copied().min()
    }

    /// Pick the lane for an operation that becomes ready at `ready`.
    ///
    /// The lane freeing earliest wins; among equally free lanes the lowest
    /// lane id wins, keeping lane assignment deterministic. Returns the lane
    /// id and the operation's start cycle.
    pub fn acquire(&mut self, engine: Engine, ready: u64, duration: u64) -> Option<(usize, u64)> {
        let lanes = &mut self.next_free[engine.index()];
        let (lane, free_at) = lanes
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|&(lane, free_at)| (free_at, lane))?;
        let start = ready.max(free_at);
        lanes[lane] = start + duration;
        Some((lane, start))
    }

    /// True when some lane of `engine` is free at `cycle`.
    pub fn has_free_lane(&self, engine: Engine, cycle: u64) -> bool {
        self.next_free[engine.index()]
            .iter()
            .any(|&free_at| free_at <= cycle)
    }
}
