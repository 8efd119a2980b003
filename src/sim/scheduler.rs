//! Greedy cycle scheduler.
//!
//! Assigns every operation a start cycle, an end cycle and an engine lane
//! such that:
//!
//! - no operation starts before every dependency's end cycle, and
//! - no lane hosts two operations with overlapping `[start, end)` spans.
//!
//! Independent operations overlap across lanes, which is why a kernel's
//! cycle count is not the sum of its operation costs. The policy is greedy
//! simulation, not global optimization: at each clock instant the
//! lowest-indexed operation whose dependencies have completed and whose
//! engine has a free lane is scheduled first; when nothing can start, the
//! clock advances to the next achievable start time. The index tie-break is
//! part of the determinism contract and must not be replaced by another
//! heuristic.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use crate::kernel::Engine;
use crate::machine::MachineSpec;
use crate::sim::deps::DepGraph;
use crate::sim::resources::ResourcePool;
use crate::sim::ConfigError;

/// Scheduled placement of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u64,
    pub end: u64,
    pub engine: Engine,
    pub lane: usize,
}

/// Complete schedule for one kernel.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Span per operation index.
    pub spans: Vec<Span>,
    /// Completion cycle of the whole kernel.
    pub cycles: u64,
}

impl Schedule {
    /// Operation indices in retirement order: by start cycle, then index.
    pub fn retirement_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.spans.len()).collect();
        order.sort_by_key(|&i| (self.spans[i].start, i));
        order
    }
}

/// Schedule a kernel whose per-op engines and durations are precomputed.
///
/// `deps` must already be acyclic (checked by [`crate::sim::deps::build`]).
pub(crate) fn schedule(
    engines: &[Engine],
    durations: &[u64],
    deps: &DepGraph,
    spec: &MachineSpec,
) -> Result<Schedule, ConfigError> {
    let n = engines.len();
    debug_assert_eq!(durations.len(), n);
    debug_assert_eq!(deps.len(), n);

    let mut indegree: Vec<u32> = (0..n).map(|i| deps.preds(i).len() as u32).collect();
    let mut ready_time: Vec<u64> = vec![0; n];
    // Operations whose dependencies are all scheduled, keyed by the cycle
    // they become ready.
    let mut released: BinaryHeap<Reverse<(u64, u32)>> = BinaryHeap::new();
    // Ready operations waiting for a lane, per engine, index-ordered.
    let mut waiting: [BTreeSet<u32>; Engine::COUNT] =
        std::array::from_fn(|_| BTreeSet::new());

    for i in 0..n {
        if indegree[i] == 0 {
            released.push(Reverse((0, i as u32)));
        }
    }

    let mut pool = ResourcePool::new(spec);
    let mut spans: Vec<Span> = vec![
        Span {
            start: 0,
            end: 0,
            engine: Engine::Alu,
            lane: 0,
        };
        n
    ];
    let mut clock: u64 = 0;
    let mut remaining = n;

    while remaining > 0 {
        while let Some(&Reverse((ready, i))) = released.peek() {
            if ready > clock {
                break;
            }
            released.pop();
            waiting[engines[i as usize].index()].insert(i);
        }

        // Lowest-indexed operation whose engine can start it right now.
        let candidate = Engine::all()
            .into_iter()
            .filter(|&e| pool.has_free_lane(e, clock))
            .filter_map(|e| waiting[e.index()].first().copied())
            .min();

        if let Some(i) = candidate {
            let idx = i as usize;
            let engine = engines[idx];
            waiting[engine.index()].remove(&i);
            let duration = durations[idx];
            let (lane, start) = pool
                .acquire(engine, clock, duration)
                .ok_or(ConfigError::NoLanes { engine, index: idx })?;
            let end = start + duration;
            spans[idx] = Span {
                start,
                end,
                engine,
                lane,
            };
            remaining -= 1;
            for &s in deps.succs(idx) {
                let s = s as usize;
                ready_time[s] = ready_time[s].max(end);
                indegree[s] -= 1;
                if indegree[s] == 0 {
                    released.push(Reverse((ready_time[s], s as u32)));
                }
            }
            continue;
        }

        // Nothing can start now: advance to the next achievable start.
        let mut next: Option<u64> = released.peek().map(|&Reverse((ready, _))| ready);
        for e in Engine::all() {
            if let Some(&i) = waiting[e.index()].first() {
                let free = pool.earliest_free(e).ok_or(ConfigError::NoLanes {
                    engine: e,
                    index: i as usize,
                })?;
                next = Some(next.map_or(free, |t| t.min(free)));
            }
        }
        match next {
            Some(t) if t > clock => clock = t,
            // An acyclic graph always releases or frees something; reaching
            // this branch means the scheduler state is inconsistent.
            _ => return Err(ConfigError::Stalled { remaining }),
        }
    }

    let cycles = spans.iter().map(|s| s.end).max().unwrap_or(0);
    log::debug!("scheduled {} ops in {} cycles", n, cycles);
    Ok(Schedule { spans, cycles })
}
