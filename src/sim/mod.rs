//! Kernel simulator.
//!
//! Executes a kernel's operation sequence against a [`CostModel`] over a
//! [`MachineSpec`], producing a deterministic cycle count, the final memory
//! image and one timed [`Event`] per operation. The simulation advances a
//! logical clock only; wall-clock time never enters the model, so identical
//! kernels always produce identical results.
//!
//! A run proceeds in phases:
//!
//! 1. **Validate** — scratch bounds, engine lanes, cost table coverage.
//!    Every malformed-kernel condition is caught here or in dependency
//!    analysis, before the clock starts; a run never hangs mid-simulation.
//! 2. **Derive dependencies** — RAW/WAW/WAR plus explicit edges, with cycle
//!    detection ([`deps`]).
//! 3. **Schedule** — greedy earliest-start, lowest-index placement onto
//!    engine lanes ([`scheduler`]).
//! 4. **Retire** — apply value semantics in retirement order and emit
//!    events ([`exec`]).

pub mod cost;
pub mod deps;
mod exec;
pub mod resources;
pub mod scheduler;

use thiserror::Error;

use crate::kernel::{Engine, Kernel, OpClass};
use crate::machine::{MachineSpec, MemError, MemoryImage};

pub use cost::{Cost, CostModel};
pub use scheduler::{Schedule, Span};

/// Malformed-kernel and malformed-configuration failures.
///
/// These are fatal to the single run that raised them and are surfaced
/// distinctly from correctness failures, so a suite can tell crashes from
/// wrong answers. None of them is retried: the simulation is deterministic,
/// so an identical rerun would fail identically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The dependency graph has a cycle.
    #[error("dependency cycle involving operation {index}")]
    CyclicDependency { index: usize },

    /// An explicit dependency edge names a nonexistent operation.
    #[error("dependency edge targets operation {target} but kernel has {len} operations")]
    DependencyOutOfRange { target: usize, len: usize },

    /// The cost table does not cover an operation class the kernel uses.
    #[error("no cycle cost defined for {class:?} (operation {index})")]
    MissingCost { class: OpClass, index: usize },

    /// The cost table assigns a zero duration.
    #[error("zero cycle cost for {class:?} (operation {index})")]
    ZeroDuration { class: OpClass, index: usize },

    /// An operation requires an engine the machine has no lanes for.
    #[error("engine {engine:?} has no lanes but operation {index} requires it")]
    NoLanes { engine: Engine, index: usize },

    /// An operation names a scratch cell past the machine's capacity.
    #[error("operation {index} touches scratch cell {cell}, capacity {capacity}")]
    ScratchOutOfBounds {
        index: usize,
        cell: usize,
        capacity: usize,
    },

    /// A memory access faulted during retirement.
    #[error("operation {index}: {source}")]
    Memory { index: usize, source: MemError },

    /// Division or modulo by zero during retirement.
    #[error("operation {index} divides by zero")]
    DivisionByZero { index: usize },

    /// Internal scheduler inconsistency; never expected on an acyclic graph.
    #[error("scheduler stalled with {remaining} operations unscheduled")]
    Stalled { remaining: usize },
}

/// A recorded, timed execution of one operation on one lane.
///
/// Produced exactly once per executed operation; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Operation index in the kernel sequence.
    pub index: usize,
    /// Engine that hosted the operation. Doubles as the trace category.
    pub engine: Engine,
    /// Lane within the engine.
    pub lane: usize,
    /// Start cycle.
    pub start: u64,
    /// End cycle (exclusive).
    pub end: u64,
    /// Human-readable label.
    pub label: String,
}

/// Everything one simulated run produces.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Completion cycle of the kernel.
    pub cycles: u64,
    /// Final memory image.
    pub output: MemoryImage,
    /// Events in retirement order: by start cycle, ties by operation index.
    pub events: Vec<Event>,
}

/// Simulator for one machine and cost model.
///
/// The simulator holds no per-run state; every [`Simulator::run`] owns its
/// resources, so independent runs may execute on parallel threads.
#[derive(Debug, Clone)]
pub struct Simulator {
    spec: MachineSpec,
    cost: CostModel,
}

impl Simulator {
    /// Simulator with an explicit machine and cost table.
    pub fn new(spec: MachineSpec, cost: CostModel) -> Self {
        Self { spec, cost }
    }

    /// The standard machine with its standard cost table.
    pub fn vliw8() -> Self {
        Self::new(MachineSpec::vliw8(), CostModel::vliw8())
    }

    /// Machine description in use.
    pub fn spec(&self) -> &MachineSpec {
        &self.spec
    }

    /// Execute `kernel` against `image`.
    pub fn run(&self, kernel: &Kernel, mut image: MemoryImage) -> Result<RunResult, ConfigError> {
        let ops = kernel.ops();
        log::debug!("run {}: {} ops", kernel.name(), ops.len());

        // Phase 1: static validation.
        let mut engines = Vec::with_capacity(ops.len());
        let mut durations = Vec::with_capacity(ops.len());
        for (index, op) in ops.iter().enumerate() {
            self.check_scratch_bounds(index, op)?;
            let cost = self.cost.cost(index, op)?;
            if self.spec.lanes(cost.engine) == 0 {
                return Err(ConfigError::NoLanes {
                    engine: cost.engine,
                    index,
                });
            }
            engines.push(cost.engine);
            durations.push(cost.duration);
        }

        // Phase 2: dependencies, with cycle detection.
        let graph = deps::build(kernel)?;

        // Phase 3: placement.
        let schedule = scheduler::schedule(&engines, &durations, &graph, &self.spec)?;

        // Phase 4: retirement.
        let order = schedule.retirement_order();
        let mut state = exec::ExecState::new(self.spec.scratch_words, &mut image);
        exec::execute(ops, &order, &mut state)?;

        let events = order
            .iter()
            .map(|&index| {
                let span = schedule.spans[index];
                Event {
                    index,
                    engine: span.engine,
                    lane: span.lane,
                    start: span.start,
                    end: span.end,
                    label: ops[index].label(),
                }
            })
            .collect();

        Ok(RunResult {
            cycles: schedule.cycles,
            output: image,
            events,
        })
    }

    fn check_scratch_bounds(&self, index: usize, op: &crate::kernel::Op) -> Result<(), ConfigError> {
        let capacity = self.spec.scratch_words;
        for &cell in op.reads().iter().chain(op.writes().iter()) {
            if cell as usize >= capacity {
                return Err(ConfigError::ScratchOutOfBounds {
                    index,
                    cell: cell as usize,
                    capacity,
                });
            }
        }
        Ok(())
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::vliw8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{AluOp, KernelBuilder, Op};
    use crate::machine::VLEN;

    #[test]
    fn test_run_produces_one_event_per_op() {
        let sim = Simulator::vliw8();
        let mut kb = KernelBuilder::new(sim.spec(), "t");
        let a = kb.alloc_scratch("a").unwrap();
        let one = kb.scratch_const(1).unwrap();
        kb.push(Op::Alu {
            op: AluOp::Add,
            dst: a,
            a: one,
            b: one,
        });
        let kernel = kb.build();
        let result = sim.run(&kernel, MemoryImage::zeroed(4)).unwrap();
        assert_eq!(result.events.len(), kernel.len());
        // const at 0..1, alu at 1..2
        assert_eq!(result.cycles, 2);
    }

    #[test]
    fn test_scratch_bounds_checked_statically() {
        let sim = Simulator::new(
            MachineSpec::vliw8().with_scratch_words(4),
            CostModel::vliw8(),
        );
        let mut kb = KernelBuilder::new(&MachineSpec::vliw8(), "t");
        kb.push(Op::Const { dst: 9, value: 0 });
        let kernel = kb.build();
        assert!(matches!(
            sim.run(&kernel, MemoryImage::zeroed(1)),
            Err(ConfigError::ScratchOutOfBounds {
                index: 0,
                cell: 9,
                capacity: 4
            })
        ));
    }

    #[test]
    fn test_valu_range_end_checked() {
        let sim = Simulator::new(
            MachineSpec::vliw8().with_scratch_words(VLEN + 4),
            CostModel::vliw8(),
        );
        let mut kb = KernelBuilder::new(&MachineSpec::vliw8(), "t");
        kb.push(Op::Valu {
            op: AluOp::Add,
            dst: 8, // writes 8..16, capacity 12
            a: 0,
            b: 0,
        });
        let kernel = kb.build();
        assert!(matches!(
            sim.run(&kernel, MemoryImage::zeroed(1)),
            Err(ConfigError::ScratchOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_missing_cost_detected_before_scheduling() {
        let cost = CostModel::empty().with_duration(OpClass::Const, 1);
        let sim = Simulator::new(MachineSpec::vliw8(), cost);
        let mut kb = KernelBuilder::new(sim.spec(), "t");
        kb.push(Op::Const { dst: 0, value: 1 });
        kb.push(Op::Pause);
        let kernel = kb.build();
        assert!(matches!(
            sim.run(&kernel, MemoryImage::zeroed(1)),
            Err(ConfigError::MissingCost {
                class: OpClass::Flow,
                index: 1
            })
        ));
    }
}
