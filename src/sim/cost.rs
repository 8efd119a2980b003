//! Cycle cost model.
//!
//! Maps each operation class to a cycle duration and the engine that hosts
//! it. Costs are a pure function of the operation; nothing here reads the
//! clock or any other ambient state, which is what makes cycle counts
//! reproducible across runs.
//!
//! # Standard costs
//!
//! | Class | Cycles |
//! |-------|--------|
//! | alu          | 1 |
//! | valu         | 1 |
//! | const load   | 1 |
//! | memory load  | 3 |
//! | memory store | 2 |
//! | flow         | 1 |

use crate::kernel::{Engine, Op, OpClass};
use crate::sim::ConfigError;

/// Duration and placement of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cost {
    /// Cycles from issue to completion. Always at least one.
    pub duration: u64,
    /// Engine whose lane the operation occupies for the full duration.
    pub engine: Engine,
}

/// Table of per-class cycle durations.
///
/// [`CostModel::vliw8`] covers the whole closed class set. Tables built by
/// hand may leave classes undefined; a kernel using such a class fails with
/// a configuration error before scheduling begins, never at mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostModel {
    durations: [Option<u64>; OpClass::COUNT],
}

impl CostModel {
    /// The standard machine's cost table.
    pub fn vliw8() -> Self {
        Self::empty()
            .with_duration(OpClass::Alu, 1)
            .with_duration(OpClass::Valu, 1)
            .with_duration(OpClass::Const, 1)
            .with_duration(OpClass::Load, 3)
            .with_duration(OpClass::Store, 2)
            .with_duration(OpClass::Flow, 1)
    }

    /// A table with no classes defined.
    pub fn empty() -> Self {
        Self {
            durations: [None; OpClass::COUNT],
        }
    }

    /// Set the duration for one class.
    pub fn with_duration(mut self, class: OpClass, cycles: u64) -> Self {
        self.durations[class.index()] = Some(cycles);
        self
    }

    /// Duration for a class, if defined.
    pub fn duration(&self, class: OpClass) -> Option<u64> {
        self.durations[class.index()]
    }

    /// Cost of one operation.
    ///
    /// An undefined class and a zero duration are both configuration errors:
    /// the former means the table does not cover the kernel's operation set,
    /// the latter would let an operation retire in the cycle it issued.
    pub fn cost(&self, index: usize, op: &Op) -> Result<Cost, ConfigError> {
        let class = op.class();
        let duration = self
            .duration(class)
            .ok_or(ConfigError::MissingCost { class, index })?;
        if duration == 0 {
            return Err(ConfigError::ZeroDuration { class, index });
        }
        Ok(Cost {
            duration,
            engine: op.engine(),
        })
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::vliw8()
    }
}
