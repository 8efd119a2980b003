//! Operation value semantics.
//!
//! Applies operation effects to scratch and memory. Effects are applied in
//! retirement order, which is a linear extension of the dependency graph,
//! so the final state matches sequential in-order execution of the same
//! kernel.

use crate::kernel::Op;
use crate::machine::{MemoryImage, VLEN};
use crate::sim::ConfigError;

/// Mutable machine state for one run.
pub(crate) struct ExecState<'a> {
    pub scratch: Vec<u32>,
    pub mem: &'a mut MemoryImage,
}

impl<'a> ExecState<'a> {
    pub fn new(scratch_words: usize, mem: &'a mut MemoryImage) -> Self {
        Self {
            scratch: vec![0; scratch_words],
            mem,
        }
    }
}

/// Apply the effects of `ops` in the given order.
///
/// Scratch indices were bounds-checked statically by the simulator; memory
/// addresses are runtime values and fault here.
pub(crate) fn execute(
    ops: &[Op],
    order: &[usize],
    state: &mut ExecState<'_>,
) -> Result<(), ConfigError> {
    for &index in order {
        apply(index, &ops[index], state)?;
    }
    Ok(())
}

fn apply(index: usize, op: &Op, state: &mut ExecState<'_>) -> Result<(), ConfigError> {
    let scratch = &mut state.scratch;
    match *op {
        Op::Alu { op, dst, a, b } => {
            let result = op
                .apply(scratch[a as usize], scratch[b as usize])
                .ok_or(ConfigError::DivisionByZero { index })?;
            scratch[dst as usize] = result;
        }
        Op::Valu { op, dst, a, b } => {
            for k in 0..VLEN {
                let result = op
                    .apply(scratch[a as usize + k], scratch[b as usize + k])
                    .ok_or(ConfigError::DivisionByZero { index })?;
                scratch[dst as usize + k] = result;
            }
        }
        Op::Const { dst, value } => scratch[dst as usize] = value,
        Op::Load { dst, addr } => {
            let address = scratch[addr as usize] as usize;
            scratch[dst as usize] = state
                .mem
                .get(address)
                .map_err(|source| ConfigError::Memory { index, source })?;
        }
        Op::Store { addr, src } => {
            let address = scratch[addr as usize] as usize;
            let value = scratch[src as usize];
            state
                .mem
                .set(address, value)
                .map_err(|source| ConfigError::Memory { index, source })?;
        }
        Op::Select {
            dst,
            cond,
            if_true,
            if_false,
        } => {
            scratch[dst as usize] = if scratch[cond as usize] != 0 {
                scratch[if_true as usize]
            } else {
                scratch[if_false as usize]
            };
        }
        Op::Pause => {}
    }
    Ok(())
}
