//! Kernel construction.
//!
//! [`KernelBuilder`] manages scratch allocation by name, interns scratch
//! constants so each distinct value is loaded once, and collects operations
//! and explicit ordering edges into an immutable [`Kernel`].

use std::collections::HashMap;

use thiserror::Error;

use crate::kernel::{Kernel, Op, Region};
use crate::machine::MachineSpec;

/// Kernel construction failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Scratch space exhausted.
    #[error("scratch exhausted: need {needed} more words, capacity {capacity}")]
    ScratchExhausted { needed: usize, capacity: usize },

    /// A scratch name was allocated twice.
    #[error("duplicate scratch allocation: {0}")]
    DuplicateName(String),
}

/// Builder for [`Kernel`].
pub struct KernelBuilder {
    name: String,
    scratch_capacity: usize,
    next_scratch: u32,
    named: HashMap<String, u32>,
    consts: HashMap<u32, u32>,
    ops: Vec<Op>,
    after: Vec<(usize, usize)>,
    inputs: Vec<Region>,
    outputs: Vec<Region>,
}

impl KernelBuilder {
    /// Start a kernel for the given machine.
    pub fn new(spec: &MachineSpec, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scratch_capacity: spec.scratch_words,
            next_scratch: 0,
            named: HashMap::new(),
            consts: HashMap::new(),
            ops: Vec::new(),
            after: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Allocate one named scratch word.
    pub fn alloc_scratch(&mut self, name: &str) -> Result<u32, BuildError> {
        self.alloc_scratch_n(name, 1)
    }

    /// Allocate `n` contiguous scratch words under one name.
    pub fn alloc_scratch_n(&mut self, name: &str, n: usize) -> Result<u32, BuildError> {
        if self.named.contains_key(name) {
            return Err(BuildError::DuplicateName(name.to_string()));
        }
        let base = self.reserve(n)?;
        self.named.insert(name.to_string(), base);
        Ok(base)
    }

    /// Look up a previously allocated scratch name.
    pub fn scratch(&self, name: &str) -> Option<u32> {
        self.named.get(name).copied()
    }

    /// Scratch cell holding `value`, loading it on first use.
    ///
    /// Constants are interned: repeated requests for the same value return
    /// the same cell without emitting another load.
    pub fn scratch_const(&mut self, value: u32) -> Result<u32, BuildError> {
        if let Some(&cell) = self.consts.get(&value) {
            return Ok(cell);
        }
        let cell = self.reserve(1)?;
        self.consts.insert(value, cell);
        self.ops.push(Op::Const { dst: cell, value });
        Ok(cell)
    }

    /// Append an operation, returning its index.
    pub fn push(&mut self, op: Op) -> usize {
        let index = self.ops.len();
        self.ops.push(op);
        index
    }

    /// Append a pause, a full scheduling barrier.
    pub fn pause(&mut self) -> usize {
        self.push(Op::Pause)
    }

    /// Declare that `later` must not start before `earlier` completes.
    ///
    /// Indices are validated during simulation, so edges may reference
    /// operations not yet pushed.
    pub fn after(&mut self, earlier: usize, later: usize) {
        self.after.push((earlier, later));
    }

    /// Declare an input region.
    pub fn bind_input(&mut self, region: Region) {
        self.inputs.push(region);
    }

    /// Declare an output region, in checking order.
    pub fn bind_output(&mut self, region: Region) {
        self.outputs.push(region);
    }

    /// Words of scratch allocated so far.
    pub fn scratch_used(&self) -> usize {
        self.next_scratch as usize
    }

    /// Finish construction.
    pub fn build(self) -> Kernel {
        log::debug!(
            "kernel {}: {} ops, {} scratch words, {} explicit deps",
            self.name,
            self.ops.len(),
            self.next_scratch,
            self.after.len()
        );
        Kernel::from_parts(self.name, self.ops, self.after, self.inputs, self.outputs)
    }

    fn reserve(&mut self, n: usize) -> Result<u32, BuildError> {
        let base = self.next_scratch as usize;
        if base + n > self.scratch_capacity {
            return Err(BuildError::ScratchExhausted {
                needed: base + n - self.scratch_capacity,
                capacity: self.scratch_capacity,
            });
        }
        self.next_scratch += n as u32;
        Ok(base as u32)
    }
}
