//! Prebuilt traversal kernels.
//!
//! Two renditions of the hash-based tree traversal, sharing a scratch
//! layout, a prologue that caches the batch state in scratch, and an
//! epilogue that writes it back:
//!
//! - [`scalar`] checks for falling off the tree at runtime with a flow
//!   select, one per element per round.
//! - [`unrolled`] tracks the traversal depth at build time instead. All
//!   batch elements start at the root, so the depth is uniform across the
//!   batch and the wrap is only needed on rounds that step off a leaf; the
//!   main loop carries no flow operations at all.
//!
//! Both produce the exact output of [`crate::reference::reference_traversal`]
//! on the image built by their [`Problem`].

mod common;
mod scalar;
mod unrolled;

use crate::kernel::{AluOp, BuildError, Kernel, KernelBuilder, Op, Region};
use crate::machine::{MachineSpec, HDR_WORDS};
use crate::reference::Problem;

pub(crate) use common::{push_hash, push_parity_index};

/// Scratch cells shared by the kernel builders.
///
/// Temporaries are deliberately few and reused across the whole unrolled
/// stream; the dependency chains they create are what the scheduler has to
/// work around.
pub(crate) struct ScratchLayout {
    pub tmp1: u32,
    pub tmp2: u32,
    pub tmp3: u32,
    pub tmp_addr: u32,
    pub tmp_node_val: u32,
    /// Header values cached in scratch.
    pub n_nodes: u32,
    pub forest_values_p: u32,
    pub inp_indices_p: u32,
    pub inp_values_p: u32,
    /// `batch_size` cells holding each element's current tree index.
    pub instance_pointers: u32,
    /// `batch_size` cells holding each element's accumulator value.
    pub instance_accumulators: u32,
    pub zero: u32,
    pub one: u32,
    pub two: u32,
}

/// Names of the header words, in address order.
const HEADER_VARS: [&str; HDR_WORDS] = [
    "rounds",
    "n_nodes",
    "batch_size",
    "forest_height",
    "forest_values_p",
    "inp_indices_p",
    "inp_values_p",
];

impl ScratchLayout {
    /// Allocate the layout and emit the prologue: load the header, then
    /// cache every element's index and accumulator in scratch.
    fn build(kb: &mut KernelBuilder, batch_size: u32) -> Result<Self, BuildError> {
        let tmp1 = kb.alloc_scratch("tmp1")?;
        let tmp2 = kb.alloc_scratch("tmp2")?;
        let tmp3 = kb.alloc_scratch("tmp3")?;
        let tmp_addr = kb.alloc_scratch("tmp_addr")?;
        let tmp_node_val = kb.alloc_scratch("tmp_node_val")?;

        let mut header = [0u32; HDR_WORDS];
        for (i, name) in HEADER_VARS.iter().enumerate() {
            header[i] = kb.alloc_scratch(name)?;
        }
        for (i, &cell) in header.iter().enumerate() {
            let addr = kb.scratch_const(i as u32)?;
            kb.push(Op::Load { dst: cell, addr });
        }

        let zero = kb.scratch_const(0)?;
        let one = kb.scratch_const(1)?;
        let two = kb.scratch_const(2)?;

        let instance_pointers = kb.alloc_scratch_n("instance_pointers", batch_size as usize)?;
        let instance_accumulators =
            kb.alloc_scratch_n("instance_accumulators", batch_size as usize)?;

        let layout = Self {
            tmp1,
            tmp2,
            tmp3,
            tmp_addr,
            tmp_node_val,
            n_nodes: header[1],
            forest_values_p: header[4],
            inp_indices_p: header[5],
            inp_values_p: header[6],
            instance_pointers,
            instance_accumulators,
            zero,
            one,
            two,
        };

        for i in 0..batch_size {
            let i_const = kb.scratch_const(i)?;
            kb.push(Op::Alu {
                op: AluOp::Add,
                dst: layout.tmp_addr,
                a: layout.inp_indices_p,
                b: i_const,
            });
            kb.push(Op::Load {
                dst: layout.instance_pointers + i,
                addr: layout.tmp_addr,
            });
            kb.push(Op::Alu {
                op: AluOp::Add,
                dst: layout.tmp_addr,
                a: layout.inp_values_p,
                b: i_const,
            });
            kb.push(Op::Load {
                dst: layout.instance_accumulators + i,
                addr: layout.tmp_addr,
            });
        }

        Ok(layout)
    }

    /// Emit the epilogue: store every element's index and accumulator back
    /// to the image.
    fn write_back(&self, kb: &mut KernelBuilder, batch_size: u32) -> Result<(), BuildError> {
        for i in 0..batch_size {
            let i_const = kb.scratch_const(i)?;
            kb.push(Op::Alu {
                op: AluOp::Add,
                dst: self.tmp_addr,
                a: self.inp_indices_p,
                b: i_const,
            });
            kb.push(Op::Store {
                addr: self.tmp_addr,
                src: self.instance_pointers + i,
            });
            kb.push(Op::Alu {
                op: AluOp::Add,
                dst: self.tmp_addr,
                a: self.inp_values_p,
                b: i_const,
            });
            kb.push(Op::Store {
                addr: self.tmp_addr,
                src: self.instance_accumulators + i,
            });
        }
        Ok(())
    }
}

/// Bindings shared by both kernel variants.
fn bind_regions(kb: &mut KernelBuilder, problem: &Problem) {
    let n_nodes = problem.n_nodes() as usize;
    let batch = problem.batch_size as usize;
    let forest_p = HDR_WORDS;
    let indices_p = forest_p + n_nodes;
    let values_p = indices_p + batch;

    kb.bind_input(Region::new("header", 0, HDR_WORDS));
    kb.bind_input(Region::new("forest_values", forest_p, n_nodes));
    kb.bind_output(Region::new("inp_indices", indices_p, batch));
    kb.bind_output(Region::new("inp_values", values_p, batch));
}

/// Build the baseline kernel with runtime wrap checks.
pub fn scalar(spec: &MachineSpec, problem: &Problem) -> Result<Kernel, BuildError> {
    let mut kb = KernelBuilder::new(spec, "scalar");
    bind_regions(&mut kb, problem);
    let layout = ScratchLayout::build(&mut kb, problem.batch_size)?;
    kb.pause();
    scalar::push_main_loop(&mut kb, &layout, problem.batch_size, problem.rounds)?;
    layout.write_back(&mut kb, problem.batch_size)?;
    kb.pause();
    Ok(kb.build())
}

/// Build the depth-aware kernel with no flow operations in the main loop.
pub fn unrolled(spec: &MachineSpec, problem: &Problem) -> Result<Kernel, BuildError> {
    let mut kb = KernelBuilder::new(spec, "unrolled");
    bind_regions(&mut kb, problem);
    let layout = ScratchLayout::build(&mut kb, problem.batch_size)?;
    kb.pause();
    unrolled::push_main_loop(
        &mut kb,
        &layout,
        problem.batch_size,
        problem.rounds,
        problem.forest_height,
    )?;
    layout.write_back(&mut kb, problem.batch_size)?;
    kb.pause();
    Ok(kb.build())
}
