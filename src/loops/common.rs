//! Building blocks shared by the traversal kernels.

use crate::kernel::{AluOp, BuildError, KernelBuilder, Op};
use crate::loops::ScratchLayout;
use crate::reference::HASH_STAGES;

/// Emit the six-stage mixing function over the accumulator cell `acc`.
///
/// Each stage is three scalar ops through two temporaries:
///
/// ```text
/// tmp1 = acc op1 c1
/// tmp2 = acc op3 c3
/// acc  = tmp1 op2 tmp2
/// ```
///
/// Stage constants are interned, so they cost one load each across the
/// whole kernel regardless of how many times the hash is emitted.
pub(crate) fn push_hash(
    kb: &mut KernelBuilder,
    acc: u32,
    tmp1: u32,
    tmp2: u32,
) -> Result<(), BuildError> {
    for stage in HASH_STAGES {
        let c1 = kb.scratch_const(stage.c1)?;
        let c3 = kb.scratch_const(stage.c3)?;
        kb.push(Op::Alu {
            op: stage.op1,
            dst: tmp1,
            a: acc,
            b: c1,
        });
        kb.push(Op::Alu {
            op: stage.op3,
            dst: tmp2,
            a: acc,
            b: c3,
        });
        kb.push(Op::Alu {
            op: stage.op2,
            dst: acc,
            a: tmp1,
            b: tmp2,
        });
    }
    Ok(())
}

/// Emit the next-index computation from hash parity:
/// `cur_node = 2*cur_node + (acc % 2 + 1)`.
///
/// An even hash steps to the left child (`+1`), an odd one to the right
/// (`+2`). Wrapping back to the root is the caller's concern.
pub(crate) fn push_parity_index(kb: &mut KernelBuilder, s: &ScratchLayout, acc: u32, cur_node: u32) {
    kb.push(Op::Alu {
        op: AluOp::Mod,
        dst: s.tmp1,
        a: acc,
        b: s.two,
    });
    kb.push(Op::Alu {
        op: AluOp::Add,
        dst: s.tmp3,
        a: s.tmp1,
        b: s.one,
    });
    kb.push(Op::Alu {
        op: AluOp::Mul,
        dst: cur_node,
        a: cur_node,
        b: s.two,
    });
    kb.push(Op::Alu {
        op: AluOp::Add,
        dst: cur_node,
        a: cur_node,
        b: s.tmp3,
    });
}
