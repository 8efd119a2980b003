//! Baseline main loop with runtime wrap checking.

use crate::kernel::{AluOp, BuildError, KernelBuilder, Op};
use crate::loops::{push_hash, push_parity_index, ScratchLayout};

/// Emit the fully unrolled main loop.
///
/// Every element of every round ends with an explicit bounds test and a
/// flow select that wraps the index back to the root. The select occupies
/// the machine's single flow lane, which is what the depth-aware variant
/// eliminates.
pub(crate) fn push_main_loop(
    kb: &mut KernelBuilder,
    s: &ScratchLayout,
    batch_size: u32,
    rounds: u32,
) -> Result<(), BuildError> {
    for _round in 0..rounds {
        for batch in 0..batch_size {
            let cur_node = s.instance_pointers + batch;
            let acc = s.instance_accumulators + batch;

            // node_val = mem[forest_values_p + idx]
            kb.push(Op::Alu {
                op: AluOp::Add,
                dst: s.tmp_addr,
                a: s.forest_values_p,
                b: cur_node,
            });
            kb.push(Op::Load {
                dst: s.tmp_node_val,
                addr: s.tmp_addr,
            });

            // acc = myhash(acc ^ node_val)
            kb.push(Op::Alu {
                op: AluOp::Xor,
                dst: acc,
                a: acc,
                b: s.tmp_node_val,
            });
            push_hash(kb, acc, s.tmp1, s.tmp2)?;

            // idx = 2*idx + (1 or 2), wrapped to the root at runtime
            push_parity_index(kb, s, acc, cur_node);
            kb.push(Op::Alu {
                op: AluOp::Lt,
                dst: s.tmp1,
                a: cur_node,
                b: s.n_nodes,
            });
            kb.push(Op::Select {
                dst: cur_node,
                cond: s.tmp1,
                if_true: cur_node,
                if_false: s.zero,
            });
        }
    }
    Ok(())
}
