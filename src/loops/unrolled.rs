//! Depth-aware main loop that eliminates all flow operations.

use crate::kernel::{AluOp, BuildError, KernelBuilder, Op};
use crate::loops::{push_hash, push_parity_index, ScratchLayout};

/// Emit the fully unrolled main loop with build-time wrap elimination.
///
/// All batch elements start at the root, so their depth advances in
/// lockstep and is known per round without looking at any runtime value:
///
/// - rounds at depth below the forest height cannot step off the tree, so
///   no wrap check is emitted at all;
/// - rounds at exactly the forest height always step off a leaf, so the
///   index is forced back to the root unconditionally with a plain add.
pub(crate) fn push_main_loop(
    kb: &mut KernelBuilder,
    s: &ScratchLayout,
    batch_size: u32,
    rounds: u32,
    forest_height: u32,
) -> Result<(), BuildError> {
    let mut depth = 0;
    for _round in 0..rounds {
        let is_wrap = depth == forest_height;
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

            push_parity_index(kb, s, acc, cur_node);
            if is_wrap {
                // Stepping off a leaf always lands past the last node.
                kb.push(Op::Alu {
                    op: AluOp::Add,
                    dst: cur_node,
                    a: s.zero,
                    b: s.zero,
                });
            }
        }
        depth = if is_wrap { 0 } else { depth + 1 };
    }
    Ok(())
}
