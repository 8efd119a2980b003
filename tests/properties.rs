//! Property tests over randomly generated kernels.
//!
//! Faulting kernels (out-of-bounds memory addresses, cyclic explicit edges)
//! are left in the generator's range on purpose: determinism has to hold
//! for failing runs too, and the scheduling invariants are checked on
//! whichever runs succeed.

use proptest::prelude::*;

use vliw_emu::kernel::{AluOp, Kernel, KernelBuilder, Op};
use vliw_emu::machine::{MachineSpec, MemoryImage};
use vliw_emu::sim::{deps, CostModel, Simulator};

/// Scratch cells the generator draws from.
const CELLS: u32 = 16;
/// Memory image size; constants stay below it so most loads land in bounds.
const MEM_WORDS: usize = 64;
/// Upper bound on generated kernel length.
const MAX_OPS: usize = 48;

fn arb_alu_op() -> impl Strategy<Value = AluOp> {
    // Division and modulo are exercised by unit tests; leaving them out
    // here keeps generated runs from tripping on divide-by-zero instead of
    // the properties under test.
    prop_oneof![
        Just(AluOp::Add),
        Just(AluOp::Sub),
        Just(AluOp::Mul),
        Just(AluOp::Xor),
        Just(AluOp::And),
        Just(AluOp::Or),
        Just(AluOp::Shl),
        Just(AluOp::Shr),
        Just(AluOp::Lt),
        Just(AluOp::Eq),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_alu_op(), 0..CELLS, 0..CELLS, 0..CELLS)
            .prop_map(|(op, dst, a, b)| Op::Alu { op, dst, a, b }),
        (arb_alu_op(), 0..2u32, 0..2u32, 0..2u32).prop_map(|(op, dst, a, b)| Op::Valu {
            op,
            dst: dst * 8,
            a: a * 8,
            b: b * 8,
        }),
        (0..CELLS, 0..MEM_WORDS as u32).prop_map(|(dst, value)| Op::Const { dst, value }),
        (0..CELLS, 0..CELLS).prop_map(|(dst, addr)| Op::Load { dst, addr }),
        (0..CELLS, 0..CELLS).prop_map(|(addr, src)| Op::Store { addr, src }),
        (0..CELLS, 0..CELLS, 0..CELLS, 0..CELLS).prop_map(|(dst, cond, if_true, if_false)| {
            Op::Select {
                dst,
                cond,
                if_true,
                if_false,
            }
        }),
        Just(Op::Pause),
    ]
}

fn build_kernel(ops: &[Op], edges: &[(usize, usize)]) -> Kernel {
    let mut kb = KernelBuilder::new(&MachineSpec::vliw8(), "generated");
    for op in ops {
        kb.push(op.clone());
    }
    for &(earlier, later) in edges {
        kb.after(earlier, later);
    }
    kb.build()
}

proptest! {
    #[test]
    fn runs_are_deterministic(
        ops in proptest::collection::vec(arb_op(), 1..MAX_OPS),
        raw_edges in proptest::collection::vec((0..MAX_OPS, 0..MAX_OPS), 0..4),
    ) {
        let edges: Vec<_> = raw_edges
            .into_iter()
            .filter(|&(a, b)| a < ops.len() && b < ops.len())
            .collect();
        let kernel = build_kernel(&ops, &edges);
        let sim = Simulator::vliw8();

        let first = sim.run(&kernel, MemoryImage::zeroed(MEM_WORDS));
        let second = sim.run(&kernel, MemoryImage::zeroed(MEM_WORDS));
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.cycles, b.cycles);
                prop_assert_eq!(&a.events, &b.events);
                prop_assert_eq!(&a.output, &b.output);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            (a, b) => prop_assert!(
                false,
                "runs disagree on success: {:?} vs {:?}",
                a.is_ok(),
                b.is_ok()
            ),
        }
    }

    #[test]
    fn dependency_edges_are_monotonic(ops in proptest::collection::vec(arb_op(), 1..MAX_OPS)) {
        let kernel = build_kernel(&ops, &[]);
        let sim = Simulator::vliw8();
        if let Ok(result) = sim.run(&kernel, MemoryImage::zeroed(MEM_WORDS)) {
            let graph = deps::build(&kernel).unwrap();
            let mut span = vec![(0u64, 0u64); kernel.len()];
            for event in &result.events {
                span[event.index] = (event.start, event.end);
            }
            for later in 0..kernel.len() {
                for &earlier in graph.preds(later) {
                    prop_assert!(
                        span[earlier as usize].1 <= span[later].0,
                        "op {} ends at {} but dependent op {} starts at {}",
                        earlier,
                        span[earlier as usize].1,
                        later,
                        span[later].0
                    );
                }
            }
        }
    }

    #[test]
    fn lanes_are_never_double_booked(ops in proptest::collection::vec(arb_op(), 1..MAX_OPS)) {
        let kernel = build_kernel(&ops, &[]);
        let sim = Simulator::vliw8();
        if let Ok(result) = sim.run(&kernel, MemoryImage::zeroed(MEM_WORDS)) {
            let mut by_lane: std::collections::HashMap<_, Vec<(u64, u64)>> =
                std::collections::HashMap::new();
            for event in &result.events {
                by_lane
                    .entry((event.engine, event.lane))
                    .or_default()
                    .push((event.start, event.end));
            }
            for ((engine, lane), mut spans) in by_lane {
                spans.sort_unstable();
                for pair in spans.windows(2) {
                    prop_assert!(
                        pair[0].1 <= pair[1].0,
                        "{engine:?} lane {lane} hosts overlapping spans {:?} and {:?}",
                        pair[0],
                        pair[1]
                    );
                }
            }
        }
    }

    #[test]
    fn cycle_count_is_bounded_by_work(ops in proptest::collection::vec(arb_op(), 1..MAX_OPS)) {
        let kernel = build_kernel(&ops, &[]);
        let sim = Simulator::vliw8();
        if let Ok(result) = sim.run(&kernel, MemoryImage::zeroed(MEM_WORDS)) {
            let costs = CostModel::vliw8();
            let durations: Vec<u64> = kernel
                .ops()
                .iter()
                .map(|op| costs.duration(op.class()).unwrap())
                .collect();
            let total: u64 = durations.iter().sum();
            let longest: u64 = durations.iter().copied().max().unwrap_or(0);

            // Full serialization and full overlap bound the schedule.
            prop_assert!(result.cycles <= total);
            prop_assert!(result.cycles >= longest);
            let max_end = result.events.iter().map(|e| e.end).max().unwrap_or(0);
            prop_assert_eq!(result.cycles, max_end);
        }
    }

    #[test]
    fn one_event_per_operation_in_retirement_order(
        ops in proptest::collection::vec(arb_op(), 1..MAX_OPS),
    ) {
        let kernel = build_kernel(&ops, &[]);
        let sim = Simulator::vliw8();
        if let Ok(result) = sim.run(&kernel, MemoryImage::zeroed(MEM_WORDS)) {
            prop_assert_eq!(result.events.len(), kernel.len());
            let mut seen = vec![false; kernel.len()];
            for event in &result.events {
                prop_assert!(!seen[event.index], "op {} retired twice", event.index);
                seen[event.index] = true;
            }
            for pair in result.events.windows(2) {
                prop_assert!(
                    (pair[0].start, pair[0].index) < (pair[1].start, pair[1].index),
                    "events not in (start, index) order"
                );
            }
        }
    }
}
