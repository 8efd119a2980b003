//! Cycle-count scenarios pinning down the scheduler's overlap behavior.

use vliw_emu::kernel::{AluOp, Engine, KernelBuilder, Op, OpClass};
use vliw_emu::machine::{MachineSpec, MemoryImage};
use vliw_emu::sim::{CostModel, Simulator};

/// A cost table giving three ops on three engines durations 4, 6 and 5.
fn mixed_costs() -> CostModel {
    CostModel::vliw8()
        .with_duration(OpClass::Alu, 4)
        .with_duration(OpClass::Valu, 6)
        .with_duration(OpClass::Const, 5)
}

/// Three independent ops on three distinct engines.
fn independent_kernel(spec: &MachineSpec) -> vliw_emu::kernel::Kernel {
    let mut kb = KernelBuilder::new(spec, "independent");
    kb.push(Op::Alu {
        op: AluOp::Add,
        dst: 0,
        a: 1,
        b: 2,
    });
    kb.push(Op::Valu {
        op: AluOp::Xor,
        dst: 8,
        a: 16,
        b: 24,
    });
    kb.push(Op::Const { dst: 40, value: 7 });
    kb.build()
}

#[test]
fn independent_ops_overlap_fully() {
    let spec = MachineSpec::vliw8();
    let sim = Simulator::new(spec.clone(), mixed_costs());
    let kernel = independent_kernel(&spec);
    let result = sim.run(&kernel, MemoryImage::zeroed(64)).unwrap();

    // With ample lanes everything starts at cycle 0 and the kernel finishes
    // with its longest op.
    assert_eq!(result.cycles, 6);
    assert_eq!(result.events.len(), 3);
    for event in &result.events {
        assert_eq!(event.start, 0);
    }
}

#[test]
fn chained_ops_serialize_to_the_sum() {
    let spec = MachineSpec::vliw8();
    let sim = Simulator::new(spec.clone(), mixed_costs());

    let mut kb = KernelBuilder::new(&spec, "chained");
    kb.push(Op::Alu {
        op: AluOp::Add,
        dst: 0,
        a: 1,
        b: 2,
    });
    kb.push(Op::Valu {
        op: AluOp::Xor,
        dst: 8,
        a: 16,
        b: 24,
    });
    kb.push(Op::Const { dst: 40, value: 7 });
    kb.after(0, 1);
    kb.after(1, 2);
    let kernel = kb.build();

    let result = sim.run(&kernel, MemoryImage::zeroed(64)).unwrap();
    assert_eq!(result.cycles, 4 + 6 + 5);

    let span = |index: usize| {
        let event = result.events.iter().find(|e| e.index == index).unwrap();
        (event.start, event.end)
    };
    assert_eq!(span(0), (0, 4));
    assert_eq!(span(1), (4, 10));
    assert_eq!(span(2), (10, 15));
}

#[test]
fn data_chain_matches_explicit_chain() {
    // The same serialization arises from RAW dependencies alone.
    let spec = MachineSpec::vliw8();
    let sim = Simulator::new(spec.clone(), mixed_costs());

    let mut kb = KernelBuilder::new(&spec, "raw-chain");
    kb.push(Op::Const { dst: 0, value: 1 }); // 5 cycles
    kb.push(Op::Alu {
        op: AluOp::Add,
        dst: 1,
        a: 0,
        b: 0,
    }); // 4 cycles, reads op 0's cell
    kb.push(Op::Alu {
        op: AluOp::Add,
        dst: 2,
        a: 1,
        b: 1,
    }); // 4 cycles, reads op 1's cell
    let kernel = kb.build();

    let result = sim.run(&kernel, MemoryImage::zeroed(4)).unwrap();
    assert_eq!(result.cycles, 5 + 4 + 4);
}

#[test]
fn single_lane_engine_serializes_independent_ops() {
    // Two independent flow ops on the single flow lane cannot overlap.
    let spec = MachineSpec::vliw8();
    let sim = Simulator::vliw8();
    let mut kb = KernelBuilder::new(&spec, "flow-pressure");
    kb.push(Op::Select {
        dst: 0,
        cond: 1,
        if_true: 2,
        if_false: 3,
    });
    kb.push(Op::Select {
        dst: 4,
        cond: 5,
        if_true: 6,
        if_false: 7,
    });
    let kernel = kb.build();

    let result = sim.run(&kernel, MemoryImage::zeroed(4)).unwrap();
    assert_eq!(result.cycles, 2);
    let lanes: Vec<_> = result.events.iter().map(|e| (e.engine, e.lane)).collect();
    assert_eq!(lanes, vec![(Engine::Flow, 0), (Engine::Flow, 0)]);
    assert_eq!(result.events[0].end, result.events[1].start);
}

#[test]
fn identical_runs_are_identical() {
    let spec = MachineSpec::vliw8();
    let sim = Simulator::new(spec.clone(), mixed_costs());
    let kernel = independent_kernel(&spec);

    let a = sim.run(&kernel, MemoryImage::zeroed(64)).unwrap();
    let b = sim.run(&kernel, MemoryImage::zeroed(64)).unwrap();
    assert_eq!(a.cycles, b.cycles);
    assert_eq!(a.events, b.events);
    assert_eq!(a.output, b.output);
}
