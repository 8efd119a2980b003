//! Trace serialization round-trips and determinism.

use vliw_emu::bench::{Case, Harness, KernelVariant};
use vliw_emu::machine::MachineSpec;
use vliw_emu::reference::Problem;
use vliw_emu::sim::Simulator;
use vliw_emu::trace::{self, TraceRecorder};

fn traced_json(problem: &Problem, variant: KernelVariant) -> (MachineSpec, Vec<vliw_emu::sim::Event>, String) {
    let spec = MachineSpec::vliw8();
    let sim = Simulator::vliw8();
    let kernel = variant.build(&spec, problem).unwrap();
    let result = sim.run(&kernel, problem.image()).unwrap();
    let mut recorder = TraceRecorder::new(spec.clone());
    recorder.record_run(&result);
    let json = recorder.to_json().unwrap();
    (spec, result.events, json)
}

#[test]
fn parsed_trace_equals_recorded_events() {
    let (spec, events, json) = traced_json(&Problem::small(), KernelVariant::Unrolled);
    let parsed = trace::parse(&json, &spec).unwrap();
    assert_eq!(parsed, events);
}

#[test]
fn regenerated_trace_is_byte_identical() {
    let problem = Problem::small();
    let (_, _, first) = traced_json(&problem, KernelVariant::Scalar);
    let (_, _, second) = traced_json(&problem, KernelVariant::Scalar);
    assert_eq!(first, second);
}

#[test]
fn trace_file_round_trips_through_disk() {
    let (spec, events, json) = traced_json(&Problem::small(), KernelVariant::Scalar);
    let path = std::env::temp_dir().join("vliw-emu-trace-roundtrip.json");

    let sim = Simulator::vliw8();
    let kernel = KernelVariant::Scalar.build(&spec, &Problem::small()).unwrap();
    let result = sim.run(&kernel, Problem::small().image()).unwrap();
    let mut recorder = TraceRecorder::new(spec.clone());
    recorder.record_run(&result);
    recorder.write_file(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(written, json);
    assert_eq!(trace::parse(&written, &spec).unwrap(), events);
}

#[test]
fn harness_records_trace_for_failing_runs() {
    // An unmeetable budget fails the case, but the trace still carries
    // every retired event.
    let case = Case {
        name: "slow".to_string(),
        variant: KernelVariant::Unrolled,
        problem: Problem::small(),
        cycle_budget: Some(1),
    };
    let harness = Harness::vliw8();
    let mut recorder = TraceRecorder::new(harness.spec().clone());
    let report = harness.run_case_traced(&case, &mut recorder);
    assert!(!report.is_within_budget());
    assert!(report.is_correct());

    let kernel = case.variant.build(harness.spec(), &case.problem).unwrap();
    assert_eq!(recorder.len(), kernel.len());
}
