//! End-to-end: prebuilt kernels against the oracle through the harness.

use vliw_emu::bench::{Case, CaseOutcome, Harness, KernelVariant, Manifest};
use vliw_emu::check;
use vliw_emu::loops;
use vliw_emu::machine::MachineSpec;
use vliw_emu::reference::{reference_traversal, Problem};
use vliw_emu::sim::Simulator;

fn problems() -> Vec<Problem> {
    vec![
        Problem::small(),
        // Rounds deep enough to wrap multiple times.
        Problem {
            forest_height: 1,
            rounds: 7,
            batch_size: 4,
            seed: 2,
        },
        Problem {
            forest_height: 4,
            rounds: 11,
            batch_size: 3,
            seed: 99,
        },
    ]
}

#[test]
fn kernels_match_the_oracle() {
    let spec = MachineSpec::vliw8();
    let sim = Simulator::vliw8();
    for problem in problems() {
        for variant in KernelVariant::all() {
            let kernel = variant.build(&spec, &problem).unwrap();
            let result = sim.run(&kernel, problem.image()).unwrap();
            let expected = reference_traversal(&problem.image()).unwrap();
            let verdict = check::check_image(kernel.outputs(), &result.output, &expected).unwrap();
            assert!(
                verdict.is_pass(),
                "{} on {:?}: {}",
                variant.name(),
                problem,
                verdict
            );
        }
    }
}

#[test]
fn cycle_counts_are_reproducible() {
    let spec = MachineSpec::vliw8();
    let sim = Simulator::vliw8();
    let problem = Problem::small();
    for variant in KernelVariant::all() {
        let kernel = variant.build(&spec, &problem).unwrap();
        let a = sim.run(&kernel, problem.image()).unwrap();
        let b = sim.run(&kernel, problem.image()).unwrap();
        assert_eq!(a.cycles, b.cycles);
        assert_eq!(a.events, b.events);
    }
}

#[test]
fn scalar_and_unrolled_agree_on_output() {
    let spec = MachineSpec::vliw8();
    let sim = Simulator::vliw8();
    let problem = Problem {
        forest_height: 2,
        rounds: 6,
        batch_size: 5,
        seed: 17,
    };
    let scalar = loops::scalar(&spec, &problem).unwrap();
    let unrolled = loops::unrolled(&spec, &problem).unwrap();
    let a = sim.run(&scalar, problem.image()).unwrap();
    let b = sim.run(&unrolled, problem.image()).unwrap();
    assert_eq!(a.output, b.output);
}

#[test]
fn manifest_suite_runs_end_to_end() {
    let manifest = Manifest::parse_str(
        r#"
[[case]]
name = "scalar-tiny"
kernel = "scalar"
forest_height = 2
rounds = 3
batch_size = 4
seed = 5
cycle_budget = 100000

[[case]]
name = "unrolled-tiny"
kernel = "unrolled"
forest_height = 2
rounds = 3
batch_size = 4
seed = 5
cycle_budget = 100000
"#,
    )
    .unwrap();
    let cases = manifest.cases().unwrap();
    let report = Harness::vliw8().run_suite(&cases);
    assert!(report.all_correct(), "{}", report.summary());
    assert!(report.all_within_budget(), "{}", report.summary());
}

#[test]
fn unbuildable_case_is_an_error_and_does_not_stop_the_suite() {
    // A batch too large for scratch aborts during construction; the other
    // case still runs and passes.
    let cases = vec![
        Case {
            name: "oversized".to_string(),
            variant: KernelVariant::Unrolled,
            problem: Problem {
                forest_height: 2,
                rounds: 1,
                batch_size: 2000,
                seed: 1,
            },
            cycle_budget: None,
        },
        Case {
            name: "fine".to_string(),
            variant: KernelVariant::Unrolled,
            problem: Problem::small(),
            cycle_budget: None,
        },
    ];
    let report = Harness::vliw8().run_suite(&cases);
    assert!(matches!(report.cases[0].outcome, CaseOutcome::Error(_)));
    assert!(report.cases[1].is_correct());
    assert!(!report.all_correct());
    assert!(report.summary().contains("ERROR"));
}
