//! vliw-emu: cycle simulator and benchmark harness for a VLIW SIMD kernel machine.

use std::env;

use anyhow::{anyhow, bail};

use vliw_emu::bench::{default_cases, Case, CaseOutcome, Harness, Manifest};
use vliw_emu::reference;
use vliw_emu::trace::TraceRecorder;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mode = match args.get(1) {
        Some(mode) => mode.as_str(),
        None => {
            print_usage();
            std::process::exit(2);
        }
    };

    // Parse options shared by all modes
    let mut manifest_path: Option<String> = None;
    let mut case_name: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut iter = args.iter().skip(2);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--manifest" => {
                manifest_path = Some(
                    iter.next()
                        .ok_or_else(|| anyhow!("--manifest requires a file argument"))?
                        .clone(),
                );
            }
            "--case" => {
                case_name = Some(
                    iter.next()
                        .ok_or_else(|| anyhow!("--case requires a name argument"))?
                        .clone(),
                );
            }
            _ if arg.starts_with('-') => bail!("unknown option: {arg}"),
            _ => positional.push(arg.clone()),
        }
    }

    let cases = match &manifest_path {
        Some(path) => Manifest::from_file(path)?.cases()?,
        None => default_cases(),
    };

    match mode {
        "bench" => run_bench(&cases),
        "check" => run_check(&cases),
        "trace" => run_trace(&cases, &positional, case_name.as_deref()),
        "reference" => run_reference(),
        other => {
            print_usage();
            bail!("unknown mode: {other}");
        }
    }
}

/// Full suite: correctness and cycle budgets both gate the exit code.
fn run_bench(cases: &[Case]) -> anyhow::Result<()> {
    let harness = Harness::vliw8();
    let report = harness.run_suite(cases);
    print!("{}", report.summary());
    if !report.all_correct() || !report.all_within_budget() {
        std::process::exit(1);
    }
    Ok(())
}

/// Correctness only; cycle budgets are ignored.
fn run_check(cases: &[Case]) -> anyhow::Result<()> {
    let harness = Harness::vliw8();
    let report = harness.run_suite(cases);
    for case in &report.cases {
        match &case.outcome {
            CaseOutcome::Completed { correctness, .. } => {
                println!("{}: {}", case.name, correctness);
            }
            CaseOutcome::Error(error) => {
                println!("{}: ERROR: {}", case.name, error);
            }
        }
    }
    if !report.all_correct() {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one case and write its trace, pass or fail.
fn run_trace(cases: &[Case], positional: &[String], case_name: Option<&str>) -> anyhow::Result<()> {
    let out = positional
        .first()
        .ok_or_else(|| anyhow!("trace mode requires an output path"))?;
    let case = match case_name {
        Some(name) => cases
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| anyhow!("no case named {name:?}"))?,
        None => cases
            .first()
            .ok_or_else(|| anyhow!("no cases to trace"))?,
    };

    let harness = Harness::vliw8();
    let mut recorder = TraceRecorder::new(harness.spec().clone());
    let report = harness.run_case_traced(case, &mut recorder);

    // The file is written regardless of the verdict; a failing run's trace
    // is exactly what post-mortem inspection needs.
    recorder.write_file(out)?;
    println!("Wrote trace for {} to {}", case.name, out);

    match &report.outcome {
        CaseOutcome::Completed {
            cycles,
            correctness,
            ..
        } => {
            println!("{}: {} cycles, {}", report.name, cycles, correctness);
            Ok(())
        }
        CaseOutcome::Error(error) => bail!("case {} aborted: {}", report.name, error),
    }
}

/// Oracle self-tests; the simulator never runs.
fn run_reference() -> anyhow::Result<()> {
    reference::self_check()?;
    println!("reference self-check passed");
    Ok(())
}

fn print_usage() {
    println!("Usage: vliw-emu <mode> [options]");
    println!();
    println!("Modes:");
    println!("  bench                 run the suite; fail on any wrong or over-budget case");
    println!("  check                 run the suite; fail on wrong answers only");
    println!("  trace <out.json>      run one case and write its execution trace");
    println!("  reference             run the oracle's self-tests without the simulator");
    println!();
    println!("Options:");
    println!("  --manifest <file>     load cases from a TOML manifest instead of the built-ins");
    println!("  --case <name>         which case to trace (default: the first)");
}
