//! Benchmark harness.
//!
//! Runs named kernel cases through the simulator, checks each result
//! against the oracle and compares the cycle count to the case's budget.
//! Correctness and speed are judged separately: a suite is only as correct
//! as its worst case, but a correct-yet-slow case is reported as exactly
//! that, not folded into a single failure bit.
//!
//! Cases are independent values, so the suite fans them out across rayon
//! workers; every run owns its machine state and its own oracle.

pub mod manifest;

use rayon::prelude::*;
use thiserror::Error;

use crate::check::{self, CheckError, Verdict};
use crate::kernel::{BuildError, Kernel};
use crate::loops;
use crate::machine::{MachineSpec, MemError};
use crate::reference::{reference_traversal, Problem};
use crate::sim::{ConfigError, Simulator};
use crate::trace::TraceRecorder;

pub use manifest::{CaseDef, Manifest, ManifestError};

/// Which prebuilt kernel a case exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelVariant {
    Scalar,
    Unrolled,
}

impl KernelVariant {
    pub fn all() -> [KernelVariant; 2] {
        [KernelVariant::Scalar, KernelVariant::Unrolled]
    }

    pub fn name(self) -> &'static str {
        match self {
            KernelVariant::Scalar => "scalar",
            KernelVariant::Unrolled => "unrolled",
        }
    }

    pub fn from_name(name: &str) -> Option<KernelVariant> {
        match name {
            "scalar" => Some(KernelVariant::Scalar),
            "unrolled" => Some(KernelVariant::Unrolled),
            _ => None,
        }
    }

    /// Build this variant's kernel for a problem.
    pub fn build(self, spec: &MachineSpec, problem: &Problem) -> Result<Kernel, BuildError> {
        match self {
            KernelVariant::Scalar => loops::scalar(spec, problem),
            KernelVariant::Unrolled => loops::unrolled(spec, problem),
        }
    }
}

/// One named benchmark case.
#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub variant: KernelVariant,
    pub problem: Problem,
    /// Cycle budget. `None` reports the count without a speed verdict.
    pub cycle_budget: Option<u64>,
}

/// Fatal error that aborted a case before it produced a verdict.
///
/// Surfaced separately from a correctness failure so callers can tell a
/// crashed case from a wrong one. Never retried: every stage of a run is
/// deterministic.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("kernel construction failed: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("reference evaluation failed: {0}")]
    Reference(#[from] MemError),

    #[error(transparent)]
    Check(#[from] CheckError),
}

/// What happened to one case.
#[derive(Debug)]
pub enum CaseOutcome {
    /// The run finished and was judged.
    Completed {
        cycles: u64,
        correctness: Verdict,
        /// `None` when the case declares no budget.
        within_budget: Option<bool>,
    },
    /// The run aborted on a configuration error.
    Error(CaseError),
}

/// Judged result of one case.
#[derive(Debug)]
pub struct CaseReport {
    pub name: String,
    pub outcome: CaseOutcome,
}

impl CaseReport {
    /// True when the case ran to completion and matched the oracle.
    pub fn is_correct(&self) -> bool {
        matches!(
            &self.outcome,
            CaseOutcome::Completed { correctness, .. } if correctness.is_pass()
        )
    }

    /// True unless the case declared a budget and exceeded it.
    ///
    /// An aborted case has no cycle count and reports false.
    pub fn is_within_budget(&self) -> bool {
        match &self.outcome {
            CaseOutcome::Completed { within_budget, .. } => within_budget.unwrap_or(true),
            CaseOutcome::Error(_) => false,
        }
    }

    pub fn cycles(&self) -> Option<u64> {
        match &self.outcome {
            CaseOutcome::Completed { cycles, .. } => Some(*cycles),
            CaseOutcome::Error(_) => None,
        }
    }
}

/// Aggregated report over a whole suite.
#[derive(Debug)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    /// The suite verdict: every case completed and matched the oracle.
    pub fn all_correct(&self) -> bool {
        self.cases.iter().all(CaseReport::is_correct)
    }

    /// Every budgeted case stayed within its budget.
    pub fn all_within_budget(&self) -> bool {
        self.cases.iter().all(CaseReport::is_within_budget)
    }

    /// Human-readable per-case table plus totals.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("Benchmark Suite\n");
        out.push_str("===============\n");
        let width = self
            .cases
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .max(8);
        for case in &self.cases {
            match &case.outcome {
                CaseOutcome::Completed {
                    cycles,
                    correctness,
                    within_budget,
                } => {
                    let budget = match within_budget {
                        Some(true) => "within budget",
                        Some(false) => "OVER BUDGET",
                        None => "no budget",
                    };
                    out.push_str(&format!(
                        "  {:width$}  {:>9} cycles  {:13}  {}\n",
                        case.name, cycles, budget, correctness,
                    ));
                }
                CaseOutcome::Error(error) => {
                    out.push_str(&format!("  {:width$}  ERROR: {}\n", case.name, error));
                }
            }
        }
        let correct = self.cases.iter().filter(|c| c.is_correct()).count();
        let within = self.cases.iter().filter(|c| c.is_within_budget()).count();
        out.push_str(&format!(
            "\n{}/{} correct, {}/{} within budget\n",
            correct,
            self.cases.len(),
            within,
            self.cases.len(),
        ));
        out
    }
}

/// Runs cases against one simulator configuration.
#[derive(Debug, Clone)]
pub struct Harness {
    simulator: Simulator,
}

impl Harness {
    pub fn new(simulator: Simulator) -> Self {
        Self { simulator }
    }

    /// The standard machine with its standard cost table.
    pub fn vliw8() -> Self {
        Self::new(Simulator::vliw8())
    }

    pub fn spec(&self) -> &MachineSpec {
        self.simulator.spec()
    }

    /// Run one case: simulate, judge against the oracle, judge the budget.
    pub fn run_case(&self, case: &Case) -> CaseReport {
        self.run_case_inner(case, None)
    }

    /// Like [`Harness::run_case`], additionally recording every retired
    /// event. Events are recorded whenever the run itself completes, pass
    /// or fail, so failing runs can be inspected after the fact.
    pub fn run_case_traced(&self, case: &Case, recorder: &mut TraceRecorder) -> CaseReport {
        self.run_case_inner(case, Some(recorder))
    }

    fn run_case_inner(&self, case: &Case, recorder: Option<&mut TraceRecorder>) -> CaseReport {
        let name = case.name.clone();
        match self.evaluate(case, recorder) {
            Ok(outcome) => CaseReport { name, outcome },
            Err(error) => {
                log::warn!("case {name}: {error}");
                CaseReport {
                    name,
                    outcome: CaseOutcome::Error(error),
                }
            }
        }
    }

    fn evaluate(
        &self,
        case: &Case,
        recorder: Option<&mut TraceRecorder>,
    ) -> Result<CaseOutcome, CaseError> {
        let kernel = case.variant.build(self.simulator.spec(), &case.problem)?;
        let image = case.problem.image();
        let result = self.simulator.run(&kernel, image)?;
        if let Some(recorder) = recorder {
            recorder.record_run(&result);
        }

        let expected = reference_traversal(&case.problem.image())?;
        let correctness = check::check_image(kernel.outputs(), &result.output, &expected)?;
        let within_budget = case.cycle_budget.map(|budget| result.cycles <= budget);
        log::info!(
            "case {}: {} cycles, {}",
            case.name,
            result.cycles,
            correctness
        );
        Ok(CaseOutcome::Completed {
            cycles: result.cycles,
            correctness,
            within_budget,
        })
    }

    /// Run a list of cases on rayon workers, preserving input order.
    pub fn run_suite(&self, cases: &[Case]) -> SuiteReport {
        let reports = cases.par_iter().map(|case| self.run_case(case)).collect();
        SuiteReport { cases: reports }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::vliw8()
    }
}

/// The built-in suite: both kernel variants on the standard problem.
///
/// Budgets sit above the worst serialized schedule of each kernel, so a
/// regression has to be structural before they trip.
pub fn default_cases() -> Vec<Case> {
    vec![
        Case {
            name: "scalar".to_string(),
            variant: KernelVariant::Scalar,
            problem: Problem::standard(),
            cycle_budget: Some(250_000),
        },
        Case {
            name: "unrolled".to_string(),
            variant: KernelVariant::Unrolled,
            problem: Problem::standard(),
            cycle_budget: Some(150_000),
        },
    ]
}
