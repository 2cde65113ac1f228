//! Verdict classification.
//!
//! Everything in this module is a pure function of the unit's expectation, its category, and the outcomes
//! of the stages that ran. Pipelines call the step functions ([`after_compile`], [`after_link`],
//! [`after_execute`]) as they go so they can stop early; [`classify`] folds a complete record of stage
//! outcomes through the same steps.
//!
//! ## Rules
//!
//! - A timeout at any stage is terminal and reported as TIMEOUT, never folded into FAIL or PASS.
//! - A FAIL expectation is satisfied by a rejected compile in every category.
//! - In error-expecting categories the compiler's exit code is the whole verdict.
//! - In execution-expecting categories a successful compile continues to link and execution, and the
//!   artifact's exit code is compared against the expectation.
//! - A link failure is always a FAIL: the unit never got the chance to show its behavior.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use sir_conform_core::SkipTag;

use crate::error::{SkipReason, UnitFailure};
use crate::metadata::{Expectation, Metadata};
use crate::process::{Invocation, ProcessOutput};

/// Final classification of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
    Timeout(String),
    Skip(String),
}

impl Verdict {
    pub fn fail(failure: UnitFailure) -> Verdict {
        Verdict::Fail(failure.to_string())
    }

    pub fn skip(reason: SkipReason) -> Verdict {
        Verdict::Skip(reason.to_string())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail(_) => "FAIL",
            Verdict::Timeout(_) => "TIMEOUT",
            Verdict::Skip(_) => "SKIP",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(m) | Verdict::Timeout(m) | Verdict::Skip(m) => Some(m),
        }
    }

    /// FAIL or TIMEOUT: the verdicts that make the run exit non-zero.
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Fail(_) | Verdict::Timeout(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(m) => write!(f, "{}: {m}", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

/// A pipeline stage that runs an external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Link,
    Execute,
    Interpret,
    Solve,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Compile => "compile",
            Stage::Link => "link",
            Stage::Execute => "execute",
            Stage::Interpret => "interpret",
            Stage::Solve => "solve",
        }
    }

    fn timeout_message(self, after: Duration) -> String {
        let what = match self {
            Stage::Compile => "Compiler",
            Stage::Link => "Link",
            Stage::Execute => "Runtime",
            Stage::Interpret => "Interpreter",
            Stage::Solve => "Solver",
        };
        format!("{what} timeout after {} ms", after.as_millis())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a unit is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Judged by the compiler's exit code alone.
    ErrorExpecting,
    /// Must compile, then run; the artifact's exit code is judged.
    ExecutionExpecting,
}

impl Category {
    /// Execution-expecting when any directory component of `path` is one of `run_categories`.
    ///
    /// `path` must be relative to the test root (see [`TestUnit::relative_path`](crate::suite::TestUnit)).
    pub fn of_path<S: AsRef<str>>(path: &Path, run_categories: &[S]) -> Category {
        let parent = path.parent().unwrap_or(Path::new(""));
        let runnable = parent.components().any(|c| {
            let c = c.as_os_str();
            run_categories.iter().any(|name| c == name.as_ref())
        });
        if runnable {
            Category::ExecutionExpecting
        } else {
            Category::ErrorExpecting
        }
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The process ran and exited non-zero.
    StageFailed { stage: Stage, output: ProcessOutput },
    TimedOut { stage: Stage, after: Duration },
    /// The process ran and exited zero.
    Completed(ProcessOutput),
}

impl PipelineOutcome {
    pub fn from_invocation(stage: Stage, invocation: Invocation) -> PipelineOutcome {
        match invocation {
            Invocation::TimedOut { after } => PipelineOutcome::TimedOut { stage, after },
            Invocation::Completed(output) if output.success() => PipelineOutcome::Completed(output),
            Invocation::Completed(output) => PipelineOutcome::StageFailed { stage, output },
        }
    }

    /// Diagnostic text of a failed stage.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            PipelineOutcome::StageFailed { output, .. } => Some(&output.stderr),
            _ => None,
        }
    }
}

/// Whether a pipeline should run its next stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepDecision {
    Continue,
    Done(Verdict),
}

/// Decide whether a unit is scored at all, before any process runs.
///
/// ## Notes
/// - A skip tag for the active pipeline dominates everything, including a declared expectation.
/// - Then a missing expectation, then a missing optional runtime.
pub fn preflight(meta: &Metadata, active_tags: &[SkipTag], missing_runtime: Option<SkipReason>) -> Option<Verdict> {
    if let Some(tag) = active_tags.iter().find(|t| meta.skips(t)) {
        return Some(Verdict::skip(SkipReason::SkipTag(tag.clone())));
    }
    if meta.expectation == Expectation::Unknown {
        return Some(Verdict::skip(SkipReason::DirectiveAbsent));
    }
    missing_runtime.map(Verdict::skip)
}

pub fn after_compile(expectation: Expectation, category: Category, outcome: &PipelineOutcome) -> StepDecision {
    if expectation == Expectation::Unknown {
        return StepDecision::Done(Verdict::skip(SkipReason::DirectiveAbsent));
    }
    match outcome {
        PipelineOutcome::TimedOut { stage, after } => {
            StepDecision::Done(Verdict::Timeout(stage.timeout_message(*after)))
        }
        PipelineOutcome::StageFailed { output, .. } => match expectation {
            Expectation::Fail => StepDecision::Done(Verdict::Pass),
            _ => StepDecision::Done(Verdict::fail(UnitFailure::ToolchainRejected {
                exit_code: output.exit_code,
                stderr: output.stderr.clone(),
            })),
        },
        PipelineOutcome::Completed(_) => match (category, expectation) {
            (Category::ExecutionExpecting, _) => StepDecision::Continue,
            (Category::ErrorExpecting, Expectation::Fail) => {
                StepDecision::Done(Verdict::fail(UnitFailure::UnexpectedAcceptance))
            }
            (Category::ErrorExpecting, _) => StepDecision::Done(Verdict::Pass),
        },
    }
}

pub fn after_link(outcome: &PipelineOutcome) -> StepDecision {
    match outcome {
        PipelineOutcome::TimedOut { stage, after } => {
            StepDecision::Done(Verdict::Timeout(stage.timeout_message(*after)))
        }
        PipelineOutcome::StageFailed { output, .. } => {
            StepDecision::Done(Verdict::fail(UnitFailure::LinkFailed {
                exit_code: output.exit_code,
                stderr: output.stderr.clone(),
            }))
        }
        PipelineOutcome::Completed(_) => StepDecision::Continue,
    }
}

/// Judge a run of the artifact (or of the interpreter) by its exit code.
pub fn after_execute(expectation: Expectation, outcome: &PipelineOutcome) -> Verdict {
    match (outcome, expectation) {
        (_, Expectation::Unknown) => Verdict::skip(SkipReason::DirectiveAbsent),
        (PipelineOutcome::TimedOut { stage, after }, _) => Verdict::Timeout(stage.timeout_message(*after)),
        (PipelineOutcome::Completed(_), Expectation::Pass) => Verdict::Pass,
        (PipelineOutcome::Completed(_), Expectation::Fail) => Verdict::fail(UnitFailure::UnexpectedSuccess),
        (PipelineOutcome::StageFailed { .. }, Expectation::Fail) => Verdict::Pass,
        (PipelineOutcome::StageFailed { output, .. }, Expectation::Pass) => {
            Verdict::fail(UnitFailure::ExecutionFailed {
                exit_code: output.exit_code,
                stdout: output.stdout.clone(),
                stderr: output.stderr.clone(),
            })
        }
    }
}

/// Judge a solver run.
///
/// PASS expects a zero exit and a `SAT` verdict token; FAIL is satisfied by a non-zero exit or an `UNSAT`
/// token. Tokens are matched as whole words, so `UNSAT` never counts as `SAT`.
pub fn classify_solver(expectation: Expectation, outcome: &PipelineOutcome) -> Verdict {
    let output = match outcome {
        PipelineOutcome::TimedOut { stage, after } => return Verdict::Timeout(stage.timeout_message(*after)),
        PipelineOutcome::Completed(output) | PipelineOutcome::StageFailed { output, .. } => output,
    };
    let satisfied = match expectation {
        Expectation::Unknown => return Verdict::skip(SkipReason::DirectiveAbsent),
        Expectation::Pass => output.success() && has_token(&output.stdout, "SAT"),
        Expectation::Fail => !output.success() || has_token(&output.stdout, "UNSAT"),
    };
    if satisfied {
        Verdict::Pass
    } else {
        Verdict::fail(UnitFailure::SolverMismatch {
            expected: expectation,
            stdout: output.stdout.clone(),
            stderr: output.stderr.clone(),
        })
    }
}

fn has_token(text: &str, token: &str) -> bool {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word == token)
}

/// Recorded outcomes of a compiler-pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcomes {
    pub compile: PipelineOutcome,
    /// `None` for backends without a link step.
    pub link: Option<PipelineOutcome>,
    pub execute: Option<PipelineOutcome>,
}

/// Fold recorded stage outcomes into a verdict.
///
/// Stages recorded after the deciding one are ignored. A record that stops before the deciding stage is a
/// FAIL naming the missing stage.
pub fn classify(expectation: Expectation, category: Category, outcomes: &StageOutcomes) -> Verdict {
    if let StepDecision::Done(verdict) = after_compile(expectation, category, &outcomes.compile) {
        return verdict;
    }
    if let Some(StepDecision::Done(verdict)) = outcomes.link.as_ref().map(after_link) {
        return verdict;
    }
    match &outcomes.execute {
        Some(execute) => after_execute(expectation, execute),
        None => Verdict::Fail(format!("no outcome recorded for the {} stage", Stage::Execute)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(code: i32) -> ProcessOutput {
        ProcessOutput {
            exit_code: code,
            stderr: if code == 0 { String::new() } else { format!("exit {code}") },
            ..ProcessOutput::default()
        }
    }

    fn outcome(stage: Stage, code: i32) -> PipelineOutcome {
        PipelineOutcome::from_invocation(stage, Invocation::Completed(exited(code)))
    }

    fn timed_out(stage: Stage) -> PipelineOutcome {
        PipelineOutcome::TimedOut {
            stage,
            after: Duration::from_millis(10),
        }
    }

    #[test]
    fn scenario_a_pass_compiles_links_and_runs() {
        let outcomes = StageOutcomes {
            compile: outcome(Stage::Compile, 0),
            link: Some(outcome(Stage::Link, 0)),
            execute: Some(outcome(Stage::Execute, 0)),
        };
        assert_eq!(
            classify(Expectation::Pass, Category::ExecutionExpecting, &outcomes),
            Verdict::Pass
        );
    }

    #[test]
    fn scenario_b_trap_satisfies_fail() {
        let outcomes = StageOutcomes {
            compile: outcome(Stage::Compile, 0),
            link: Some(outcome(Stage::Link, 0)),
            execute: Some(outcome(Stage::Execute, 134)),
        };
        assert_eq!(
            classify(Expectation::Fail, Category::ExecutionExpecting, &outcomes),
            Verdict::Pass
        );
    }

    #[test]
    fn scenario_c_rejected_compile_short_circuits() {
        for category in [Category::ErrorExpecting, Category::ExecutionExpecting] {
            assert_eq!(
                after_compile(Expectation::Fail, category, &outcome(Stage::Compile, 1)),
                StepDecision::Done(Verdict::Pass)
            );
        }
    }

    #[test]
    fn error_expecting_category_judges_compile_only() {
        let ok = outcome(Stage::Compile, 0);
        assert_eq!(
            after_compile(Expectation::Pass, Category::ErrorExpecting, &ok),
            StepDecision::Done(Verdict::Pass)
        );
        assert_eq!(
            after_compile(Expectation::Fail, Category::ErrorExpecting, &ok),
            StepDecision::Done(Verdict::Fail("expected compile error but succeeded".to_string()))
        );
        assert_eq!(
            after_compile(Expectation::Pass, Category::ExecutionExpecting, &ok),
            StepDecision::Continue
        );
    }

    #[test]
    fn rejected_compile_fails_pass_expectation_with_diagnostic() {
        let rejected = outcome(Stage::Compile, 2);
        let StepDecision::Done(verdict) = after_compile(Expectation::Pass, Category::ErrorExpecting, &rejected) else {
            panic!("expected a decision");
        };
        assert!(verdict.is_failure());
        assert!(verdict.message().is_some_and(|m| m.contains("exit 2")));
    }

    #[test]
    fn compile_timeout_is_never_a_pass() {
        for expectation in [Expectation::Pass, Expectation::Fail] {
            for category in [Category::ErrorExpecting, Category::ExecutionExpecting] {
                let decision = after_compile(expectation, category, &timed_out(Stage::Compile));
                let StepDecision::Done(verdict) = decision else {
                    panic!("timeout must be terminal");
                };
                assert_eq!(verdict, Verdict::Timeout("Compiler timeout after 10 ms".to_string()));
            }
        }
    }

    #[test]
    fn link_failure_always_fails() {
        let outcomes = StageOutcomes {
            compile: outcome(Stage::Compile, 0),
            link: Some(outcome(Stage::Link, 1)),
            execute: None,
        };
        for expectation in [Expectation::Pass, Expectation::Fail] {
            let verdict = classify(expectation, Category::ExecutionExpecting, &outcomes);
            assert!(matches!(&verdict, Verdict::Fail(m) if m.starts_with("link failed")), "{verdict:?}");
        }
    }

    #[test]
    fn execution_verdicts() {
        assert_eq!(
            after_execute(Expectation::Fail, &outcome(Stage::Execute, 0)),
            Verdict::Fail("expected runtime error but succeeded".to_string())
        );
        assert!(after_execute(Expectation::Pass, &outcome(Stage::Execute, 1)).is_failure());
        assert!(matches!(
            after_execute(Expectation::Fail, &timed_out(Stage::Execute)),
            Verdict::Timeout(_)
        ));
    }

    #[test]
    fn wasm_record_without_link_stage() {
        let outcomes = StageOutcomes {
            compile: outcome(Stage::Compile, 0),
            link: None,
            execute: Some(outcome(Stage::Execute, 0)),
        };
        assert_eq!(
            classify(Expectation::Pass, Category::ExecutionExpecting, &outcomes),
            Verdict::Pass
        );
    }

    #[test]
    fn preflight_skip_tag_dominates_expectation() {
        let mut meta = Metadata {
            expectation: Expectation::Pass,
            ..Metadata::default()
        };
        meta.skip_tags.insert(SkipTag::Compiler);
        assert_eq!(
            preflight(&meta, &[SkipTag::Compiler], None),
            Some(Verdict::Skip("Skipped by COMPILER tag".to_string()))
        );

        meta.expectation = Expectation::Unknown;
        assert_eq!(
            preflight(&meta, &[SkipTag::Compiler], None),
            Some(Verdict::Skip("Skipped by COMPILER tag".to_string()))
        );
    }

    #[test]
    fn scenario_d_unknown_expectation_is_skipped() {
        let meta = Metadata::default();
        assert_eq!(
            preflight(&meta, &[SkipTag::Compiler], None),
            Some(Verdict::Skip("No EXPECT tag".to_string()))
        );
    }

    #[test]
    fn preflight_passes_scored_units_through() {
        let meta = Metadata {
            expectation: Expectation::Fail,
            ..Metadata::default()
        };
        assert_eq!(preflight(&meta, &[SkipTag::Compiler, SkipTag::Wasm], None), None);
    }

    #[test]
    fn solver_tokens_are_whole_words() {
        let sat = PipelineOutcome::Completed(ProcessOutput {
            stdout: "Path 1: SAT\n".to_string(),
            ..ProcessOutput::default()
        });
        let unsat = PipelineOutcome::Completed(ProcessOutput {
            stdout: "Path 1: UNSAT\n".to_string(),
            ..ProcessOutput::default()
        });
        assert_eq!(classify_solver(Expectation::Pass, &sat), Verdict::Pass);
        assert!(classify_solver(Expectation::Pass, &unsat).is_failure());
        assert_eq!(classify_solver(Expectation::Fail, &unsat), Verdict::Pass);
        assert!(classify_solver(Expectation::Fail, &sat).is_failure());
        assert_eq!(
            classify_solver(Expectation::Fail, &outcome(Stage::Solve, 1)),
            Verdict::Pass
        );
    }

    #[test]
    fn category_from_path_components() {
        let runnable = ["interp", "compile"];
        assert_eq!(
            Category::of_path(Path::new("test/interp/add.sir"), &runnable),
            Category::ExecutionExpecting
        );
        assert_eq!(
            Category::of_path(Path::new("test/sema/interp.sir"), &runnable),
            Category::ErrorExpecting
        );
        assert_eq!(
            Category::of_path(Path::new("test/interpreter/x.sir"), &runnable),
            Category::ErrorExpecting
        );
    }
}
