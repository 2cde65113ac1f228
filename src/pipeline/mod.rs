//! Per-unit pipelines.
//!
//! A pipeline drives one unit through the external tools of one toolchain component and produces exactly
//! one [`Verdict`]. Three exist:
//!
//! - [`compiler::CompilerPipeline`]: compile, then (for runnable categories) synthesize a harness, link,
//!   and execute.
//! - [`interp::InterpPipeline`]: run the interpreter on the unit.
//! - [`solver::SolverPipeline`]: run the solver on the unit and read its SAT/UNSAT verdict.
//!
//! [`run_unit`] is the only entry point the suite uses. It applies the shared preflight rules (skip tags,
//! missing expectation, missing runtime) and turns any [`UnitFailure`] a pipeline propagates into a FAIL, so
//! nothing a single unit does can abort the run.

pub mod compiler;
pub mod interp;
pub mod solver;

use std::path::Path;
use std::time::Duration;

use sir_conform_core::SkipTag;

use crate::error::{SkipReason, UnitFailure};
use crate::process::{CommandLine, ProcessInvoker};
use crate::suite::TestUnit;
use crate::verdict::{PipelineOutcome, Stage, Verdict, preflight};

pub use compiler::{CompilerConfig, CompilerPipeline, Timeouts};
pub use interp::InterpPipeline;
pub use solver::SolverPipeline;

/// Shared resources a pipeline may use while running one unit.
#[derive(Clone, Copy)]
pub struct UnitContext<'a> {
    /// Directory for generated files; names inside it are derived from [`TestUnit::key`].
    pub scratch: &'a Path,
    pub invoker: &'a dyn ProcessInvoker,
}

/// One way of judging a unit.
pub trait UnitPipeline {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Skip tags that exclude a unit from this pipeline.
    fn skip_tags(&self) -> &[SkipTag];

    /// Reason every unit is skipped because an optional runtime is missing on this host.
    fn missing_runtime(&self) -> Option<SkipReason> {
        None
    }

    /// Run a scored unit. Preflight has already passed.
    fn execute(&self, unit: &TestUnit, cx: &UnitContext<'_>) -> Result<Verdict, UnitFailure>;
}

/// Produce the verdict for one unit.
#[tracing::instrument(skip_all, fields(pipeline = pipeline.name(), unit = %unit.path.display()))]
pub fn run_unit(pipeline: &dyn UnitPipeline, unit: &TestUnit, cx: &UnitContext<'_>) -> Verdict {
    if let Some(skip) = preflight(&unit.metadata, pipeline.skip_tags(), pipeline.missing_runtime()) {
        return skip;
    }
    match pipeline.execute(unit, cx) {
        Ok(verdict) => verdict,
        Err(failure) => {
            tracing::debug!(%failure, "unit pipeline failed");
            Verdict::fail(failure)
        }
    }
}

/// Run one stage command and classify its process outcome.
fn invoke_stage(
    cx: &UnitContext<'_>,
    stage: Stage,
    command: &CommandLine,
    timeout: Duration,
) -> Result<PipelineOutcome, UnitFailure> {
    let invocation = cx.invoker.invoke(command, timeout)?;
    Ok(PipelineOutcome::from_invocation(stage, invocation))
}
