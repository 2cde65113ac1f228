//! Solver pipeline.

use std::time::Duration;

use sir_conform_core::{ArgScope, SkipTag};

use super::{UnitContext, UnitPipeline, invoke_stage};
use crate::error::UnitFailure;
use crate::process::CommandLine;
use crate::suite::TestUnit;
use crate::verdict::{Stage, Verdict, classify_solver};

pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_secs(10);

const SKIP_TAGS: &[SkipTag] = &[SkipTag::Solver];

/// Runs `<solver> <unit> [ARGS] [SOLVER_ARGS]` and judges the SAT/UNSAT verdict it prints.
#[derive(Debug, Clone)]
pub struct SolverPipeline {
    pub solver: CommandLine,
    pub timeout: Duration,
}

impl SolverPipeline {
    pub fn new(solver: CommandLine) -> Self {
        Self {
            solver,
            timeout: DEFAULT_SOLVER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl UnitPipeline for SolverPipeline {
    fn name(&self) -> &'static str {
        "solve"
    }

    fn skip_tags(&self) -> &[SkipTag] {
        SKIP_TAGS
    }

    fn execute(&self, unit: &TestUnit, cx: &UnitContext<'_>) -> Result<Verdict, UnitFailure> {
        let command = self
            .solver
            .clone()
            .arg(&unit.path)
            .args(unit.metadata.args_for(&[ArgScope::General, ArgScope::Solver]));
        let outcome = invoke_stage(cx, Stage::Solve, &command, self.timeout)?;
        Ok(classify_solver(unit.metadata.expectation, &outcome))
    }
}
