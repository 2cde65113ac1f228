//! Interpreter pipeline.
//!
//! The interpreter is judged like an executed artifact: exit code 0 satisfies PASS, anything else
//! satisfies FAIL.

use std::time::Duration;

use sir_conform_core::{ArgScope, SkipTag};

use super::{UnitContext, UnitPipeline, invoke_stage};
use crate::error::UnitFailure;
use crate::process::CommandLine;
use crate::suite::TestUnit;
use crate::verdict::{Stage, Verdict, after_execute};

pub const DEFAULT_INTERP_TIMEOUT: Duration = Duration::from_secs(5);

const SKIP_TAGS: &[SkipTag] = &[SkipTag::Interpreter];

/// Runs `<command...> <unit> [ARGS] [INTERP_ARGS]`.
#[derive(Debug, Clone)]
pub struct InterpPipeline {
    pub command: CommandLine,
    pub timeout: Duration,
}

impl InterpPipeline {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            timeout: DEFAULT_INTERP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl UnitPipeline for InterpPipeline {
    fn name(&self) -> &'static str {
        "interp"
    }

    fn skip_tags(&self) -> &[SkipTag] {
        SKIP_TAGS
    }

    fn execute(&self, unit: &TestUnit, cx: &UnitContext<'_>) -> Result<Verdict, UnitFailure> {
        let command = self
            .command
            .clone()
            .arg(&unit.path)
            .args(unit.metadata.args_for(&[ArgScope::General, ArgScope::Interpreter]));
        let outcome = invoke_stage(cx, Stage::Interpret, &command, self.timeout)?;
        Ok(after_execute(unit.metadata.expectation, &outcome))
    }
}
