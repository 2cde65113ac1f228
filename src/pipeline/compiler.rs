//! Compiler pipeline: compile, synthesize a harness, link, execute.

use std::path::Path;
use std::time::Duration;

use sir_conform_core::{ArgScope, DEFAULT_ENTRY, SkipTag};

use super::{UnitContext, UnitPipeline, invoke_stage};
use crate::bindings::SymbolBindings;
use crate::error::{SkipReason, UnitFailure};
use crate::harness::wat::RUNTIME_PREFERENCE;
use crate::harness::{HarnessError, HarnessRequest, HarnessSynthesizer, Target};
use crate::infer::infer_types;
use crate::process::CommandLine;
use crate::suite::TestUnit;
use crate::verdict::{Category, Stage, StepDecision, Verdict, after_compile, after_execute, after_link};

/// Directory names whose units must be executed, not just compiled.
pub const DEFAULT_RUN_CATEGORIES: &[&str] = &["interp", "compile"];

const C_SKIP_TAGS: &[SkipTag] = &[SkipTag::Compiler];
const WASM_SKIP_TAGS: &[SkipTag] = &[SkipTag::Compiler, SkipTag::Wasm];

/// Wall-clock bounds per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub compile: Duration,
    pub link: Duration,
    pub run: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            compile: Duration::from_secs(10),
            link: Duration::from_secs(10),
            run: Duration::from_secs(2),
        }
    }
}

/// Settings of a compiler-pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Entry function the harness calls (sigil optional).
    pub entry: String,
    pub run_categories: Vec<String>,
    pub timeouts: Timeouts,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY.to_string(),
            run_categories: DEFAULT_RUN_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            timeouts: Timeouts::default(),
        }
    }
}

impl CompilerConfig {
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn with_run_categories(mut self, categories: Vec<String>) -> Self {
        self.run_categories = categories;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// Drives the SIR compiler for one backend.
#[derive(Debug, Clone)]
pub struct CompilerPipeline {
    pub toolchain: CommandLine,
    pub synthesizer: HarnessSynthesizer,
    pub config: CompilerConfig,
}

impl CompilerPipeline {
    pub fn new(toolchain: CommandLine, synthesizer: HarnessSynthesizer, config: CompilerConfig) -> Self {
        Self {
            toolchain,
            synthesizer,
            config,
        }
    }

    pub fn target(&self) -> Target {
        self.synthesizer.target()
    }

    /// `<toolchain> <unit> --target <t> -o <out> -w [--no-module-tags] [COMPILER_ARGS]`
    fn compile_command(&self, unit: &TestUnit, output: &Path) -> CommandLine {
        let target = self.target();
        let mut command = self
            .toolchain
            .clone()
            .arg(&unit.path)
            .args(["--target", target.as_str(), "-o"])
            .arg(output)
            .arg("-w");
        if target == Target::Wasm {
            command = command.arg("--no-module-tags");
        }
        command.args(unit.metadata.args(ArgScope::Compiler))
    }

    fn runtime_skip(&self) -> SkipReason {
        let candidates: Vec<_> = RUNTIME_PREFERENCE.iter().map(|k| k.binary_name()).collect();
        SkipReason::RuntimeUnavailable {
            target: self.target(),
            candidates: candidates.join(" or "),
        }
    }
}

impl UnitPipeline for CompilerPipeline {
    fn name(&self) -> &'static str {
        match self.target() {
            Target::C => "compile-c",
            Target::Wasm => "compile-wasm",
        }
    }

    fn skip_tags(&self) -> &[SkipTag] {
        match self.target() {
            Target::C => C_SKIP_TAGS,
            Target::Wasm => WASM_SKIP_TAGS,
        }
    }

    fn missing_runtime(&self) -> Option<SkipReason> {
        (!self.synthesizer.runtime_available()).then(|| self.runtime_skip())
    }

    fn execute(&self, unit: &TestUnit, cx: &UnitContext<'_>) -> Result<Verdict, UnitFailure> {
        let expectation = unit.metadata.expectation;
        let timeouts = self.config.timeouts;
        let category = Category::of_path(&unit.relative_path, &self.config.run_categories);

        let backend_output = cx
            .scratch
            .join(format!("{}.{}", unit.key, self.target().output_extension()));
        let compile = self.compile_command(unit, &backend_output);
        let compiled = invoke_stage(cx, Stage::Compile, &compile, timeouts.compile)?;
        if let StepDecision::Done(verdict) = after_compile(expectation, category, &compiled) {
            return Ok(verdict);
        }

        let source = std::fs::read_to_string(&unit.path).map_err(|source| UnitFailure::ReadUnit {
            path: unit.path.clone(),
            source,
        })?;
        let types = infer_types(&source, &self.config.entry);
        let bindings = SymbolBindings::parse(&unit.metadata.args_for(&[ArgScope::General, ArgScope::Compiler]));

        let request = HarnessRequest {
            entry: &self.config.entry,
            bindings: &bindings,
            types: &types,
            backend_output: &backend_output,
            scratch: cx.scratch,
            unit_key: &unit.key,
        };
        let prepared = match self.synthesizer.synthesize(&request) {
            Ok(prepared) => prepared,
            Err(HarnessError::RuntimeUnavailable { .. }) => return Ok(Verdict::skip(self.runtime_skip())),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(generated = %prepared.generated.display(), "harness synthesized");

        if let Some(link) = &prepared.link {
            let linked = invoke_stage(cx, Stage::Link, link, timeouts.link)?;
            if let StepDecision::Done(verdict) = after_link(&linked) {
                return Ok(verdict);
            }
        }

        let executed = invoke_stage(cx, Stage::Execute, &prepared.run, timeouts.run)?;
        Ok(after_execute(expectation, &executed))
    }
}
