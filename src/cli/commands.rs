//! CLI command implementations
//!
//! Each command materializes its pipeline from the parsed arguments and hands it to the suite runner. All
//! functions return `CliResult<ExitCode>`; run-level errors are rendered through `miette`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{CliError, CliResult, CompileArgs, ExitCode, ReportFormat, SuiteArgs};
use crate::error::SuiteError;
use crate::harness::native::{NativeAbi, NativeSynthesizer};
use crate::harness::wat::WatSynthesizer;
use crate::harness::{HarnessSynthesizer, Target};
use crate::pipeline::{CompilerConfig, CompilerPipeline, InterpPipeline, SolverPipeline, Timeouts, UnitPipeline};
use crate::process::{CommandLine, SystemInvoker, resolve_program};
use crate::suite::{ConsoleReporter, JsonReporter, SuiteOptions, TestReporter, run_suite};

/// Run the compiler pipeline (the default command).
pub fn run_compiler_suite(
    test_dir: &Path,
    toolchain: &Path,
    args: &CompileArgs,
    suite: &SuiteArgs,
) -> CliResult<ExitCode> {
    let toolchain = CommandLine::new(resolve_tool(toolchain)?);
    let pipeline = CompilerPipeline::new(toolchain, synthesizer(args), compiler_config(args));
    tracing::info!(target_backend = %pipeline.target(), "compiler suite");
    drive(test_dir, &pipeline, suite)
}

/// Run the interpreter pipeline.
pub fn run_interp_suite(
    test_dir: &Path,
    command: &[String],
    timeout_ms: u64,
    suite: &SuiteArgs,
) -> CliResult<ExitCode> {
    let Some((program, rest)) = command.split_first() else {
        return Err(CliError::failure("interp requires an interpreter command"));
    };
    let command = CommandLine::new(resolve_tool(Path::new(program))?).args(rest);
    let pipeline = InterpPipeline::new(command).with_timeout(Duration::from_millis(timeout_ms));
    drive(test_dir, &pipeline, suite)
}

/// Run the solver pipeline.
pub fn run_solver_suite(test_dir: &Path, solver: &Path, timeout_ms: u64, suite: &SuiteArgs) -> CliResult<ExitCode> {
    let solver = CommandLine::new(resolve_tool(solver)?);
    let pipeline = SolverPipeline::new(solver).with_timeout(Duration::from_millis(timeout_ms));
    drive(test_dir, &pipeline, suite)
}

/// Build the harness strategy for the selected target.
pub fn synthesizer(args: &CompileArgs) -> HarnessSynthesizer {
    match Target::from(args.target) {
        Target::C => {
            let mut native = NativeSynthesizer::new(CommandLine::new(&args.cc))
                .with_abi(NativeAbi::default().with_symbol_prefix(args.symbol_prefix.as_str()));
            if !args.cc_flags.is_empty() {
                native = native.with_flags(args.cc_flags.clone());
            }
            HarnessSynthesizer::Native(native)
        }
        Target::Wasm => HarnessSynthesizer::Wat(WatSynthesizer::discover()),
    }
}

pub fn compiler_config(args: &CompileArgs) -> CompilerConfig {
    let mut config = CompilerConfig::default()
        .with_entry(args.entry.as_str())
        .with_timeouts(Timeouts {
            compile: Duration::from_millis(args.compile_timeout_ms),
            link: Duration::from_millis(args.link_timeout_ms),
            run: Duration::from_millis(args.run_timeout_ms),
        });
    if !args.run_categories.is_empty() {
        config = config.with_run_categories(args.run_categories.clone());
    }
    config
}

fn drive(test_dir: &Path, pipeline: &dyn UnitPipeline, suite: &SuiteArgs) -> CliResult<ExitCode> {
    let options = SuiteOptions::default()
        .with_scratch_dir(suite.scratch_dir.clone())
        .with_keep_scratch(suite.keep_scratch);
    let mut reporter: Box<dyn TestReporter> = match suite.format {
        ReportFormat::Console => Box::new(ConsoleReporter::new(suite.verbose)),
        ReportFormat::Json => Box::new(JsonReporter),
    };

    let summary = run_suite(test_dir, pipeline, &SystemInvoker, reporter.as_mut(), &options).map_err(render)?;
    Ok(if summary.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn resolve_tool(program: &Path) -> CliResult<PathBuf> {
    resolve_program(program).ok_or_else(|| {
        render(SuiteError::MissingTool {
            program: program.to_path_buf(),
        })
    })
}

fn render(err: SuiteError) -> CliError {
    CliError::failure(format!("{:?}", miette::Report::new(err)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["sir-conform", "test", "symirc"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn default_native_synthesizer() {
        let cli = parse(&[]);
        let HarnessSynthesizer::Native(native) = synthesizer(&cli.compile) else {
            panic!("expected the native strategy");
        };
        assert_eq!(native.cc, CommandLine::new("gcc"));
        assert_eq!(native.flags, ["-w", "-fsanitize=address,undefined", "-g"]);
        assert_eq!(native.abi, NativeAbi::default());
    }

    #[test]
    fn cc_flags_and_prefix_override_defaults() {
        let cli = parse(&["--cc", "clang", "--cc-flag", "-O1", "--symbol-prefix", ""]);
        let HarnessSynthesizer::Native(native) = synthesizer(&cli.compile) else {
            panic!("expected the native strategy");
        };
        assert_eq!(native.cc, CommandLine::new("clang"));
        assert_eq!(native.flags, ["-O1"]);
        assert_eq!(native.abi.mangle("@main"), "main");
    }

    #[test]
    fn wasm_target_selects_patching_strategy() {
        let cli = parse(&["--target", "wasm"]);
        assert_eq!(synthesizer(&cli.compile).target(), Target::Wasm);
    }

    #[test]
    fn config_from_args() {
        let config = compiler_config(&parse(&["--entry", "@start", "--run-timeout-ms", "50"]).compile);
        assert_eq!(config.entry, "@start");
        assert_eq!(config.timeouts.run, Duration::from_millis(50));
        assert_eq!(config.timeouts.compile, Duration::from_secs(10));
        assert_eq!(config.run_categories, ["interp", "compile"]);

        let config = compiler_config(&parse(&["--run-category", "exec"]).compile);
        assert_eq!(config.run_categories, ["exec"]);
    }

    #[test]
    fn missing_tool_is_rendered_with_its_code() {
        let err = resolve_tool(Path::new("/nonexistent/symirc")).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("sir_conform::missing_tool"), "{}", err.message);
        assert!(err.message.contains("/nonexistent/symirc"));
    }
}
