//! CLI module for the SIR conformance harness
//!
//! ## Commands
//!
//! - `<TEST_DIR> <TOOLCHAIN> [--target c|wasm]` - Run the compiler pipeline over every unit (default form)
//! - `interp <TEST_DIR> <CMD>...` - Run the interpreter over every unit
//! - `solve <TEST_DIR> <SOLVER>` - Run the solver over every unit
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::harness::Target;
use crate::version::SIR_CONFORM_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Conformance-test harness for the SIR toolchain
#[derive(Parser, Debug)]
#[command(name = "sir-conform")]
#[command(version = SIR_CONFORM_VERSION)]
#[command(about = "Conformance-test harness for the SIR compiler, interpreter and solver", long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory containing the .sir units
    #[arg(value_name = "TEST_DIR", required = true)]
    pub test_dir: Option<PathBuf>,

    /// SIR compiler executable
    #[arg(value_name = "TOOLCHAIN", required = true)]
    pub toolchain: Option<PathBuf>,

    #[command(flatten)]
    pub compile: CompileArgs,

    #[command(flatten)]
    pub suite: SuiteArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the interpreter over every unit
    Interp {
        /// Directory containing the .sir units
        #[arg(value_name = "TEST_DIR")]
        test_dir: PathBuf,
        /// Interpreter command line; the unit path and its arguments are appended
        #[arg(
            value_name = "CMD",
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<String>,
        /// Per-unit timeout in milliseconds
        #[arg(long = "timeout-ms", value_name = "MS", default_value_t = 5000)]
        timeout_ms: u64,
        #[command(flatten)]
        suite: SuiteArgs,
    },

    /// Run the solver over every unit
    Solve {
        /// Directory containing the .sir units
        #[arg(value_name = "TEST_DIR")]
        test_dir: PathBuf,
        /// Solver executable
        #[arg(value_name = "SOLVER")]
        solver: PathBuf,
        /// Per-unit timeout in milliseconds
        #[arg(long = "timeout-ms", value_name = "MS", default_value_t = 10000)]
        timeout_ms: u64,
        #[command(flatten)]
        suite: SuiteArgs,
    },
}

/// Backend the compiler is asked to produce.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetArg {
    #[default]
    C,
    Wasm,
}

impl From<TargetArg> for Target {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::C => Target::C,
            TargetArg::Wasm => Target::Wasm,
        }
    }
}

/// Options of the compiler pipeline.
#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Backend to test
    #[arg(long, value_enum, default_value_t = TargetArg::C)]
    pub target: TargetArg,

    /// C compiler used to link the native harness
    #[arg(long, value_name = "PROG", default_value = "gcc")]
    pub cc: PathBuf,

    /// Flag passed to the C compiler (repeatable; replaces the defaults)
    #[arg(long = "cc-flag", value_name = "FLAG", allow_hyphen_values = true)]
    pub cc_flags: Vec<String>,

    /// Identifier prefix the C backend puts on SIR names
    #[arg(
        long = "symbol-prefix",
        value_name = "PREFIX",
        default_value = crate::harness::native::DEFAULT_SYMBOL_PREFIX
    )]
    pub symbol_prefix: String,

    /// Entry function the harness calls
    #[arg(long, value_name = "NAME", default_value = sir_conform_core::DEFAULT_ENTRY)]
    pub entry: String,

    /// Directory name whose units are executed, not just compiled (repeatable; replaces the defaults)
    #[arg(long = "run-category", value_name = "DIR")]
    pub run_categories: Vec<String>,

    /// Compiler timeout in milliseconds
    #[arg(long = "compile-timeout-ms", value_name = "MS", default_value_t = 10000)]
    pub compile_timeout_ms: u64,

    /// Link timeout in milliseconds
    #[arg(long = "link-timeout-ms", value_name = "MS", default_value_t = 10000)]
    pub link_timeout_ms: u64,

    /// Artifact run timeout in milliseconds
    #[arg(long = "run-timeout-ms", value_name = "MS", default_value_t = 2000)]
    pub run_timeout_ms: u64,
}

/// Output format of the suite report.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Console,
    Json,
}

/// Options shared by every suite.
#[derive(Args, Debug, Clone)]
pub struct SuiteArgs {
    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,

    /// Verbose output (per-unit durations)
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory for generated files (default: a fresh temp directory)
    #[arg(long = "scratch-dir", value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Keep generated files even when every unit passed
    #[arg(long = "keep-scratch")]
    pub keep_scratch: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Some(Command::Interp {
            test_dir,
            command,
            timeout_ms,
            suite,
        }) => commands::run_interp_suite(&test_dir, &command, timeout_ms, &suite),
        Some(Command::Solve {
            test_dir,
            solver,
            timeout_ms,
            suite,
        }) => commands::run_solver_suite(&test_dir, &solver, timeout_ms, &suite),
        None => match (cli.test_dir, cli.toolchain) {
            (Some(test_dir), Some(toolchain)) => {
                commands::run_compiler_suite(&test_dir, &toolchain, &cli.compile, &cli.suite)
            }
            _ => Err(CliError::failure("Usage: sir-conform <TEST_DIR> <TOOLCHAIN> [--target c|wasm]")),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_default_form() {
        let cli = Cli::try_parse_from(["sir-conform", "test", "./symirc"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.test_dir, Some(PathBuf::from("test")));
        assert_eq!(cli.toolchain, Some(PathBuf::from("./symirc")));
        assert_eq!(cli.compile.target, TargetArg::C);
        assert_eq!(cli.compile.cc, PathBuf::from("gcc"));
        assert!(cli.compile.cc_flags.is_empty());
        assert_eq!(cli.compile.entry, "main");
        assert_eq!(cli.compile.symbol_prefix, "symir_");
        assert_eq!(cli.compile.run_timeout_ms, 2000);
        assert_eq!(cli.suite.format, ReportFormat::Console);
    }

    #[test]
    fn test_cli_parse_compile_options() {
        let cli = Cli::try_parse_from([
            "sir-conform",
            "test",
            "symirc",
            "--target",
            "wasm",
            "--cc-flag",
            "-O0",
            "--cc-flag=-g",
            "--run-category",
            "exec",
            "--keep-scratch",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.compile.target, TargetArg::Wasm);
        assert_eq!(cli.compile.cc_flags, ["-O0", "-g"]);
        assert_eq!(cli.compile.run_categories, ["exec"]);
        assert!(cli.suite.keep_scratch);
        assert!(cli.suite.verbose);
        assert_eq!(cli.suite.format, ReportFormat::Json);
    }

    #[test]
    fn test_cli_requires_toolchain() {
        assert!(Cli::try_parse_from(["sir-conform", "test"]).is_err());
        assert!(Cli::try_parse_from(["sir-conform", "test", "symirc", "--target", "llvm"]).is_err());
    }

    #[test]
    fn test_cli_parse_interp() {
        let cli = Cli::try_parse_from(["sir-conform", "interp", "test", "symiri", "--trace", "-q"]).unwrap();
        if let Some(Command::Interp {
            test_dir,
            command,
            timeout_ms,
            ..
        }) = cli.command
        {
            assert_eq!(test_dir, PathBuf::from("test"));
            assert_eq!(command, ["symiri", "--trace", "-q"]);
            assert_eq!(timeout_ms, 5000);
        } else {
            panic!("Expected Interp command");
        }
    }

    #[test]
    fn test_cli_parse_solve() {
        let cli = Cli::try_parse_from(["sir-conform", "solve", "--timeout-ms", "250", "test", "symirsolve"]).unwrap();
        if let Some(Command::Solve {
            solver, timeout_ms, ..
        }) = cli.command
        {
            assert_eq!(solver, PathBuf::from("symirsolve"));
            assert_eq!(timeout_ms, 250);
        } else {
            panic!("Expected Solve command");
        }
    }
}
