//! Error and outcome taxonomy.
//!
//! Two very different kinds of "error" live here:
//!
//! - [`UnitFailure`] and [`SkipReason`] describe what happened to *one* unit. They never escape the unit's
//!   pipeline; their `Display` text becomes the message attached to a FAIL/TIMEOUT/SKIP verdict.
//! - [`SuiteError`] is fatal for the whole run (missing test root, unusable toolchain, scratch directory
//!   cannot be created) and is rendered by the CLI through `miette`.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use sir_conform_core::SkipTag;
use thiserror::Error;

use crate::harness::{HarnessError, Target};
use crate::metadata::Expectation;
use crate::process::InvokeError;

/// Why a scored unit failed.
#[derive(Debug, Error)]
pub enum UnitFailure {
    /// The primary toolchain rejected a unit that was expected to compile.
    #[error("compiler failed (exit {exit_code}):\n{stderr}")]
    ToolchainRejected { exit_code: i32, stderr: String },

    /// The primary toolchain accepted a unit that was expected to be rejected.
    #[error("expected compile error but succeeded")]
    UnexpectedAcceptance,

    #[error("link failed (exit {exit_code}):\n{stderr}")]
    LinkFailed { exit_code: i32, stderr: String },

    /// The artifact (or interpreter) exited non-zero where success was expected.
    #[error("runtime error (code {exit_code}):\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    ExecutionFailed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// The artifact (or interpreter) exited zero where a failure was expected.
    #[error("expected runtime error but succeeded")]
    UnexpectedSuccess,

    #[error("solver verdict does not match EXPECT: {}\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}", expected.as_str())]
    SolverMismatch {
        expected: Expectation,
        stdout: String,
        stderr: String,
    },

    #[error("failed to read unit {}: {source}", path.display())]
    ReadUnit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("harness synthesis failed: {0}")]
    Harness(#[from] HarnessError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// Why a unit was not scored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("No EXPECT tag")]
    DirectiveAbsent,

    #[error("Skipped by {0} tag")]
    SkipTag(SkipTag),

    #[error("No {target} runtime found ({candidates})")]
    RuntimeUnavailable { target: Target, candidates: String },
}

/// Fatal, run-level errors.
#[derive(Debug, Error, Diagnostic)]
pub enum SuiteError {
    #[error("test root {} does not exist or is not a directory", path.display())]
    #[diagnostic(code(sir_conform::missing_test_root), help("pass the directory that contains the .sir units"))]
    MissingTestRoot { path: PathBuf },

    #[error("failed to walk {}: {source}", path.display())]
    #[diagnostic(code(sir_conform::discovery))]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("tool `{}` not found", program.display())]
    #[diagnostic(
        code(sir_conform::missing_tool),
        help("pass a path to an existing executable or make sure it is on PATH")
    )]
    MissingTool { program: PathBuf },

    #[error("failed to create scratch directory {}: {source}", path.display())]
    #[diagnostic(code(sir_conform::scratch), help("use --scratch-dir to pick a writable location"))]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_messages() {
        assert_eq!(SkipReason::DirectiveAbsent.to_string(), "No EXPECT tag");
        assert_eq!(SkipReason::SkipTag(SkipTag::Wasm).to_string(), "Skipped by WASM tag");
        let reason = SkipReason::RuntimeUnavailable {
            target: Target::Wasm,
            candidates: "wasmtime or wasmer".to_string(),
        };
        assert_eq!(reason.to_string(), "No wasm runtime found (wasmtime or wasmer)");
    }

    #[test]
    fn failure_messages_carry_diagnostics() {
        let failure = UnitFailure::ToolchainRejected {
            exit_code: 1,
            stderr: "error: unknown type".to_string(),
        };
        assert_eq!(failure.to_string(), "compiler failed (exit 1):\nerror: unknown type");
        assert_eq!(
            UnitFailure::UnexpectedAcceptance.to_string(),
            "expected compile error but succeeded"
        );
    }

    #[test]
    fn suite_errors_have_codes() {
        let err = SuiteError::MissingTool {
            program: PathBuf::from("symirc"),
        };
        assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some("sir_conform::missing_tool"));
        assert!(err.help().is_some());
    }
}
