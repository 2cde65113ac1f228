//! Runnable-artifact synthesis for compiled units.
//!
//! The compiler turns a unit into backend output (C source or WebAssembly text) that is not runnable on its
//! own: external symbols are unresolved and there is no host entry point. A [`HarnessSynthesizer`] fills in
//! exactly those two gaps for one backend and describes how to turn the result into something that runs.
//!
//! ## Strategies
//!
//! - [`native`]: writes a C stub defining one function per binding plus a `main` wrapper; the stub and the
//!   generated C are linked by the host C compiler.
//! - [`wat`]: patches the emitted WebAssembly text in place, replacing bound imports with constant-returning
//!   local functions and exporting a wrapper around the entry; the module runs under `wasmtime` or `wasmer`.
//!
//! The strategy is picked once per run from `--target`.

pub mod native;
pub mod wat;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bindings::SymbolBindings;
use crate::infer::SirTypeInfo;
use crate::process::CommandLine;

pub use native::{NativeAbi, NativeSynthesizer};
pub use wat::{BytecodeRuntime, RuntimeKind, WatSynthesizer};

/// Backend the compiler is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    C,
    Wasm,
}

impl Target {
    /// Value passed to the compiler's `--target` flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Target::C => "c",
            Target::Wasm => "wasm",
        }
    }

    /// Extension of the compiler's output file.
    pub fn output_extension(self) -> &'static str {
        match self {
            Target::C => "c",
            Target::Wasm => "wat",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while producing harness files.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to read backend output {}: {source}", path.display())]
    ReadOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write harness file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no {target} runtime available")]
    RuntimeUnavailable { target: Target },
}

/// Everything a strategy needs to synthesize a harness for one unit.
#[derive(Debug, Clone, Copy)]
pub struct HarnessRequest<'a> {
    /// Entry function name as nominated by the run (sigil optional).
    pub entry: &'a str,
    pub bindings: &'a SymbolBindings,
    pub types: &'a SirTypeInfo,
    /// File the compiler wrote.
    pub backend_output: &'a Path,
    /// Directory for generated files.
    pub scratch: &'a Path,
    /// Unit-unique file stem inside `scratch`.
    pub unit_key: &'a str,
}

impl HarnessRequest<'_> {
    fn scratch_file(&self, suffix: &str) -> PathBuf {
        self.scratch.join(format!("{}{}", self.unit_key, suffix))
    }
}

/// A synthesized harness: an optional link step followed by the command that runs the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedHarness {
    /// The generated stub or patched module.
    pub generated: PathBuf,
    /// Secondary toolchain invocation producing the executable, if the backend needs one.
    pub link: Option<CommandLine>,
    /// Command that executes the artifact.
    pub run: CommandLine,
}

/// The closed set of synthesis strategies.
#[derive(Debug, Clone)]
pub enum HarnessSynthesizer {
    Native(NativeSynthesizer),
    Wat(WatSynthesizer),
}

impl HarnessSynthesizer {
    pub fn target(&self) -> Target {
        match self {
            HarnessSynthesizer::Native(_) => Target::C,
            HarnessSynthesizer::Wat(_) => Target::Wasm,
        }
    }

    /// Whether the strategy can run anything on this host.
    pub fn runtime_available(&self) -> bool {
        match self {
            HarnessSynthesizer::Native(_) => true,
            HarnessSynthesizer::Wat(w) => w.runtime().is_some(),
        }
    }

    pub fn synthesize(&self, request: &HarnessRequest<'_>) -> Result<PreparedHarness, HarnessError> {
        match self {
            HarnessSynthesizer::Native(n) => n.synthesize(request),
            HarnessSynthesizer::Wat(w) => w.synthesize(request),
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), HarnessError> {
    std::fs::write(path, contents).map_err(|source| HarnessError::Write {
        path: path.to_path_buf(),
        source,
    })
}
