#![forbid(unsafe_code)]
//! SIR Conformance Harness
//!
//! Drives the SIR compiler, interpreter and solver over a corpus of annotated `.sir` units and classifies
//! each outcome against the expectation the unit declares in its header. For runnable units the compiler
//! pipeline synthesizes the scaffolding the backend output lacks (bound symbol values, a host entry point),
//! builds it, and runs it.
//!
//! ## Layout
//!
//! - [`metadata`], [`bindings`], [`infer`]: what a unit says about itself.
//! - [`process`]: bounded-time external commands.
//! - [`harness`]: native C stub and WebAssembly-text patch synthesis.
//! - [`verdict`]: pure classification of stage outcomes.
//! - [`pipeline`]: compiler, interpreter and solver pipelines.
//! - [`suite`]: discovery, scratch directory, reporting.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents a harness bug (logic error), use `.expect("INVARIANT: reason")` with
//!   a clear explanation.

pub mod bindings;
pub mod cli;
pub mod error;
pub mod harness;
pub mod infer;
pub mod metadata;
pub mod pipeline;
pub mod process;
pub mod suite;
pub mod verdict;
pub mod version;

pub use error::{SkipReason, SuiteError, UnitFailure};
pub use harness::{HarnessSynthesizer, Target};
pub use metadata::{Expectation, Metadata};
pub use suite::{SuiteOptions, SuiteSummary, TestUnit, run_suite};
pub use verdict::Verdict;
