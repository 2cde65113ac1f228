//! Provide the shared, pure vocabulary of the `sir_conform` harness.
//!
//! This crate is intentionally small and dependency-free. It holds the pieces of the harness that are pure
//! lookups over fixed tables and that several layers need to agree on:
//! - the directive comments a test unit may carry in its header ([`directives`]),
//! - the skip tags naming a subsystem to skip ([`directives::SkipTag`]),
//! - sigil stripping for SIR names ([`sigil`]),
//! - the SIR scalar types the harness knows how to synthesize values for ([`types`]).
//!
//! ## Notes
//!
//! - This is a "vocabulary" crate: **no IO**, no global state, no process handling.

pub mod directives;
pub mod sigil;
pub mod types;

pub use directives::{ArgScope, DirectiveId, SkipTag};
pub use sigil::strip_sigil;
pub use types::ValueType;

/// File extension (without the dot) of SIR test units.
pub const UNIT_EXTENSION: &str = "sir";

/// Default entry function name for runnable units.
pub const DEFAULT_ENTRY: &str = "main";
