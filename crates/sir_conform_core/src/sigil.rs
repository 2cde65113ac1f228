//! Sigil handling for SIR names.
//!
//! SIR names carry a leading namespace marker: `@` for functions, `%` for locals and symbols, `^` for
//! blocks. Symbolic names add a `?` right after the marker (`%?x`). Backends drop these markers when they
//! derive host-level identifiers, so the harness has to do the same before matching names.

/// Leading markers recognized as sigils.
pub const SIGILS: &[char] = &['@', '%', '^'];

/// Qualifier that may follow a sigil.
pub const SYMBOLIC_QUALIFIER: char = '?';

/// Strip a leading sigil (and an optional `?` right after it) from a name.
///
/// ## Notes
/// - Total: names without a sigil are returned unchanged.
/// - Idempotent on SIR identifiers: an identifier body never starts with a sigil, so stripping a stripped
///   name is a no-op. Only one marker is removed per call (`@@x` becomes `@x`), exactly like the backends.
///
/// ## Examples
/// ```rust
/// use sir_conform_core::strip_sigil;
///
/// assert_eq!(strip_sigil("%?x"), "x");
/// assert_eq!(strip_sigil("@main"), "main");
/// assert_eq!(strip_sigil("x"), "x");
/// ```
pub fn strip_sigil(name: &str) -> &str {
    let Some(rest) = name.strip_prefix(SIGILS) else {
        return name;
    };
    rest.strip_prefix(SYMBOLIC_QUALIFIER).unwrap_or(rest)
}
