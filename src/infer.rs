//! Best-effort type extraction from SIR source text.
//!
//! Harness synthesis needs two facts the unit never states in a machine-readable header: the return type of
//! the entry function and the type of each external symbol. Both are pulled out of the source with two line
//! patterns; this is deliberately **not** a parser.
//!
//! ## Recognized shapes
//!
//! - Entry declaration: `fun @<entry>(<params>) : <ty>`, or the same without the colon. `<ty>` must be one
//!   of `i32`, `i64`, `f32`, `f64`; anything else keeps the default.
//! - Symbol declaration: `sym <sigil><name> : value <ty>` or `sym <sigil><name> : index <ty>`, where the
//!   sigil is `@`, `%` or `^` with an optional `?`. Custom integer widths are lowered the way the backends
//!   store them (see [`ValueType::lowered`]).
//!
//! Line comments (`// ...`) are removed before matching. A miss on either pattern is not an error: the entry
//! defaults to `i32` and unknown symbols read as `i32`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use sir_conform_core::{ValueType, strip_sigil};

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\n]*").expect("INVARIANT: line comment pattern is valid"));

static SYM_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bsym\s+([@%^]?\??[A-Za-z_][A-Za-z0-9_]*)\s*:\s*(?:value|index)\s+([a-z][a-z0-9]*)")
        .expect("INVARIANT: symbol declaration pattern is valid")
});

/// Types recovered from a unit's source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SirTypeInfo {
    pub entry_return: ValueType,
    /// Stripped symbol name to its lowered type.
    pub symbol_types: BTreeMap<String, ValueType>,
}

impl SirTypeInfo {
    /// Type of a symbol, `i32` when it was never declared in a recognized shape.
    pub fn symbol_type(&self, name: &str) -> ValueType {
        self.symbol_types
            .get(strip_sigil(name))
            .copied()
            .unwrap_or_default()
    }
}

/// Infer entry return type and symbol types for `entry` (sigil optional) from `source`.
#[tracing::instrument(skip_all, fields(entry = entry, source_len = source.len()))]
pub fn infer_types(source: &str, entry: &str) -> SirTypeInfo {
    let code = LINE_COMMENT.replace_all(source, "");
    let mut info = SirTypeInfo::default();

    match entry_return_type(&code, strip_sigil(entry)) {
        Some(ty) => info.entry_return = ty,
        None => tracing::debug!("no typed entry declaration found; defaulting to i32"),
    }

    for caps in SYM_DECL.captures_iter(&code) {
        let name = strip_sigil(&caps[1]).to_string();
        info.symbol_types.insert(name, ValueType::lowered(&caps[2]));
    }
    if info.symbol_types.is_empty() {
        tracing::debug!("no symbol declarations found");
    }

    info
}

fn entry_return_type(code: &str, entry: &str) -> Option<ValueType> {
    let name = regex::escape(entry);
    let with_colon = format!(r"fun\s+@{name}\s*\([^)]*\)\s*:\s*([a-z0-9]+)");
    let bare = format!(r"fun\s+@{name}\s*\([^)]*\)\s+([a-z0-9]+)");

    [with_colon, bare].iter().find_map(|pattern| {
        let re = Regex::new(pattern).ok()?;
        let caps = re.captures(code)?;
        Some(ValueType::from_exact(&caps[1]).unwrap_or_default())
    })
}
