//! Symbol bindings declared through `--sym name=value` arguments.
//!
//! A binding supplies the literal value a runnable unit's unresolved external symbol should evaluate to.
//! Keys are stored sigil-stripped, so `%?a`, `@a` and `a` all bind the same symbol.

use std::collections::BTreeMap;

use sir_conform_core::strip_sigil;

const SYM_FLAG: &str = "--sym";

/// One bound symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Sigil-stripped symbol name.
    pub name: String,
    /// Numeric literal, exactly as written in the header.
    pub value: String,
}

/// All bindings for a unit, ordered by stripped name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolBindings {
    by_name: BTreeMap<String, String>,
}

impl SymbolBindings {
    /// Collect bindings from an argument list.
    ///
    /// Accepts both `--sym name=value` and `--sym=name=value`. When the same stripped name is bound more than
    /// once, the **last** occurrence in argument order wins. Values that are not numeric literals are dropped
    /// with a warning; other arguments are ignored.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> SymbolBindings {
        let mut bindings = SymbolBindings::default();
        let mut iter = args.iter().map(AsRef::as_ref);

        while let Some(arg) = iter.next() {
            let spec = if arg == SYM_FLAG {
                match iter.next() {
                    Some(next) => next,
                    None => break,
                }
            } else if let Some(inline) = arg.strip_prefix("--sym=") {
                inline
            } else {
                continue;
            };

            let Some((key, value)) = spec.split_once('=') else {
                tracing::warn!(binding = spec, "ignoring --sym without `=`");
                continue;
            };
            if !is_numeric_literal(value) {
                tracing::warn!(binding = spec, "ignoring --sym with a non-numeric value");
                continue;
            }
            bindings.insert(key, value);
        }

        bindings
    }

    /// Bind `name` (sigils allowed) to `value`, replacing any earlier binding.
    pub fn insert(&mut self, name: &str, value: &str) {
        self.by_name.insert(strip_sigil(name).to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name.get(strip_sigil(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Binding> + '_ {
        self.by_name.iter().map(|(name, value)| Binding {
            name: name.clone(),
            value: value.clone(),
        })
    }
}

/// Integer or decimal float literal, optionally signed. No `inf`/`nan`, no hex.
fn is_numeric_literal(value: &str) -> bool {
    if value.parse::<i128>().is_ok() {
        return true;
    }
    let digits_only = value.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    digits_only && value.chars().any(|c| c.is_ascii_digit()) && value.parse::<f64>().is_ok()
}
