//! WebAssembly-text patching for the `wasm` backend.
//!
//! The wasm backend declares each external symbol of function `@f` as a host import:
//!
//! ```text
//! (import "f" "a" (func $f__a (result i64)))
//! ```
//!
//! For a bound symbol the whole declaration is replaced with a local function of the same identifier that
//! returns the bound constant, which resolves the import without a module parser. A wrapper exported as
//! [`HARNESS_EXPORT`] calls the entry so the runtime has a fixed name to invoke.
//!
//! An import for a bound symbol that does not appear in the expected shape is left alone; the runtime then
//! rejects the unresolved import and the unit fails at the execution stage.

use std::path::Path;

use regex::{Captures, Regex};
use sir_conform_core::strip_sigil;

use super::{HarnessError, HarnessRequest, PreparedHarness, Target, write_file};
use crate::bindings::SymbolBindings;
use crate::infer::SirTypeInfo;
use crate::process::{CommandLine, find_in_path};

/// Export name of the synthesized wrapper around the entry function.
///
/// Distinct from any SIR function name so it never collides with the backend's own per-function exports.
pub const HARNESS_EXPORT: &str = "sir_harness_main";

/// Runtimes in preference order.
pub const RUNTIME_PREFERENCE: &[RuntimeKind] = &[RuntimeKind::Wasmtime, RuntimeKind::Wasmer];

/// Known WebAssembly-text runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Wasmtime,
    Wasmer,
}

impl RuntimeKind {
    pub fn binary_name(self) -> &'static str {
        match self {
            RuntimeKind::Wasmtime => "wasmtime",
            RuntimeKind::Wasmer => "wasmer",
        }
    }
}

/// A runtime found on this host (or configured explicitly).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodeRuntime {
    pub kind: RuntimeKind,
    /// Program plus any leading arguments; the run arguments are appended.
    pub command: CommandLine,
}

impl BytecodeRuntime {
    pub fn new(kind: RuntimeKind, command: CommandLine) -> Self {
        Self { kind, command }
    }

    /// First runtime of `preference` found on `PATH`.
    pub fn discover(preference: &[RuntimeKind]) -> Option<Self> {
        preference.iter().find_map(|kind| {
            let path = find_in_path(kind.binary_name().as_ref())?;
            tracing::debug!(runtime = kind.binary_name(), path = %path.display(), "found wasm runtime");
            Some(Self::new(*kind, CommandLine::new(path)))
        })
    }

    /// Command invoking [`HARNESS_EXPORT`] in `module`.
    pub fn run_command(&self, module: &Path) -> CommandLine {
        match self.kind {
            RuntimeKind::Wasmtime => self
                .command
                .clone()
                .args(["run", "--invoke", HARNESS_EXPORT])
                .arg(module),
            RuntimeKind::Wasmer => self
                .command
                .clone()
                .arg("run")
                .arg(module)
                .args(["--invoke", HARNESS_EXPORT]),
        }
    }
}

/// Patch backend output into a runnable module.
///
/// ## Parameters
/// - `module_text`: the backend's output, with or without the enclosing `(module ...)`.
/// - `entry`: entry function name (sigil optional); its identifier is `$<stripped entry>`.
///
/// ## Returns
/// - The complete module text, always enclosed in exactly one `(module ...)`.
pub fn patch_module(module_text: &str, entry: &str, bindings: &SymbolBindings, types: &SirTypeInfo) -> String {
    let mut body = module_text.to_string();

    for binding in bindings.iter() {
        let ty = types.symbol_type(&binding.name).wat_name();
        let pattern = format!(
            r#"\(import\s+"[^"]*"\s+"{}"\s+\(func\s+(\$[^\s)]+)\s+\(result\s+[^\s)]+\)\)\)"#,
            regex::escape(&binding.name)
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if !re.is_match(&body) {
            tracing::warn!(symbol = %binding.name, "no matching import for bound symbol");
            continue;
        }
        body = re
            .replace_all(&body, |caps: &Captures<'_>| {
                format!("(func {} (result {ty}) ({ty}.const {}))", &caps[1], binding.value)
            })
            .into_owned();
    }

    let wrapper = format!(
        "  (func (export \"{HARNESS_EXPORT}\") (result {}) (call ${}))\n",
        types.entry_return.wat_name(),
        strip_sigil(entry)
    );

    let trimmed = body.trim_end();
    match trimmed.strip_suffix(')') {
        Some(inner) if skip_leading_comments(trimmed).starts_with("(module") => {
            format!("{inner}\n{wrapper})\n")
        }
        _ => format!("(module\n{}\n{wrapper})\n", trimmed),
    }
}

/// `text` past leading whitespace, `;;` line comments and `(; ;)` block comments.
fn skip_leading_comments(text: &str) -> &str {
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        if let Some(comment) = rest.strip_prefix(";;") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(comment) = rest.strip_prefix("(;") {
            rest = comment.split_once(";)").map_or("", |(_, tail)| tail);
        } else {
            return rest;
        }
    }
}

/// Bytecode-text strategy: patch the module and hand it to a runtime.
#[derive(Debug, Clone, Default)]
pub struct WatSynthesizer {
    runtime: Option<BytecodeRuntime>,
}

impl WatSynthesizer {
    pub fn new(runtime: Option<BytecodeRuntime>) -> Self {
        Self { runtime }
    }

    /// Use the first runtime of [`RUNTIME_PREFERENCE`] found on `PATH`.
    pub fn discover() -> Self {
        Self::new(BytecodeRuntime::discover(RUNTIME_PREFERENCE))
    }

    pub fn runtime(&self) -> Option<&BytecodeRuntime> {
        self.runtime.as_ref()
    }

    pub fn synthesize(&self, request: &HarnessRequest<'_>) -> Result<PreparedHarness, HarnessError> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or(HarnessError::RuntimeUnavailable { target: Target::Wasm })?;

        let module_text =
            std::fs::read_to_string(request.backend_output).map_err(|source| HarnessError::ReadOutput {
                path: request.backend_output.to_path_buf(),
                source,
            })?;

        let combined = request.scratch_file("_combined.wat");
        write_file(
            &combined,
            &patch_module(&module_text, request.entry, request.bindings, request.types),
        )?;

        Ok(PreparedHarness {
            run: runtime.run_command(&combined),
            generated: combined,
            link: None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sir_conform_core::ValueType;

    const IMPORTS: &str = r#"(import "main" "a" (func $main__a (result i64)))
(import "main" "b" (func $main__b (result i32)))
(memory 1)
(func $main (result i32)
  call $main__a
  drop
  call $main__b
)
(export "main" (func $main))"#;

    fn types_with(sym: &str, ty: ValueType) -> SirTypeInfo {
        let mut t = SirTypeInfo::default();
        t.symbol_types.insert(sym.to_string(), ty);
        t
    }

    #[test]
    fn bound_import_becomes_constant_function() {
        let bindings = SymbolBindings::parse(&["--sym", "%?a=42"]);
        let out = patch_module(IMPORTS, "main", &bindings, &types_with("a", ValueType::I64));

        assert!(out.contains("(func $main__a (result i64) (i64.const 42))"));
        assert!(!out.contains(r#"(import "main" "a""#));
        // Unbound imports stay unresolved.
        assert!(out.contains(r#"(import "main" "b" (func $main__b (result i32)))"#));
    }

    #[test]
    fn symbol_name_must_match_exactly() {
        let text = r#"(import "main" "ab" (func $main__ab (result i32)))"#;
        let bindings = SymbolBindings::parse(&["--sym", "a=1"]);
        let out = patch_module(text, "main", &bindings, &SirTypeInfo::default());
        assert!(out.contains(r#"(import "main" "ab""#));
    }

    #[test]
    fn wraps_bare_body_and_appends_export() {
        let out = patch_module("(memory 1)", "@main", &SymbolBindings::default(), &SirTypeInfo::default());
        assert_eq!(
            out,
            "(module\n(memory 1)\n  (func (export \"sir_harness_main\") (result i32) (call $main))\n)\n"
        );
    }

    #[test]
    fn existing_module_tags_are_not_doubled() {
        let types = SirTypeInfo {
            entry_return: ValueType::I64,
            ..SirTypeInfo::default()
        };
        let out = patch_module("(module\n  (memory 1)\n)\n", "main", &SymbolBindings::default(), &types);
        assert_eq!(out.matches("(module").count(), 1);
        assert!(out.ends_with("  (func (export \"sir_harness_main\") (result i64) (call $main))\n)\n"));
    }

    #[test]
    fn module_after_leading_comments_is_not_doubled() {
        let text = ";; emitted by symirc\n\n(; target: wasm ;)\n(module\n  (memory 1)\n)\n";
        let out = patch_module(text, "main", &SymbolBindings::default(), &SirTypeInfo::default());
        assert_eq!(out.matches("(module").count(), 1);
        assert!(out.starts_with(";; emitted by symirc"));
        assert!(out.ends_with("(call $main))\n)\n"));

        let commented_only = ";; (module\n(memory 1)";
        let out = patch_module(commented_only, "main", &SymbolBindings::default(), &SirTypeInfo::default());
        assert!(out.starts_with("(module\n;; (module"));
    }

    #[test]
    fn runtime_commands_invoke_the_harness_export() {
        let module = Path::new("/tmp/x_combined.wat");
        let wasmtime = BytecodeRuntime::new(RuntimeKind::Wasmtime, CommandLine::new("wasmtime"));
        assert_eq!(
            wasmtime.run_command(module).to_string(),
            "wasmtime run --invoke sir_harness_main /tmp/x_combined.wat"
        );
        let wasmer = BytecodeRuntime::new(RuntimeKind::Wasmer, CommandLine::new("wasmer"));
        assert_eq!(
            wasmer.run_command(module).to_string(),
            "wasmer run /tmp/x_combined.wat --invoke sir_harness_main"
        );
    }

    #[test]
    fn synthesize_without_runtime_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("u.wat");
        std::fs::write(&out, "(memory 1)").unwrap();
        let bindings = SymbolBindings::default();
        let types = SirTypeInfo::default();
        let request = HarnessRequest {
            entry: "main",
            bindings: &bindings,
            types: &types,
            backend_output: &out,
            scratch: dir.path(),
            unit_key: "u",
        };
        let err = WatSynthesizer::new(None).synthesize(&request).unwrap_err();
        assert!(matches!(err, HarnessError::RuntimeUnavailable { .. }));
    }
}
