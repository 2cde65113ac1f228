//! C stub synthesis for the native backend.
//!
//! The C backend emits every SIR identifier as `<prefix><stripped name>` and references each external
//! symbol `%?s` of function `@f` through a zero-argument function `<prefix>f__<prefix>s`. The stub defines
//! those functions from the unit's bindings and adds a C `main` that calls the generated entry.
//!
//! The stub's `main` always returns 0: the generated entry's own return value is not a verdict. A failing
//! unit signals failure through the runtime's failure path (a `require` abort, a sanitizer report), which
//! surfaces as a non-zero process exit code.

use std::fmt::Write as _;

use sir_conform_core::strip_sigil;

use super::{HarnessError, HarnessRequest, PreparedHarness, write_file};
use crate::bindings::SymbolBindings;
use crate::infer::SirTypeInfo;
use crate::process::CommandLine;

/// Identifier prefix the C backend puts on every SIR name.
pub const DEFAULT_SYMBOL_PREFIX: &str = "symir_";

/// Flags the generated C is compiled with: warnings off, sanitizers on so undefined behavior traps.
pub const DEFAULT_CC_FLAGS: &[&str] = &["-w", "-fsanitize=address,undefined", "-g"];

/// How SIR names map to C identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeAbi {
    pub symbol_prefix: String,
}

impl Default for NativeAbi {
    fn default() -> Self {
        Self {
            symbol_prefix: DEFAULT_SYMBOL_PREFIX.to_string(),
        }
    }
}

impl NativeAbi {
    pub fn with_symbol_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.symbol_prefix = prefix.into();
        self
    }

    /// C identifier of a SIR name.
    pub fn mangle(&self, name: &str) -> String {
        format!("{}{}", self.symbol_prefix, strip_sigil(name))
    }

    /// C identifier of the provider function for symbol `sym` used by function `func`.
    pub fn symbol_provider(&self, func: &str, sym: &str) -> String {
        format!("{}__{}", self.mangle(func), self.mangle(sym))
    }
}

/// Render the C stub for `entry`.
pub fn render_stub(entry: &str, bindings: &SymbolBindings, types: &SirTypeInfo, abi: &NativeAbi) -> String {
    let mut out = String::from("#include <stdint.h>\n\n");

    for binding in bindings.iter() {
        let ty = types.symbol_type(&binding.name);
        let _ = writeln!(
            out,
            "{} {}(void) {{ return {}; }}",
            ty.c_name(),
            abi.symbol_provider(entry, &binding.name),
            binding.value
        );
    }
    if !bindings.is_empty() {
        out.push('\n');
    }

    let entry_symbol = abi.mangle(entry);
    let _ = writeln!(out, "extern {} {}(void);\n", types.entry_return.c_name(), entry_symbol);
    out.push_str("int main(void) {\n");
    let _ = writeln!(out, "  {}();", entry_symbol);
    out.push_str("  return 0;\n}\n");
    out
}

/// Native-ABI strategy: C stub plus a C compiler link step.
#[derive(Debug, Clone)]
pub struct NativeSynthesizer {
    pub cc: CommandLine,
    pub flags: Vec<String>,
    pub abi: NativeAbi,
}

impl Default for NativeSynthesizer {
    fn default() -> Self {
        Self {
            cc: CommandLine::new("gcc"),
            flags: DEFAULT_CC_FLAGS.iter().map(|f| f.to_string()).collect(),
            abi: NativeAbi::default(),
        }
    }
}

impl NativeSynthesizer {
    pub fn new(cc: CommandLine) -> Self {
        Self {
            cc,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_abi(mut self, abi: NativeAbi) -> Self {
        self.abi = abi;
        self
    }

    pub fn synthesize(&self, request: &HarnessRequest<'_>) -> Result<PreparedHarness, HarnessError> {
        let stub_path = request.scratch_file("_bindings.c");
        let exe_path = request.scratch_file(".exe");

        let stub = render_stub(request.entry, request.bindings, request.types, &self.abi);
        write_file(&stub_path, &stub)?;

        let link = self
            .cc
            .clone()
            .arg(request.backend_output)
            .arg(&stub_path)
            .arg("-o")
            .arg(&exe_path)
            .args(&self.flags);

        Ok(PreparedHarness {
            generated: stub_path,
            link: Some(link),
            run: CommandLine::new(exe_path),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sir_conform_core::ValueType;

    #[test]
    fn mangling_follows_the_c_backend() {
        let abi = NativeAbi::default();
        assert_eq!(abi.mangle("@main"), "symir_main");
        assert_eq!(abi.symbol_provider("main", "%?a"), "symir_main__symir_a");

        let bare = NativeAbi::default().with_symbol_prefix("");
        assert_eq!(bare.symbol_provider("@main", "%?a"), "main__a");
    }

    #[test]
    fn provider_uses_inferred_symbol_type() {
        let bindings = SymbolBindings::parse(&["--sym", "%?big=5000000000", "--sym", "%?small=3"]);
        let mut types = SirTypeInfo::default();
        types.symbol_types.insert("big".to_string(), ValueType::I64);

        let stub = render_stub("main", &bindings, &types, &NativeAbi::default());
        assert!(stub.contains("int64_t symir_main__symir_big(void) { return 5000000000; }"));
        assert!(stub.contains("int32_t symir_main__symir_small(void) { return 3; }"));
    }

    #[test]
    fn wrapper_ignores_entry_return_value() {
        let types = SirTypeInfo {
            entry_return: ValueType::F64,
            ..SirTypeInfo::default()
        };
        let stub = render_stub("main", &SymbolBindings::default(), &types, &NativeAbi::default());
        assert!(stub.contains("extern double symir_main(void);"));
        assert!(stub.contains("  symir_main();\n  return 0;\n}"));
    }

    #[test]
    fn synthesize_writes_stub_and_plans_link() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("0001_add.c");
        let bindings = SymbolBindings::default();
        let types = SirTypeInfo::default();
        let request = HarnessRequest {
            entry: "main",
            bindings: &bindings,
            types: &types,
            backend_output: &output,
            scratch: dir.path(),
            unit_key: "0001_add",
        };

        let synth = NativeSynthesizer::new(CommandLine::new("cc")).with_flags(vec!["-O0".to_string()]);
        let prepared = synth.synthesize(&request).unwrap();

        assert_eq!(prepared.generated, dir.path().join("0001_add_bindings.c"));
        assert!(prepared.generated.is_file());
        let link = prepared.link.unwrap();
        assert_eq!(link.program, std::path::PathBuf::from("cc"));
        assert_eq!(
            link.args,
            [
                output.as_os_str().to_os_string(),
                dir.path().join("0001_add_bindings.c").into_os_string(),
                "-o".into(),
                dir.path().join("0001_add.exe").into_os_string(),
                "-O0".into(),
            ]
        );
        assert_eq!(prepared.run.program, dir.path().join("0001_add.exe"));
    }
}
