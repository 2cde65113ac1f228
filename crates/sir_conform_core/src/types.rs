//! Scalar value types the harness can synthesize.
//!
//! The harness only ever produces constants and return types for generated scaffolding, so the type
//! universe is the four scalar types both backends lower to.

use std::fmt;

/// A scalar SIR type as it appears in generated scaffolding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    #[default]
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    /// Parse an exact return-type spelling (`i32`, `i64`, `f32`, `f64`).
    pub fn from_exact(spelling: &str) -> Option<ValueType> {
        match spelling {
            "i32" => Some(ValueType::I32),
            "i64" => Some(ValueType::I64),
            "f32" => Some(ValueType::F32),
            "f64" => Some(ValueType::F64),
            _ => None,
        }
    }

    /// Map any SIR scalar spelling to the type a backend lowers it to.
    ///
    /// ## Notes
    /// - Custom-width integers (`i8`, `i16`, `i33`, ...) widen to `i32` when they fit in 32 bits and to `i64`
    ///   otherwise, matching the backends' storage choice.
    /// - Anything unrecognized falls back to `i32`.
    pub fn lowered(spelling: &str) -> ValueType {
        if let Some(exact) = ValueType::from_exact(spelling) {
            return exact;
        }
        match spelling.strip_prefix('i').and_then(|bits| bits.parse::<u32>().ok()) {
            Some(bits) if bits > 32 => ValueType::I64,
            _ => ValueType::I32,
        }
    }

    /// The `(result ...)` / `<t>.const` spelling in the WebAssembly text format.
    pub fn wat_name(self) -> &'static str {
        match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        }
    }

    /// The C type used in generated native stubs.
    pub fn c_name(self) -> &'static str {
        match self {
            ValueType::I32 => "int32_t",
            ValueType::I64 => "int64_t",
            ValueType::F32 => "float",
            ValueType::F64 => "double",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wat_name())
    }
}
