//! Directive vocabulary registry.
//!
//! Test units describe themselves with line comments in their first few lines. This module
//! centralizes the recognized spellings and how far into the file each one is looked for, so
//! the extractor never does stringly-typed comparisons of its own.

/// Stable identifier for supported header directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveId {
    ExpectPass,
    ExpectFail,
    Args,
    CompilerArgs,
    InterpArgs,
    SolverArgs,
    Skip,
}

/// Metadata entry for a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveInfo {
    pub id: DirectiveId,
    /// Marker text searched for anywhere in a line.
    pub marker: &'static str,
    /// Number of leading lines in which the directive is recognized.
    pub window: usize,
}

/// Header window for most directives.
pub const HEADER_WINDOW: usize = 10;

/// Header window for solver-specific arguments.
pub const SOLVER_HEADER_WINDOW: usize = 20;

/// Registry of supported directives.
///
/// ## Notes
/// - Order matters only between `ExpectPass` and `ExpectFail`: `ExpectPass` comes first so that a line
///   carrying both resolves to PASS.
pub const DIRECTIVES: &[DirectiveInfo] = &[
    DirectiveInfo {
        id: DirectiveId::ExpectPass,
        marker: "// EXPECT: PASS",
        window: HEADER_WINDOW,
    },
    DirectiveInfo {
        id: DirectiveId::ExpectFail,
        marker: "// EXPECT: FAIL",
        window: HEADER_WINDOW,
    },
    DirectiveInfo {
        id: DirectiveId::Args,
        marker: "// ARGS:",
        window: HEADER_WINDOW,
    },
    DirectiveInfo {
        id: DirectiveId::CompilerArgs,
        marker: "// COMPILER_ARGS:",
        window: HEADER_WINDOW,
    },
    DirectiveInfo {
        id: DirectiveId::InterpArgs,
        marker: "// INTERP_ARGS:",
        window: HEADER_WINDOW,
    },
    DirectiveInfo {
        id: DirectiveId::SolverArgs,
        marker: "// SOLVER_ARGS:",
        window: SOLVER_HEADER_WINDOW,
    },
    DirectiveInfo {
        id: DirectiveId::Skip,
        marker: "// SKIP:",
        window: HEADER_WINDOW,
    },
];

/// Largest window of any directive; extractors never need to read further than this.
pub fn max_window() -> usize {
    DIRECTIVES.iter().map(|d| d.window).max().unwrap_or(HEADER_WINDOW)
}

/// Which argument list a directive contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgScope {
    General,
    Compiler,
    Interpreter,
    Solver,
}

impl ArgScope {
    /// Directive that feeds this scope.
    pub fn directive(self) -> DirectiveId {
        match self {
            ArgScope::General => DirectiveId::Args,
            ArgScope::Compiler => DirectiveId::CompilerArgs,
            ArgScope::Interpreter => DirectiveId::InterpArgs,
            ArgScope::Solver => DirectiveId::SolverArgs,
        }
    }

    pub const ALL: [ArgScope; 4] = [
        ArgScope::General,
        ArgScope::Compiler,
        ArgScope::Interpreter,
        ArgScope::Solver,
    ];
}

/// Skip tags a unit can name in a `// SKIP:` directive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipTag {
    Compiler,
    Wasm,
    Interpreter,
    Solver,
    /// A tag no pipeline recognizes; kept so reports can echo it back.
    Other(String),
}

impl SkipTag {
    /// Parse a tag spelling. Matching is case-sensitive, like the directive markers.
    pub fn parse(tag: &str) -> SkipTag {
        match tag {
            "COMPILER" => SkipTag::Compiler,
            "WASM" => SkipTag::Wasm,
            "INTERPRETER" => SkipTag::Interpreter,
            "SOLVER" => SkipTag::Solver,
            other => SkipTag::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SkipTag::Compiler => "COMPILER",
            SkipTag::Wasm => "WASM",
            SkipTag::Interpreter => "INTERPRETER",
            SkipTag::Solver => "SOLVER",
            SkipTag::Other(s) => s,
        }
    }
}

impl std::fmt::Display for SkipTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
