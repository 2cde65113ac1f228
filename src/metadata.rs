//! Test-unit header directives.
//!
//! A unit describes how it should be judged in a short comment header:
//!
//! ```text
//! // EXPECT: FAIL
//! // ARGS: --sym %?a=10
//! // SKIP: WASM
//! ```
//!
//! Extraction is line-based and forgiving: directives may appear on any line of their window, in any
//! order, mixed with arbitrary other text. Lines that look almost like a directive simply do not match.
//! The recognized spellings and windows live in [`sir_conform_core::directives`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use sir_conform_core::directives::{self, DIRECTIVES, DirectiveId};
use sir_conform_core::{ArgScope, SkipTag};

/// What the unit author expects the toolchain to do with the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expectation {
    Pass,
    Fail,
    /// No expectation directive in the header window. Such units are never scored.
    #[default]
    Unknown,
}

impl Expectation {
    pub fn as_str(self) -> &'static str {
        match self {
            Expectation::Pass => "PASS",
            Expectation::Fail => "FAIL",
            Expectation::Unknown => "UNKNOWN",
        }
    }
}

/// Parsed header of a test unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub expectation: Expectation,
    /// Arguments per scope, in header order.
    pub backend_args: BTreeMap<ArgScope, Vec<String>>,
    pub skip_tags: BTreeSet<SkipTag>,
}

impl Metadata {
    /// Arguments contributed by a single scope.
    pub fn args(&self, scope: ArgScope) -> &[String] {
        self.backend_args.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concatenate the arguments of several scopes, in the order given.
    pub fn args_for(&self, scopes: &[ArgScope]) -> Vec<String> {
        scopes.iter().flat_map(|s| self.args(*s).iter().cloned()).collect()
    }

    /// Whether the header names `tag` in a skip directive.
    pub fn skips(&self, tag: &SkipTag) -> bool {
        self.skip_tags.contains(tag)
    }
}

/// Extract metadata from the leading lines of a unit's text.
///
/// ## Notes
/// - Each directive is only recognized within its own window (see [`directives::DirectiveInfo::window`]).
/// - When both expectation directives appear, the last matching line wins. Within a single line that
///   carries both, `PASS` wins.
/// - Never fails: a header with no directives yields `Metadata::default()`.
pub fn parse_header<'a>(lines: impl IntoIterator<Item = &'a str>) -> Metadata {
    let mut meta = Metadata::default();

    for (index, line) in lines.into_iter().take(directives::max_window()).enumerate() {
        let mut pass_on_line = false;
        for directive in DIRECTIVES.iter().filter(|d| index < d.window) {
            let Some(pos) = line.find(directive.marker) else {
                continue;
            };
            let rest = &line[pos + directive.marker.len()..];
            match directive.id {
                DirectiveId::ExpectPass => {
                    pass_on_line = true;
                    meta.expectation = Expectation::Pass;
                }
                DirectiveId::ExpectFail if pass_on_line => {}
                DirectiveId::ExpectFail => meta.expectation = Expectation::Fail,
                DirectiveId::Skip => {
                    meta.skip_tags.extend(rest.split_whitespace().map(SkipTag::parse));
                }
                id => {
                    if let Some(scope) = ArgScope::ALL.into_iter().find(|s| s.directive() == id) {
                        meta.backend_args
                            .entry(scope)
                            .or_default()
                            .extend(rest.split_whitespace().map(str::to_string));
                    }
                }
            }
        }
    }

    meta
}

/// Read only as much of a unit as the widest directive window needs and parse it.
///
/// Invalid UTF-8 is replaced rather than rejected, so a binary-ish unit degrades to "no directives".
pub fn read_metadata(path: &Path) -> io::Result<Metadata> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    for _ in 0..directives::max_window() {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(parse_header(lines.iter().map(String::as_str)))
}
