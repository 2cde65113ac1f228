//! Suite runner: discover units, run each through one pipeline, aggregate, report.
//!
//! Units run strictly one after another. Nothing a unit does can stop the run; only failures that affect
//! every unit (missing test root, scratch directory not creatable) surface as [`SuiteError`].

pub mod discover;
pub mod reporter;
pub mod scratch;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::SuiteError;
use crate::metadata::Metadata;
use crate::pipeline::{UnitContext, UnitPipeline, run_unit};
use crate::process::ProcessInvoker;
use crate::verdict::Verdict;

pub use discover::{discover_unit_paths, discover_units};
pub use reporter::{ConsoleReporter, JsonReporter, TestReporter};
pub use scratch::ScratchDir;

/// A discovered unit. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnit {
    pub path: PathBuf,
    /// `path` relative to the test root. Categories are decided on this, never on directories above the root.
    pub relative_path: PathBuf,
    /// Unique within the run; prefixes every scratch file generated for this unit.
    pub key: String,
    pub metadata: Metadata,
}

/// Verdict of one unit plus how long it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub path: PathBuf,
    pub verdict: Verdict,
    pub duration: Duration,
}

/// A FAIL or TIMEOUT, kept for the final details dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub message: String,
}

/// Aggregate of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub skipped: usize,
    pub failures: Vec<FailureRecord>,
    pub duration: Duration,
    /// Scratch directory left on disk, if any.
    pub scratch: Option<PathBuf>,
}

impl SuiteSummary {
    /// Units that counted towards pass/fail.
    pub fn scored(&self) -> usize {
        self.passed + self.failed + self.timed_out
    }

    /// No FAIL and no TIMEOUT.
    pub fn success(&self) -> bool {
        self.failed == 0 && self.timed_out == 0
    }

    pub fn record(&mut self, report: &UnitReport) {
        match &report.verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::Skip(_) => self.skipped += 1,
            Verdict::Fail(message) => {
                self.failed += 1;
                self.push_failure(report, message);
            }
            Verdict::Timeout(message) => {
                self.timed_out += 1;
                self.push_failure(report, message);
            }
        }
    }

    fn push_failure(&mut self, report: &UnitReport, message: &str) {
        self.failures.push(FailureRecord {
            path: report.path.clone(),
            message: message.to_string(),
        });
    }
}

/// Run-level settings shared by every pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteOptions {
    /// Where generated files go; a fresh temp directory when `None`.
    pub scratch_dir: Option<PathBuf>,
    /// Keep the scratch directory even after a fully successful run.
    pub keep_scratch: bool,
}

impl SuiteOptions {
    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    pub fn with_keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }
}

/// Run every unit under `root` through `pipeline`.
pub fn run_suite(
    root: &Path,
    pipeline: &dyn UnitPipeline,
    invoker: &dyn ProcessInvoker,
    reporter: &mut dyn TestReporter,
    options: &SuiteOptions,
) -> Result<SuiteSummary, SuiteError> {
    let started = Instant::now();
    let units = discover_units(root)?;
    let scratch = ScratchDir::create(options.scratch_dir.as_deref())?;
    tracing::info!(pipeline = pipeline.name(), scratch = %scratch.path().display(), "suite start");

    reporter.on_suite_start(root, units.len());
    let cx = UnitContext {
        scratch: scratch.path(),
        invoker,
    };

    let mut summary = SuiteSummary::default();
    for unit in &units {
        let unit_started = Instant::now();
        let verdict = run_unit(pipeline, unit, &cx);
        let report = UnitReport {
            path: unit.path.clone(),
            verdict,
            duration: unit_started.elapsed(),
        };
        summary.record(&report);
        reporter.on_unit_complete(&report);
    }

    summary.scratch = scratch.finish(options.keep_scratch || !summary.success());
    summary.duration = started.elapsed();
    tracing::info!(
        passed = summary.passed,
        failed = summary.failed,
        timed_out = summary.timed_out,
        skipped = summary.skipped,
        "suite end"
    );
    reporter.on_run_complete(&summary);
    Ok(summary)
}
