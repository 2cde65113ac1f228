//! Suite progress and summary reporting.
//!
//! ## TestReporter Trait
//!
//! The suite runner only talks to a [`TestReporter`]; [`ConsoleReporter`] prints the human-readable log and
//! [`JsonReporter`] prints one JSON object per line for tooling.

use std::io::IsTerminal;
use std::path::Path;

use serde_json::json;

use super::{SuiteSummary, UnitReport};
use crate::verdict::Verdict;

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[93m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Receives suite events in order.
pub trait TestReporter {
    /// Called once discovery is done.
    fn on_suite_start(&mut self, _root: &Path, _unit_count: usize) {}

    /// Called after each unit got its verdict.
    fn on_unit_complete(&mut self, report: &UnitReport);

    /// Called once after the last unit.
    fn on_run_complete(&mut self, summary: &SuiteSummary);
}

/// Line-per-unit console output.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
    pub color: bool,
}

impl ConsoleReporter {
    /// Colors are enabled only when stdout is a terminal.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            color: std::io::stdout().is_terminal(),
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn unit_line(&self, report: &UnitReport) -> String {
        let path = report.path.display();
        let status = match &report.verdict {
            Verdict::Skip(reason) => return format!("[{}] {path}: {reason}", self.paint(YELLOW, "SKIP")),
            Verdict::Pass => self.paint(GREEN, "OK"),
            Verdict::Fail(_) => self.paint(RED, "FAIL"),
            Verdict::Timeout(_) => self.paint(YELLOW, "TIMEOUT"),
        };
        if self.verbose {
            format!("Testing {path}... {status} ({} ms)", report.duration.as_millis())
        } else {
            format!("Testing {path}... {status}")
        }
    }

    pub fn summary_text(&self, summary: &SuiteSummary) -> String {
        let mut out = format!("\nSummary: {}/{} passed", summary.passed, summary.scored());
        if summary.timed_out > 0 {
            out.push_str(&format!(", {}", self.paint(YELLOW, &format!("{} timeouts", summary.timed_out))));
        }
        if summary.failed > 0 {
            out.push_str(&format!(", {}", self.paint(RED, &format!("{} failed", summary.failed))));
        }
        if summary.skipped > 0 {
            out.push_str(&format!(", {} skipped", summary.skipped));
        }
        out.push('.');
        if self.verbose {
            out.push_str(&format!(" ({:.2}s)", summary.duration.as_secs_f64()));
        }

        if !summary.failures.is_empty() {
            out.push_str(&format!("\n\n{}", self.paint(BOLD, "Failures Details:")));
            for failure in &summary.failures {
                let path = failure.path.display().to_string();
                out.push_str(&format!("\n--- {} ---\n{}", self.paint(RED, &path), failure.message));
            }
        }
        if let Some(scratch) = &summary.scratch {
            out.push_str(&format!("\n\nScratch files kept in {}", scratch.display()));
        }
        out
    }
}

impl TestReporter for ConsoleReporter {
    fn on_suite_start(&mut self, root: &Path, unit_count: usize) {
        if unit_count == 0 {
            println!("No .sir units found under {}", root.display());
        }
    }

    fn on_unit_complete(&mut self, report: &UnitReport) {
        println!("{}", self.unit_line(report));
    }

    fn on_run_complete(&mut self, summary: &SuiteSummary) {
        println!("{}", self.summary_text(summary));
    }
}

/// JSON-lines output.
#[derive(Debug, Default)]
pub struct JsonReporter;

impl JsonReporter {
    pub fn unit_json(report: &UnitReport) -> serde_json::Value {
        json!({
            "path": report.path.display().to_string(),
            "verdict": report.verdict.label(),
            "message": report.verdict.message(),
            "duration_ms": report.duration.as_millis() as u64,
        })
    }

    pub fn summary_json(summary: &SuiteSummary) -> serde_json::Value {
        json!({
            "summary": {
                "passed": summary.passed,
                "failed": summary.failed,
                "timed_out": summary.timed_out,
                "skipped": summary.skipped,
                "duration_ms": summary.duration.as_millis() as u64,
                "scratch": summary.scratch.as_ref().map(|p| p.display().to_string()),
            }
        })
    }
}

impl TestReporter for JsonReporter {
    fn on_unit_complete(&mut self, report: &UnitReport) {
        println!("{}", Self::unit_json(report));
    }

    fn on_run_complete(&mut self, summary: &SuiteSummary) {
        println!("{}", Self::summary_json(summary));
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::suite::FailureRecord;

    fn report(verdict: Verdict) -> UnitReport {
        UnitReport {
            path: PathBuf::from("test/interp/add.sir"),
            verdict,
            duration: Duration::from_millis(12),
        }
    }

    #[test]
    fn console_lines_without_color() {
        let console = ConsoleReporter::default();
        assert_eq!(console.unit_line(&report(Verdict::Pass)), "Testing test/interp/add.sir... OK");
        assert_eq!(
            console.unit_line(&report(Verdict::Timeout("Runtime timeout after 2000 ms".to_string()))),
            "Testing test/interp/add.sir... TIMEOUT"
        );
        assert_eq!(
            console.unit_line(&report(Verdict::Skip("No EXPECT tag".to_string()))),
            "[SKIP] test/interp/add.sir: No EXPECT tag"
        );

        let verbose = ConsoleReporter {
            verbose: true,
            color: false,
        };
        assert_eq!(
            verbose.unit_line(&report(Verdict::Fail("x".to_string()))),
            "Testing test/interp/add.sir... FAIL (12 ms)"
        );
    }

    #[test]
    fn colored_status() {
        let console = ConsoleReporter {
            verbose: false,
            color: true,
        };
        assert_eq!(
            console.unit_line(&report(Verdict::Pass)),
            "Testing test/interp/add.sir... \x1b[92mOK\x1b[0m"
        );
    }

    #[test]
    fn summary_lists_failures() {
        let summary = SuiteSummary {
            passed: 2,
            failed: 1,
            timed_out: 1,
            skipped: 3,
            failures: vec![FailureRecord {
                path: PathBuf::from("a.sir"),
                message: "link failed".to_string(),
            }],
            ..SuiteSummary::default()
        };
        let text = ConsoleReporter::default().summary_text(&summary);
        assert_eq!(
            text,
            "\nSummary: 2/4 passed, 1 timeouts, 1 failed, 3 skipped.\n\nFailures Details:\n--- a.sir ---\nlink failed"
        );
    }

    #[test]
    fn json_objects() {
        let value = JsonReporter::unit_json(&report(Verdict::Fail("boom".to_string())));
        assert_eq!(
            value,
            json!({"path": "test/interp/add.sir", "verdict": "FAIL", "message": "boom", "duration_ms": 12})
        );
        let value = JsonReporter::unit_json(&report(Verdict::Pass));
        assert_eq!(value["message"], serde_json::Value::Null);

        let summary = JsonReporter::summary_json(&SuiteSummary::default());
        assert_eq!(summary["summary"]["passed"], 0);
    }
}
