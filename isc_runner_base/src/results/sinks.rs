//! Report sinks: where a finished report goes

use crate::results::error::ReportError;
use crate::results::types::Report;
use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

pub trait ReportSink {
    fn emit(&self, report: &Report) -> Result<(), ReportError>;

    fn name(&self) -> &str;
}

/// Pretty JSON written to a file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonFileSink {
    fn emit(&self, report: &Report) -> Result<(), ReportError> {
        let json = report.to_json()?;
        std::fs::write(&self.path, json).map_err(|source| ReportError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Human-readable summary on stdout
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    /// Also list passing expectations
    pub verbose: bool,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn render(&self, report: &Report) -> String {
        let mut out = String::new();
        let profile = if report.metadata.profile.is_empty() {
            "profile"
        } else {
            report.metadata.profile.as_str()
        };
        let _ = writeln!(out, "Profile: {} (run {})", profile, report.metadata.run_id);

        for control in &report.controls {
            let mark = if control.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(
                out,
                "  [{}] {} (impact {:.1}): {}",
                mark, control.name, control.impact, control.title
            );
            for group in &control.groups {
                for verdict in &group.verdicts {
                    if verdict.passed && !self.verbose {
                        continue;
                    }
                    let symbol = if verdict.passed { "+" } else { "x" };
                    let _ = writeln!(out, "      {} {}: {}", symbol, group.label, verdict.message);
                }
            }
        }

        let totals = &report.totals;
        let _ = writeln!(
            out,
            "Controls: {} passed, {} failed | Expectations: {} passed, {} failed | {}ms",
            totals.controls_passed,
            totals.controls_failed,
            totals.expectations_passed,
            totals.expectations_failed,
            report.metadata.duration_ms
        );
        let _ = writeln!(out, "Result: {}", if report.passed { "PASS" } else { "FAIL" });
        out
    }
}

impl ReportSink for ConsoleSink {
    fn emit(&self, report: &Report) -> Result<(), ReportError> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(self.render(report).as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|source| ReportError::Output {
                sink: "stdout".to_string(),
                source,
            })
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::evaluator::Verdict;
    use crate::results::aggregator::{aggregate, AggregationPolicy};
    use crate::results::types::{ControlResult, GroupOutcome, GroupResult};
    use isc_profile::model::Control;

    fn report() -> Report {
        let control = Control {
            name: "status".to_string(),
            title: "Ensure VMs are running".to_string(),
            impact: 1.0,
            description: None,
            groups: Vec::new(),
        };
        let group = GroupResult {
            label: "bigip-1a2b".to_string(),
            descriptor: None,
            outcome: GroupOutcome::Evaluated,
            exists: Some(true),
            verdicts: vec![
                Verdict::pass("resource should exists"),
                Verdict::fail("status should equals \"RUNNING\": got \"TERMINATED\""),
            ],
            duration_ms: 3,
        };
        aggregate(
            vec![ControlResult::new(0, &control, vec![group])],
            &AggregationPolicy::default(),
        )
    }

    #[test]
    fn test_console_render_lists_failures() {
        let text = ConsoleSink::new(false).render(&report());
        assert!(text.contains("[FAIL] status (impact 1.0)"));
        assert!(text.contains("x bigip-1a2b: status should equals"));
        assert!(!text.contains("resource should exists"));
        assert!(text.trim_end().ends_with("Result: FAIL"));

        let verbose = ConsoleSink::new(true).render(&report());
        assert!(verbose.contains("+ bigip-1a2b: resource should exists"));
    }

    #[test]
    fn test_json_file_sink_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let sink = JsonFileSink::new(&path);
        sink.emit(&report()).unwrap();

        let parsed = Report::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.totals.expectations_failed, 1);
        assert!(!parsed.passed);
    }

    #[test]
    fn test_json_file_sink_reports_write_errors() {
        let sink = JsonFileSink::new("/nonexistent/isc/report.json");
        assert!(matches!(sink.emit(&report()), Err(ReportError::Write { .. })));
    }
}
