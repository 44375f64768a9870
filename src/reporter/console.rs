//! Console reporter with colored output

use super::format_duration;
use crate::aggregate::{AggregatedReport, Status};
use crate::{RunRecord, RunStatus};
use colored::Colorize;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to list buckets under each topic
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Print the run summary to stdout
    pub fn report(&self, run: &RunRecord, report: &AggregatedReport, report_path: Option<&str>) {
        print!("{}", self.render(run, report, report_path));
    }

    pub fn render(&self, run: &RunRecord, report: &AggregatedReport, report_path: Option<&str>) -> String {
        let mut out = String::new();
        out.push('\n');
        out.push_str(&format!("{}\n", self.paint_bold(&format!("Run {}", run.run_id))));
        let c = &run.counts;
        out.push_str(&format!(
            "   Status: {} | Tests: {} | Duration: {}\n",
            self.run_status(run.status),
            c.total(),
            format_duration(run.duration_ms)
        ));
        out.push_str(&format!(
            "   Passed: {}  Failed: {}  Timed out: {}  Skipped: {}  Interrupted: {}  Flaky: {}\n",
            c.passed, c.failed, c.timed_out, c.skipped, c.interrupted, c.flaky
        ));
        if run.rejected_summaries > 0 {
            out.push_str(&format!(
                "   {} summary payload(s) rejected by validation\n",
                run.rejected_summaries
            ));
        }
        out.push('\n');

        let panels: Vec<_> = report.panels().collect();
        if panels.is_empty() {
            out.push_str("   No topic summaries reported\n");
        } else {
            out.push_str(&format!("   {}\n", self.paint_bold("Topics:")));
            for topic in panels {
                out.push_str(&format!(
                    "   {} {} blocking {} · warnings {} · advisories {} ({})\n",
                    self.badge(topic.status),
                    topic.title(),
                    topic.metrics.blocking,
                    topic.metrics.warnings,
                    topic.metrics.advisories,
                    topic.justification
                ));
                if self.verbose {
                    for bucket in &topic.buckets {
                        out.push_str(&format!(
                            "       {} {} blocking {} · warnings {} · advisories {}\n",
                            self.badge(bucket.status),
                            bucket.label,
                            bucket.metrics.blocking,
                            bucket.metrics.warnings,
                            bucket.metrics.advisories
                        ));
                    }
                }
            }
            out.push('\n');
            out.push_str(&format!("   Overall: {}\n", self.badge(report.overall_status())));
        }

        if let Some(path) = report_path {
            out.push_str(&format!("   Report: {path}\n"));
        }
        out
    }

    fn paint_bold(&self, s: &str) -> String {
        if self.use_colors {
            s.bold().to_string()
        } else {
            s.to_string()
        }
    }

    fn badge(&self, status: Status) -> String {
        let s = format!("[{}]", status.label().to_uppercase());
        if !self.use_colors {
            return s;
        }
        match status {
            Status::Pass => s.green().to_string(),
            Status::Warn => s.yellow().to_string(),
            Status::Fail => s.red().bold().to_string(),
        }
    }

    fn run_status(&self, status: RunStatus) -> String {
        let s = status.to_string();
        if !self.use_colors {
            return s;
        }
        match status {
            RunStatus::Passed => s.green().to_string(),
            RunStatus::Failed => s.red().to_string(),
            RunStatus::Interrupted => s.yellow().to_string(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateOptions;
    use crate::collector::{InlineLimits, ReportSession};
    use chrono::{TimeZone, Utc};

    #[test]
    fn renders_plain_summary_without_topics() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut session = ReportSession::new(InlineLimits::default()).with_run_id("r-plain");
        session.on_run_begin(0, t0);
        let run = session.on_run_end(t0, true);
        let report = AggregatedReport::from_run(&run, &AggregateOptions::default());
        let out = ConsoleReporter::new()
            .without_colors()
            .render(&run, &report, Some("out/index.html"));
        assert!(out.contains("Run r-plain"));
        assert!(out.contains("Status: interrupted"));
        assert!(out.contains("No topic summaries reported"));
        assert!(out.contains("Report: out/index.html"));
    }
}
