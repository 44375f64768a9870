//! Reporter module for output formatting

pub mod console;
pub mod html;
pub mod json;
pub mod markdown;
pub mod view;

pub use console::ConsoleReporter;
pub use html::HtmlReporter;
pub use json::{JsonReporter, RunDigest, TopicDigest};
pub use markdown::MarkdownReporter;
pub use view::{PanelId, ReportView};

use crate::aggregate::Metrics;
use crate::topics::{MetricRow, Tone};
use crate::RunRecord;

/// Both rendered documents for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocs {
    pub html: String,
    pub markdown: String,
}

pub fn render_documents(
    run: &RunRecord,
    report: &crate::aggregate::AggregatedReport,
    view: &ReportView,
) -> RenderedDocs {
    RenderedDocs {
        html: HtmlReporter::new().report(run, report, view),
        markdown: MarkdownReporter::new().report(run, report),
    }
}

pub(crate) fn run_title(run: &RunRecord) -> String {
    run.title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Test Run Report".to_string())
}

/// `850 ms`, `12.3 s`, `2m 05s`
pub fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms} ms")
    } else if ms < 60_000 {
        format!("{:.1} s", ms as f64 / 1000.0)
    } else {
        let secs = ms / 1000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Topic-level totals shown above the buckets
pub(crate) fn totals_rows(metrics: &Metrics) -> Vec<MetricRow> {
    let tone = |n: u64, t: Tone| if n > 0 { t } else { Tone::Neutral };
    vec![
        MetricRow::new("Blocking", metrics.blocking.to_string()).with_tone(tone(metrics.blocking, Tone::Bad)),
        MetricRow::new("Warnings", metrics.warnings.to_string()).with_tone(tone(metrics.warnings, Tone::Warn)),
        MetricRow::new("Advisories", metrics.advisories.to_string()).with_tone(tone(metrics.advisories, Tone::Warn)),
        MetricRow::new("Affected Pages", metrics.affected_pages.to_string()),
    ]
}
