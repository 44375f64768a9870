//! Markdown reporter: the text twin of the interactive report
//!
//! Same topics, buckets and severities as the HTML document; every metric is
//! a table cell so numbers can be compared one to one.

use super::{format_duration, run_title, totals_rows};
use crate::aggregate::{AggregatedReport, BucketReport, ProjectBucket, TopicReport};
use crate::topics::{MetricRow, PageCard, Table, TopicRegistry, TopicRenderer};
use crate::{Domain, RunRecord};

/// Escapes text for inline Markdown and table cells
pub fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '|' | '#' => {
                out.push('\\');
                out.push(c);
            }
            '\r' => {}
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

pub struct MarkdownReporter {
    registry: TopicRegistry,
}

impl MarkdownReporter {
    pub fn new() -> Self {
        Self {
            registry: TopicRegistry::builtin(),
        }
    }

    pub fn report(&self, run: &RunRecord, report: &AggregatedReport) -> String {
        let mut md = String::with_capacity(16_384);
        md.push_str(&format!("# {}\n\n", escape_markdown(&run_title(run))));
        md.push_str(&format!(
            "Run `{}` · started {} · {} · status **{}** · topics **{}**",
            run.run_id,
            run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_duration(run.duration_ms),
            run.status,
            report.overall_status()
        ));
        if let Some(site) = &run.environment.site {
            md.push_str(&format!(" · site {}", escape_markdown(site)));
        }
        if let Some(profile) = &run.environment.profile {
            md.push_str(&format!(" · profile {}", escape_markdown(profile)));
        }
        md.push_str("\n\n");

        self.summary(&mut md, run, report);
        for domain in Domain::ALL {
            let topics: Vec<&TopicReport> = report.panels_in(domain).collect();
            if topics.is_empty() {
                continue;
            }
            md.push_str(&format!("## {}\n\n", domain.label()));
            for topic in topics {
                self.topic(&mut md, topic);
            }
        }
        self.tests(&mut md, run);
        md
    }

    fn summary(&self, md: &mut String, run: &RunRecord, report: &AggregatedReport) {
        md.push_str("## Summary\n\n");
        let counts = &run.counts;
        let browsers = report.browsers();
        let rows = vec![
            MetricRow::new("Tests", counts.total().to_string()),
            MetricRow::new("Passed", counts.passed.to_string()),
            MetricRow::new("Failed", counts.failed.to_string()),
            MetricRow::new("Timed Out", counts.timed_out.to_string()),
            MetricRow::new("Skipped", counts.skipped.to_string()),
            MetricRow::new("Interrupted", counts.interrupted.to_string()),
            MetricRow::new("Flaky", counts.flaky.to_string()),
            MetricRow::new("Duration", format_duration(run.duration_ms)),
            MetricRow::new("Pages Scanned", report.pages_scanned().to_string()),
            MetricRow::new("Browsers Covered", browsers.len().to_string()),
            MetricRow::new("Total Checks", report.total_checks().to_string()),
            MetricRow::new("Topics", report.panels().count().to_string()),
        ];
        kv_table(md, &rows);
        if !browsers.is_empty() {
            md.push_str(&format!("Browsers: {}\n\n", escape_markdown(&browsers.join(", "))));
        }
        if run.rejected_summaries > 0 {
            md.push_str(&format!(
                "> {} summary payload(s) failed validation and were kept as plain attachments.\n\n",
                run.rejected_summaries
            ));
        }

        let panels: Vec<&TopicReport> = report.panels().collect();
        if panels.is_empty() {
            md.push_str("_No topic summaries were reported for this run._\n\n");
            return;
        }
        table(
            md,
            &Table {
                caption: None,
                headers: ["Topic", "Domain", "Status", "Blocking", "Warnings", "Advisories", "Justification"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                rows: panels
                    .iter()
                    .map(|t| {
                        vec![
                            t.title(),
                            t.domain().label().to_string(),
                            t.status.to_string(),
                            t.metrics.blocking.to_string(),
                            t.metrics.warnings.to_string(),
                            t.metrics.advisories.to_string(),
                            t.justification.clone(),
                        ]
                    })
                    .collect(),
            },
        );
    }

    fn topic(&self, md: &mut String, topic: &TopicReport) {
        md.push_str(&format!("### {} ({})\n\n", escape_markdown(&topic.title()), topic.status));
        md.push_str(&format!("{}\n\n", escape_markdown(&topic.justification)));
        kv_table(md, &totals_rows(&topic.metrics));

        let renderer = self.registry.resolve(topic.group.topic);
        for (bucket, bucket_report) in topic.group.buckets.iter().zip(&topic.buckets) {
            self.bucket(md, renderer, bucket, bucket_report);
        }
    }

    fn bucket(&self, md: &mut String, renderer: &dyn TopicRenderer, bucket: &ProjectBucket, report: &BucketReport) {
        md.push_str(&format!("#### {} ({})\n\n", escape_markdown(&bucket.label), report.status));
        match bucket.authoritative() {
            Some(run) => {
                if let Some(fail_on) = &run.metadata.fail_on {
                    md.push_str(&format!("Gating threshold: {}\n\n", escape_markdown(fail_on)));
                }
                kv_table(md, &renderer.render_overview(&run.summary.overview));
                if let Some(body) = &run.summary.markdown_body {
                    md.push_str(body.trim_end());
                    md.push_str("\n\n");
                }
                for t in renderer.render_rule_table(&run.summary.rule_snapshots) {
                    table(md, &t);
                }
            }
            None => md.push_str("_No run-level summary for this context._\n\n"),
        }
        for page in bucket.display_pages() {
            page_card(md, &renderer.render_page_card(&page));
        }
    }

    fn tests(&self, md: &mut String, run: &RunRecord) {
        md.push_str("## Tests\n\n");
        if run.tests.is_empty() {
            md.push_str("_No tests completed._\n");
            return;
        }
        let mut attempts = Table {
            caption: None,
            headers: ["Test", "Project", "Attempt", "Status", "Duration", "Artifacts", "Errors"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: Vec::new(),
        };
        for test in &run.tests {
            for attempt in &test.attempts {
                attempts.rows.push(vec![
                    test.title(),
                    test.identity.project.clone().unwrap_or_default(),
                    (attempt.index + 1).to_string(),
                    attempt.status.to_string(),
                    format_duration(attempt.duration_ms),
                    attempt.artifacts.len().to_string(),
                    attempt
                        .errors
                        .first()
                        .map(|e| e.message.lines().next().unwrap_or_default().to_string())
                        .unwrap_or_default(),
                ]);
            }
        }
        table(md, &attempts);

        let flaky: Vec<String> = run.tests.iter().filter(|t| t.is_flaky()).map(|t| t.title()).collect();
        if !flaky.is_empty() {
            md.push_str("Flaky tests:\n\n");
            for title in flaky {
                md.push_str(&format!("- {}\n", escape_markdown(&title)));
            }
            md.push('\n');
        }
    }
}

impl Default for MarkdownReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn kv_table(md: &mut String, rows: &[MetricRow]) {
    if rows.is_empty() {
        return;
    }
    md.push_str("| Metric | Value |\n| --- | --- |\n");
    for row in rows {
        md.push_str(&format!("| {} | {} |\n", escape_markdown(&row.label), escape_markdown(&row.value)));
    }
    md.push('\n');
}

fn table(md: &mut String, t: &Table) {
    if let Some(caption) = &t.caption {
        md.push_str(&format!("**{}**\n\n", escape_markdown(caption)));
    }
    md.push_str(&format!(
        "| {} |\n",
        t.headers.iter().map(|h| escape_markdown(h)).collect::<Vec<_>>().join(" | ")
    ));
    md.push_str(&format!("|{}\n", " --- |".repeat(t.headers.len())));
    for row in &t.rows {
        md.push_str(&format!(
            "| {} |\n",
            row.iter().map(|c| escape_markdown(c)).collect::<Vec<_>>().join(" | ")
        ));
    }
    md.push('\n');
}

fn page_card(md: &mut String, card: &PageCard) {
    md.push_str(&format!("##### {}", escape_markdown(&card.title)));
    if let Some(sub) = &card.subtitle {
        md.push_str(&format!(" ({})", escape_markdown(sub)));
    }
    md.push_str(&format!(" · {}\n\n", card.status));
    kv_table(md, &card.facts);
    for t in &card.tables {
        table(md, t);
    }
}
