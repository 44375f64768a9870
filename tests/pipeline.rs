//! End-to-end pipeline tests: collector → aggregation → renderers → writer.

use chrono::{DateTime, TimeZone, Utc};
use runreport::aggregate::{AggregateOptions, AggregatedReport, Status};
use runreport::collector::{AttachmentInput, AttemptResult, InlineLimits, ReportSession};
use runreport::history;
use runreport::reporter::html::escape_html;
use runreport::reporter::markdown::escape_markdown;
use runreport::reporter::{render_documents, ReportView};
use runreport::schema::SCHEMA_ID;
use runreport::topics::TopicRegistry;
use runreport::writer::RunWriter;
use runreport::{RunRecord, TestIdentity, TestStatus};
use serde_json::{json, Value};
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 7, 0, 0).unwrap()
}

fn identity(id: &str, project: &str) -> TestIdentity {
    TestIdentity {
        id: id.into(),
        title_path: vec!["site.spec.ts".into(), id.into()],
        file: "site.spec.ts".into(),
        line: 1,
        project: Some(project.into()),
    }
}

fn summary(base_name: &str, project: &str, overview: Value) -> AttachmentInput {
    let payload = json!({
        "schema": SCHEMA_ID,
        "version": 1,
        "kind": "run-summary",
        "baseName": base_name,
        "metadata": { "projectName": project },
        "overview": overview,
    });
    AttachmentInput::bytes(base_name, "application/json", serde_json::to_vec(&payload).unwrap())
}

fn finish(session: ReportSession) -> RunRecord {
    session.on_run_end(t0() + chrono::Duration::seconds(30), false)
}

fn new_session() -> ReportSession {
    let mut s = ReportSession::new(InlineLimits::default()).with_run_id("pipeline");
    s.on_run_begin(2, t0());
    s
}

#[test]
fn internal_links_without_broken_links_pass() {
    let mut session = new_session();
    session.on_test_attempt_complete(
        identity("links", "Chrome"),
        AttemptResult::new(TestStatus::Passed, t0(), 800).with_attachment(summary(
            "internal-links",
            "Chrome",
            json!({ "totalLinks": 12, "brokenCount": 0 }),
        )),
    );
    let run = finish(session);
    let report = AggregatedReport::from_run(&run, &AggregateOptions::default());

    let topic = report.find("internal-links").expect("links topic");
    assert_eq!(topic.status, Status::Pass);
    assert_eq!(report.overall_status(), Status::Pass);

    let docs = render_documents(&run, &report, &ReportView::new(&report, None));
    assert!(docs.html.contains("<th>Total Links</th><td>12</td>"));
    assert!(docs.html.contains("<th>Broken</th><td>0</td>"));
    assert!(docs.markdown.contains("| Total Links | 12 |"));
    assert!(docs.markdown.contains("| Broken | 0 |"));
}

#[test]
fn wcag_blocking_in_one_browser_fails_the_topic() {
    let mut session = new_session();
    session.on_test_attempt_complete(
        identity("a11y-chrome", "Chrome"),
        AttemptResult::new(TestStatus::Passed, t0(), 900)
            .with_attachment(summary("wcag", "Chrome", json!({ "totalGatingFindings": 3 }))),
    );
    session.on_test_attempt_complete(
        identity("a11y-firefox", "Firefox"),
        AttemptResult::new(TestStatus::Passed, t0(), 900)
            .with_attachment(summary("wcag", "Firefox", json!({ "totalGatingFindings": 0 }))),
    );
    let run = finish(session);
    let report = AggregatedReport::from_run(&run, &AggregateOptions::default());

    let topic = report.find("wcag").unwrap();
    assert_eq!(topic.metrics.blocking, 3);
    assert_eq!(topic.status, Status::Fail);
    let labels: Vec<&str> = topic.buckets.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["Chrome", "Firefox"]);
    assert_eq!(topic.buckets[0].status, Status::Fail);
    assert_eq!(topic.buckets[1].status, Status::Pass);
    // topic severity never changes test outcomes
    assert_eq!(run.counts.passed, 2);
}

#[test]
fn oversized_text_attachment_is_omitted() {
    let limits = InlineLimits::default();
    let mut session = ReportSession::new(limits).with_run_id("big");
    session.on_run_begin(1, t0());
    let body = vec![b'x'; (limits.max_text_bytes * 2) as usize];
    session.on_test_attempt_complete(
        identity("log", "Chrome"),
        AttemptResult::new(TestStatus::Passed, t0(), 10)
            .with_attachment(AttachmentInput::bytes("stdout", "text/plain", body)),
    );
    let run = finish(session);
    let artifact = &run.tests[0].attempts[0].artifacts[0];
    assert!(artifact.omitted);
    assert!(artifact.body.is_none());
    assert!(artifact.reason.as_deref().unwrap().contains("exceeds inline limit"));
    assert_eq!(artifact.size_bytes, Some(limits.max_text_bytes * 2));
    assert_eq!(artifact.limit_bytes, Some(limits.max_text_bytes));
}

#[test]
fn unknown_schema_is_rejected_without_touching_test_status() {
    let mut session = new_session();
    let foreign = json!({
        "schema": "someone-else.summary", "version": 1, "kind": "run-summary",
        "baseName": "wcag", "overview": { "totalGatingFindings": 9 }
    });
    session.on_test_attempt_complete(
        identity("a11y", "Chrome"),
        AttemptResult::new(TestStatus::Passed, t0(), 10).with_attachment(AttachmentInput::bytes(
            "wcag",
            "application/json",
            serde_json::to_vec(&foreign).unwrap(),
        )),
    );
    let run = finish(session);
    assert!(run.summaries.is_empty());
    assert_eq!(run.rejected_summaries, 1);
    assert_eq!(run.tests[0].final_status(), Some(TestStatus::Passed));

    let report = AggregatedReport::from_run(&run, &AggregateOptions::default());
    assert!(report.topics.is_empty());
    assert_eq!(report.overall_status(), Status::Pass);
}

#[test]
fn html_and_markdown_overview_numbers_agree() {
    let mut session = new_session();
    session.on_test_attempt_complete(
        identity("a11y", "Chrome"),
        AttemptResult::new(TestStatus::Passed, t0(), 10).with_attachment(summary(
            "wcag",
            "Chrome",
            json!({ "totalGatingFindings": 4, "gatingPages": 2, "totalAdvisoryFindings": 7, "totalPages": 11 }),
        )),
    );
    session.on_test_attempt_complete(
        identity("perf", "Chrome"),
        AttemptResult::new(TestStatus::Passed, t0(), 10).with_attachment(summary(
            "performance-budgets",
            "Chrome",
            json!({ "budgetBreaches": 1, "nearBudget": 2, "medianLcpMs": 2450.5 }),
        )),
    );
    let run = finish(session);
    let report = AggregatedReport::from_run(&run, &AggregateOptions::default());
    let docs = render_documents(&run, &report, &ReportView::new(&report, None));
    let registry = TopicRegistry::builtin();

    let mut checked = 0;
    for topic in report.panels() {
        let renderer = registry.resolve(topic.group.topic);
        for bucket in &topic.group.buckets {
            let run_entry = bucket.authoritative().unwrap();
            for row in renderer.render_overview(&run_entry.summary.overview) {
                let html_cell = format!("<th>{}</th><td>{}</td>", escape_html(&row.label), escape_html(&row.value));
                let md_cell = format!("| {} | {} |", escape_markdown(&row.label), escape_markdown(&row.value));
                assert!(docs.html.contains(&html_cell), "html missing {html_cell}");
                assert!(docs.markdown.contains(&md_cell), "markdown missing {md_cell}");
                checked += 1;
            }
        }
    }
    assert!(checked >= 7);
}

#[test]
fn writing_the_same_run_twice_keeps_one_manifest_entry() {
    let dir = TempDir::new().unwrap();
    let mut session = new_session();
    session.on_test_attempt_complete(identity("t", "Chrome"), AttemptResult::new(TestStatus::Passed, t0(), 10));
    let run = finish(session);
    let report = AggregatedReport::from_run(&run, &AggregateOptions::default());
    let docs = render_documents(&run, &report, &ReportView::new(&report, None));
    let writer = RunWriter::new(dir.path());

    let first = writer.write(&run, &report, &docs).unwrap();
    let second = writer.write(&run, &report, &docs).unwrap();
    assert_ne!(first.run_dir, second.run_dir);
    assert!(first.report_path.exists() && second.report_path.exists());

    let manifest = history::load_manifest(dir.path());
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest[0].run_id, "pipeline");
}

#[test]
fn initial_view_selects_topic_panel() {
    let mut session = new_session();
    session.on_test_attempt_complete(
        identity("links", "Chrome"),
        AttemptResult::new(TestStatus::Passed, t0(), 10)
            .with_attachment(summary("internal-links", "Chrome", json!({ "totalLinks": 3 }))),
    );
    let run = finish(session);
    let report = AggregatedReport::from_run(&run, &AggregateOptions::default());
    let view = ReportView::new(&report, Some("internal-links"));
    let docs = render_documents(&run, &report, &view);
    assert!(docs.html.contains("id=\"view-topic-internal-links\" checked"));
}
