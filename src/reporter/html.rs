//! HTML reporter: a self-contained interactive run report
//!
//! Panels switch through hidden radio inputs and CSS sibling selectors, so
//! navigation works with scripting disabled. The small inline script only adds
//! expand/collapse-all buttons and the test-log filter; both controls stay
//! hidden until the script reveals them.

use super::view::{PanelId, ReportView};
use super::{format_duration, run_title};
use crate::aggregate::{AggregatedReport, BucketReport, ProjectBucket, Status, TopicReport};
use crate::topics::{MetricRow, PageCard, Table, TopicRegistry};
use crate::{Artifact, ArtifactKind, Domain, Encoding, RunRecord, TestRecord};

/// Escapes text for element content and quoted attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn tag(status: Status) -> String {
    format!("<span class=\"tag tag-{0}\">{0}</span>", status.label())
}

/// Reporter that generates the interactive HTML document
pub struct HtmlReporter {
    registry: TopicRegistry,
}

impl HtmlReporter {
    pub fn new() -> Self {
        Self {
            registry: TopicRegistry::builtin(),
        }
    }

    /// Generate the full HTML report
    pub fn report(&self, run: &RunRecord, report: &AggregatedReport, view: &ReportView) -> String {
        let title = run_title(run);
        let mut html = String::with_capacity(65_536);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&title)));
        html.push_str("<style>\n");
        html.push_str(Self::template_css());
        html.push_str(&Self::view_css(view));
        html.push_str("</style>\n</head>\n<body>\n");

        for panel in view.panels() {
            html.push_str(&format!(
                "<input type=\"radio\" name=\"view\" class=\"view-toggle\" id=\"{}\"{}>\n",
                panel.input_id(),
                if view.is_selected(&panel) { " checked" } else { "" }
            ));
        }

        html.push_str("<div class=\"shell\">\n");
        html.push_str(&self.header(run, report, &title));
        html.push_str(&self.nav(run, report, view));
        html.push_str("<main>\n");
        html.push_str(&self.summary_panel(run, report, view));
        html.push_str(&self.tests_panel(run));
        for topic in report.panels() {
            if let Some(panel) = view.topic_panel(topic.base_name()) {
                html.push_str(&self.topic_panel(topic, panel));
            }
        }
        html.push_str("</main>\n</div>\n");
        html.push_str(Self::template_script());
        html.push_str("</body>\n</html>\n");
        html
    }

    fn header(&self, run: &RunRecord, report: &AggregatedReport, title: &str) -> String {
        let mut h = String::new();
        h.push_str(&format!(
            "<header><h1>{}</h1>{}<div class=\"meta\">Run <code>{}</code> · started {} · {} · {}/{}",
            escape_html(title),
            tag(report.overall_status()),
            escape_html(&run.run_id),
            run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_duration(run.duration_ms),
            escape_html(&run.environment.platform),
            escape_html(&run.environment.arch),
        ));
        if let Some(site) = &run.environment.site {
            h.push_str(&format!(" · site {}", escape_html(site)));
        }
        if let Some(profile) = &run.environment.profile {
            h.push_str(&format!(" · profile {}", escape_html(profile)));
        }
        h.push_str(&format!(" · run {}</div></header>\n", run.status));
        h
    }

    fn nav(&self, run: &RunRecord, report: &AggregatedReport, view: &ReportView) -> String {
        let mut n = String::from("<nav class=\"sidebar\">\n");
        n.push_str(&format!(
            "<label class=\"nav-item\" for=\"{}\">Summary</label>\n",
            PanelId::Summary.input_id()
        ));
        n.push_str(&format!(
            "<label class=\"nav-item\" for=\"{}\">Tests <span class=\"cnt\">{}</span></label>\n",
            PanelId::Tests.input_id(),
            run.tests.len()
        ));
        for domain in Domain::ALL {
            let topics: Vec<&TopicReport> = report.panels_in(domain).collect();
            if topics.is_empty() {
                continue;
            }
            n.push_str(&format!("<h3>{}</h3>\n", domain.label()));
            for topic in topics {
                if let Some(panel) = view.topic_panel(topic.base_name()) {
                    n.push_str(&format!(
                        "<label class=\"nav-item\" for=\"{}\">{} {}</label>\n",
                        panel.input_id(),
                        escape_html(&topic.title()),
                        tag(topic.status)
                    ));
                }
            }
        }
        n.push_str("</nav>\n");
        n
    }

    fn summary_panel(&self, run: &RunRecord, report: &AggregatedReport, view: &ReportView) -> String {
        let mut p = String::new();
        p.push_str(&format!("<section class=\"panel\" id=\"{}\">\n", PanelId::Summary.panel_id()));
        p.push_str("<h2>Summary</h2>\n");

        let counts = &run.counts;
        let stats = [
            ("Tests", counts.total().to_string()),
            ("Passed", counts.passed.to_string()),
            ("Failed", counts.failed.to_string()),
            ("Timed Out", counts.timed_out.to_string()),
            ("Skipped", counts.skipped.to_string()),
            ("Interrupted", counts.interrupted.to_string()),
            ("Flaky", counts.flaky.to_string()),
            ("Duration", format_duration(run.duration_ms)),
        ];
        p.push_str("<div class=\"stats\">");
        for (label, value) in &stats {
            p.push_str(&format!(
                "<div class=\"stat\"><span class=\"val\">{}</span><span class=\"lbl\">{}</span></div>",
                escape_html(value),
                label
            ));
        }
        p.push_str("</div>\n");

        let browsers = report.browsers();
        let checks = [
            MetricRow::new("Pages Scanned", report.pages_scanned().to_string()),
            MetricRow::new("Browsers Covered", browsers.len().to_string()),
            MetricRow::new("Total Checks", report.total_checks().to_string()),
            MetricRow::new("Topics", report.panels().count().to_string()),
        ];
        p.push_str(&Self::kv_table(&checks));
        if !browsers.is_empty() {
            p.push_str(&format!(
                "<p class=\"muted\">Browsers: {}</p>\n",
                escape_html(&browsers.join(", "))
            ));
        }
        if run.rejected_summaries > 0 {
            p.push_str(&format!(
                "<p class=\"notice\">{} summary payload(s) failed validation and were kept as plain attachments.</p>\n",
                run.rejected_summaries
            ));
        }

        let panels: Vec<&TopicReport> = report.panels().collect();
        if panels.is_empty() {
            p.push_str("<p class=\"muted\">No topic summaries were reported for this run.</p>\n");
        } else {
            p.push_str("<table class=\"grid\"><thead><tr><th>Topic</th><th>Domain</th><th>Status</th><th>Blocking</th><th>Warnings</th><th>Advisories</th><th>Justification</th></tr></thead><tbody>\n");
            for topic in panels {
                let name = match view.topic_panel(topic.base_name()) {
                    Some(panel) => format!(
                        "<label class=\"link\" for=\"{}\">{}</label>",
                        panel.input_id(),
                        escape_html(&topic.title())
                    ),
                    None => escape_html(&topic.title()),
                };
                p.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    name,
                    topic.domain().label(),
                    tag(topic.status),
                    topic.metrics.blocking,
                    topic.metrics.warnings,
                    topic.metrics.advisories,
                    escape_html(&topic.justification)
                ));
            }
            p.push_str("</tbody></table>\n");
        }
        p.push_str("</section>\n");
        p
    }

    fn tests_panel(&self, run: &RunRecord) -> String {
        let mut p = String::new();
        p.push_str(&format!("<section class=\"panel\" id=\"{}\">\n", PanelId::Tests.panel_id()));
        p.push_str("<h2>Tests</h2>\n");
        p.push_str(Self::controls(true));
        if run.tests.is_empty() {
            p.push_str("<p class=\"muted\">No tests completed.</p>\n");
        }
        for test in &run.tests {
            p.push_str(&self.test_row(test));
        }
        p.push_str("</section>\n");
        p
    }

    fn test_row(&self, test: &TestRecord) -> String {
        let title = test.title();
        let status = test
            .final_status()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let status_class = if test.is_flaky() { "flaky".to_string() } else { status.clone() };
        let search = format!(
            "{} {} {}",
            title,
            test.identity.project.as_deref().unwrap_or_default(),
            status
        )
        .to_lowercase();

        let mut r = String::new();
        r.push_str(&format!(
            "<details class=\"test-row\" data-search=\"{}\"><summary><span class=\"tag tag-{}\">{}</span> {}",
            escape_html(&search),
            escape_html(&status_class),
            escape_html(&status_class),
            escape_html(&title)
        ));
        if let Some(project) = &test.identity.project {
            r.push_str(&format!(" <span class=\"muted\">[{}]</span>", escape_html(project)));
        }
        r.push_str(&format!(
            " <span class=\"muted\">{} attempt(s) · {}</span></summary>\n",
            test.attempts.len(),
            format_duration(test.total_duration_ms())
        ));
        if !test.identity.file.is_empty() {
            r.push_str(&format!(
                "<p class=\"muted\"><code>{}:{}</code></p>\n",
                escape_html(&test.identity.file),
                test.identity.line
            ));
        }
        for attempt in &test.attempts {
            r.push_str(&format!(
                "<div class=\"attempt\"><h4>Attempt {} · {} · {}",
                attempt.index + 1,
                attempt.status,
                format_duration(attempt.duration_ms)
            ));
            if let Some(worker) = &attempt.worker {
                r.push_str(&format!(" · {}", escape_html(worker)));
            }
            r.push_str("</h4>\n");
            for error in &attempt.errors {
                r.push_str(&format!("<pre class=\"error\">{}", escape_html(&error.message)));
                if let Some(stack) = &error.stack {
                    r.push_str(&format!("\n{}", escape_html(stack)));
                }
                r.push_str("</pre>\n");
            }
            for artifact in &attempt.artifacts {
                r.push_str(&Self::artifact(artifact));
            }
            r.push_str("</div>\n");
        }
        r.push_str("</details>\n");
        r
    }

    fn artifact(artifact: &Artifact) -> String {
        let name = escape_html(&artifact.name);
        let media = escape_html(&artifact.media_type);
        if artifact.omitted {
            return format!(
                "<div class=\"artifact omitted\"><strong>{}</strong> <span class=\"muted\">{}</span><p>Omitted: {}</p></div>\n",
                name,
                media,
                escape_html(artifact.reason.as_deref().unwrap_or("no reason recorded"))
            );
        }
        let body = artifact.body.as_deref().unwrap_or_default();
        match (artifact.kind, artifact.encoding) {
            (ArtifactKind::Image, Some(Encoding::Base64)) => format!(
                "<div class=\"artifact\"><strong>{}</strong><img alt=\"{}\" src=\"{}\"></div>\n",
                name,
                name,
                escape_html(&artifact.data_uri().unwrap_or_default())
            ),
            (_, Some(Encoding::Base64)) => format!(
                "<div class=\"artifact\"><a download=\"{}\" href=\"{}\">{}</a> <span class=\"muted\">{}</span></div>\n",
                name,
                escape_html(&artifact.data_uri().unwrap_or_default()),
                name,
                media
            ),
            _ => format!(
                "<div class=\"artifact\"><strong>{}</strong> <span class=\"muted\">{}{}</span><pre>{}</pre></div>\n",
                name,
                media,
                if artifact.truncated { " · truncated" } else { "" },
                escape_html(body)
            ),
        }
    }

    fn topic_panel(&self, topic: &TopicReport, panel: &PanelId) -> String {
        let mut p = String::new();
        p.push_str(&format!("<section class=\"panel\" id=\"{}\">\n", panel.panel_id()));
        p.push_str(&format!(
            "<h2>{} {}</h2>\n<p class=\"justification\">{}</p>\n",
            escape_html(&topic.title()),
            tag(topic.status),
            escape_html(&topic.justification)
        ));
        p.push_str(&Self::kv_table(&super::totals_rows(&topic.metrics)));
        p.push_str(Self::controls(false));

        let renderer = self.registry.resolve(topic.group.topic);
        for (bucket, bucket_report) in topic.group.buckets.iter().zip(&topic.buckets) {
            p.push_str(&self.bucket_section(renderer, bucket, bucket_report));
        }
        p.push_str("</section>\n");
        p
    }

    fn bucket_section(
        &self,
        renderer: &dyn crate::topics::TopicRenderer,
        bucket: &ProjectBucket,
        report: &BucketReport,
    ) -> String {
        let mut s = String::from("<div class=\"bucket\">\n");
        s.push_str(&format!("<h3>{} {}</h3>\n", escape_html(&bucket.label), tag(report.status)));

        match bucket.authoritative() {
            Some(run) => {
                if let Some(fail_on) = &run.metadata.fail_on {
                    s.push_str(&format!("<p class=\"muted\">Gating threshold: {}</p>\n", escape_html(fail_on)));
                }
                s.push_str(&Self::kv_table(&renderer.render_overview(&run.summary.overview)));
                if let Some(body) = &run.summary.html_body {
                    s.push_str(&format!("<div class=\"producer-body\">{body}</div>\n"));
                }
                for table in renderer.render_rule_table(&run.summary.rule_snapshots) {
                    s.push_str(&Self::table(&table));
                }
            }
            None => s.push_str("<p class=\"muted\">No run-level summary for this context.</p>\n"),
        }

        for page in bucket.display_pages() {
            s.push_str(&Self::page_card(&renderer.render_page_card(&page)));
        }
        s.push_str("</div>\n");
        s
    }

    fn page_card(card: &PageCard) -> String {
        let mut c = String::new();
        c.push_str(&format!(
            "<details class=\"card\"><summary>{} {}",
            tag(card.status),
            escape_html(&card.title)
        ));
        if let Some(sub) = &card.subtitle {
            c.push_str(&format!(" <span class=\"muted\">{}</span>", escape_html(sub)));
        }
        c.push_str("</summary>\n");
        if !card.facts.is_empty() {
            c.push_str(&Self::kv_table(&card.facts));
        }
        for table in &card.tables {
            c.push_str(&Self::table(table));
        }
        c.push_str("</details>\n");
        c
    }

    fn kv_table(rows: &[MetricRow]) -> String {
        if rows.is_empty() {
            return String::new();
        }
        let mut t = String::from("<table class=\"kv\"><tbody>\n");
        for row in rows {
            t.push_str(&format!(
                "<tr class=\"tone-{}\"><th>{}</th><td>{}</td></tr>\n",
                row.tone.class(),
                escape_html(&row.label),
                escape_html(&row.value)
            ));
        }
        t.push_str("</tbody></table>\n");
        t
    }

    fn table(table: &Table) -> String {
        let mut t = String::from("<table class=\"grid\">");
        if let Some(caption) = &table.caption {
            t.push_str(&format!("<caption>{}</caption>", escape_html(caption)));
        }
        t.push_str("<thead><tr>");
        for h in &table.headers {
            t.push_str(&format!("<th>{}</th>", escape_html(h)));
        }
        t.push_str("</tr></thead><tbody>\n");
        for row in &table.rows {
            t.push_str("<tr>");
            for cell in row {
                t.push_str(&format!("<td>{}</td>", Self::cell(cell)));
            }
            t.push_str("</tr>\n");
        }
        t.push_str("</tbody></table>\n");
        t
    }

    fn cell(value: &str) -> String {
        let escaped = escape_html(value);
        if (value.starts_with("https://") || value.starts_with("http://")) && !value.contains(char::is_whitespace) {
            format!("<a href=\"{escaped}\" rel=\"noopener\">{escaped}</a>")
        } else {
            escaped
        }
    }

    fn controls(filter: bool) -> &'static str {
        if filter {
            "<div class=\"controls\" data-script-only hidden><input type=\"search\" id=\"test-filter\" placeholder=\"Filter tests\"><button type=\"button\" data-action=\"expand\">Expand all</button><button type=\"button\" data-action=\"collapse\">Collapse all</button></div>\n"
        } else {
            "<div class=\"controls\" data-script-only hidden><button type=\"button\" data-action=\"expand\">Expand all</button><button type=\"button\" data-action=\"collapse\">Collapse all</button></div>\n"
        }
    }

    /// CSS rules binding each radio input to its panel and nav label
    fn view_css(view: &ReportView) -> String {
        let mut css = String::new();
        for panel in view.panels() {
            css.push_str(&format!(
                "#{0}:checked ~ .shell #{1}{{display:block}}\n#{0}:checked ~ .shell label[for=\"{0}\"]{{background:var(--surface2);color:var(--text)}}\n",
                panel.input_id(),
                panel.panel_id()
            ));
        }
        css
    }

    // ─── Static template pieces ───────────────────────────────────────────

    fn template_css() -> &'static str {
        r#":root{--bg:#0d0d11;--surface:#16161b;--surface2:#1e1e24;--border:#2a2a32;--text:#e4e4e7;--muted:#71717a;--green:#22c55e;--yellow:#eab308;--orange:#f97316;--red:#ef4444;--blue:#3b82f6;--radius:8px}
*{box-sizing:border-box;margin:0;padding:0}
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Oxygen,sans-serif;background:var(--bg);color:var(--text);line-height:1.5;min-height:100vh}
.view-toggle{position:absolute;opacity:0;pointer-events:none}
.shell{display:grid;grid-template-columns:260px 1fr;grid-template-rows:auto 1fr;min-height:100vh}
@media(max-width:960px){.shell{grid-template-columns:1fr}}
header{grid-column:1/-1;padding:1.25rem 1.5rem;border-bottom:1px solid var(--border);display:flex;align-items:center;gap:1rem;flex-wrap:wrap}
header h1{font-size:1.125rem;font-weight:700}
.meta{font-size:.8125rem;color:var(--muted);width:100%}
.sidebar{border-right:1px solid var(--border);padding:1rem;background:var(--surface)}
.sidebar h3{font-size:.75rem;text-transform:uppercase;letter-spacing:.5px;color:var(--muted);margin:1rem 0 .375rem}
.nav-item{display:flex;justify-content:space-between;align-items:center;padding:.35rem .5rem;border-radius:6px;cursor:pointer;font-size:.8125rem;color:var(--muted)}
.nav-item:hover{color:var(--text)}
.cnt{font-size:.75rem;color:var(--muted)}
main{padding:1.25rem 1.5rem;overflow-x:auto}
.panel{display:none}
.panel h2{font-size:1.125rem;margin-bottom:.75rem;display:flex;gap:.5rem;align-items:center}
.bucket{border:1px solid var(--border);border-radius:var(--radius);padding:1rem;margin:1rem 0;background:var(--surface)}
.bucket h3{font-size:.9375rem;margin-bottom:.5rem;display:flex;gap:.5rem;align-items:center}
.stats{display:flex;flex-wrap:wrap;gap:0;border:1px solid var(--border);border-radius:var(--radius);margin-bottom:1rem;background:var(--surface)}
.stat{flex:1;min-width:110px;padding:.75rem 1rem;border-right:1px solid var(--border);text-align:center}
.stat:last-child{border-right:none}
.stat .val{font-size:1.375rem;font-weight:700;display:block}
.stat .lbl{font-size:.75rem;color:var(--muted);text-transform:uppercase;letter-spacing:.5px}
table{border-collapse:collapse;margin:.5rem 0;font-size:.8125rem;width:100%}
caption{text-align:left;font-weight:600;padding:.25rem 0}
th,td{border-bottom:1px solid var(--border);padding:.3rem .5rem;text-align:left;vertical-align:top}
table.kv{width:auto}
table.kv th{color:var(--muted);font-weight:500;padding-right:1.5rem}
tr.tone-bad td{color:var(--red);font-weight:600}
tr.tone-warn td{color:var(--yellow)}
tr.tone-good td{color:var(--green)}
.tag{display:inline-block;font-size:.6875rem;font-weight:700;text-transform:uppercase;padding:.05rem .45rem;border-radius:4px;background:var(--surface2)}
.tag-pass,.tag-passed{color:var(--green)}
.tag-warn,.tag-flaky,.tag-skipped{color:var(--yellow)}
.tag-fail,.tag-failed,.tag-timedOut{color:var(--red)}
.tag-interrupted,.tag-unknown{color:var(--orange)}
details{border:1px solid var(--border);border-radius:6px;margin:.5rem 0;padding:.4rem .75rem;background:var(--bg)}
summary{cursor:pointer;font-size:.8125rem}
.attempt{border-left:2px solid var(--border);padding-left:.75rem;margin:.5rem 0}
.attempt h4{font-size:.8125rem;font-weight:600}
pre{white-space:pre-wrap;word-break:break-word;font-size:.75rem;background:var(--surface);padding:.5rem;border-radius:6px;margin:.25rem 0;max-height:24rem;overflow:auto}
pre.error{color:var(--red)}
.artifact{margin:.4rem 0;font-size:.8125rem}
.artifact img{display:block;max-width:100%;margin-top:.25rem;border:1px solid var(--border)}
.omitted p{color:var(--muted);font-style:italic}
.muted{color:var(--muted);font-size:.8125rem}
.notice{color:var(--yellow);font-size:.8125rem;margin:.5rem 0}
.justification{color:var(--muted);margin-bottom:.5rem}
.controls{display:flex;gap:.5rem;margin:.5rem 0}
.controls[hidden]{display:none}
.controls input,.controls button{background:var(--surface);border:1px solid var(--border);border-radius:6px;color:var(--text);padding:.3rem .6rem;font-size:.8125rem}
label.link{cursor:pointer;color:var(--blue)}
a{color:var(--blue)}
"#
    }

    fn template_script() -> &'static str {
        r#"<script>
(function(){
  document.querySelectorAll('[data-script-only]').forEach(function(el){el.hidden=false;});
  document.querySelectorAll('[data-action]').forEach(function(btn){
    btn.addEventListener('click',function(){
      var open=btn.getAttribute('data-action')==='expand';
      var scope=btn.closest('.panel')||document;
      scope.querySelectorAll('details').forEach(function(d){d.open=open;});
    });
  });
  var filter=document.getElementById('test-filter');
  if(filter){
    filter.addEventListener('input',function(){
      var q=filter.value.trim().toLowerCase();
      document.querySelectorAll('.test-row').forEach(function(row){
        row.hidden=q!==''&&row.getAttribute('data-search').indexOf(q)===-1;
      });
    });
  }
})();
</script>
"#
    }
}

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateOptions;
    use crate::collector::{AttachmentInput, AttemptResult, InlineLimits, ReportSession};
    use crate::schema::SCHEMA_ID;
    use crate::{TestIdentity, TestStatus};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn identity(id: &str, project: &str) -> TestIdentity {
        TestIdentity {
            id: id.into(),
            title_path: vec!["site.spec.ts".into(), format!("<b>{id}</b>")],
            file: "site.spec.ts".into(),
            line: 10,
            project: Some(project.into()),
        }
    }

    fn run_with(summaries: Vec<serde_json::Value>) -> RunRecord {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut session = ReportSession::new(InlineLimits::default()).with_run_id("20260301-090000-abcdef12");
        session.on_run_begin(1, t0);
        let mut result = AttemptResult::new(TestStatus::Passed, t0, 1200)
            .with_attachment(AttachmentInput::bytes("log", "text/plain", "hello <world>"));
        for s in summaries {
            result = result.with_attachment(AttachmentInput::bytes(
                "summary",
                "application/json",
                serde_json::to_vec(&s).unwrap(),
            ));
        }
        session.on_test_attempt_complete(identity("checks", "Chrome"), result);
        session.on_run_end(t0 + chrono::Duration::seconds(5), false)
    }

    fn render(run: &RunRecord, initial: Option<&str>) -> String {
        let report = AggregatedReport::from_run(run, &AggregateOptions::default());
        let view = ReportView::new(&report, initial);
        HtmlReporter::new().report(run, &report, &view)
    }

    #[test]
    fn escapes_all_special_characters() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn panels_switch_without_script() {
        let run = run_with(vec![json!({
            "schema": SCHEMA_ID, "version": 1, "kind": "run-summary",
            "baseName": "internal-links", "overview": { "totalLinks": 12, "brokenCount": 0 }
        })]);
        let html = render(&run, Some("internal-links"));
        assert!(html.contains(r#"<input type="radio" name="view" class="view-toggle" id="view-summary">"#));
        assert!(html.contains(r#"id="view-topic-internal-links" checked>"#));
        assert!(html.contains("#view-topic-internal-links:checked ~ .shell #panel-topic-internal-links{display:block}"));
        assert!(html.contains(r#"<label class="nav-item" for="view-topic-internal-links">"#));
        assert!(html.contains("<tr class=\"tone-neutral\"><th>Total Links</th><td>12</td></tr>"));
        assert!(html.contains("<tr class=\"tone-neutral\"><th>Broken</th><td>0</td></tr>"));
    }

    #[test]
    fn script_controls_start_hidden() {
        let html = render(&run_with(vec![]), None);
        assert!(html.contains("data-script-only hidden"));
        assert!(html.contains(r#"id="view-summary" checked>"#));
        assert!(html.contains("No topic summaries were reported"));
    }

    #[test]
    fn site_strings_are_escaped() {
        let html = render(&run_with(vec![]), None);
        assert!(html.contains("&lt;b&gt;checks&lt;/b&gt;"));
        assert!(!html.contains("<b>checks</b>"));
        assert!(html.contains("hello &lt;world&gt;"));
    }

    #[test]
    fn omitted_artifacts_show_reason() {
        let a = Artifact::omitted("trace", "application/zip", "binary payload of 10 bytes exceeds inline limit of 5 bytes", Some(10), Some(5));
        let out = HtmlReporter::artifact(&a);
        assert!(out.contains("Omitted: binary payload of 10 bytes exceeds inline limit of 5 bytes"));
    }

    #[test]
    fn help_urls_become_links() {
        assert_eq!(
            HtmlReporter::cell("https://example.test/rule"),
            "<a href=\"https://example.test/rule\" rel=\"noopener\">https://example.test/rule</a>"
        );
        assert_eq!(HtmlReporter::cell("plain"), "plain");
    }
}
