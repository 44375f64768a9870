//! Topic grouping and per-context bucketing of summary payloads

use crate::schema::{PageSummary, RunSummary, Scope, SummaryBody, SummaryMetadata, SummaryRecord};
use crate::TopicKind;
use serde_json::Value;

/// Label used when neither the payload nor the test names a context
pub const DEFAULT_BUCKET: &str = "default";
/// Label for run-scoped payloads that carry no project name
pub const RUN_BUCKET: &str = "run";

/// A run-level payload with the context it arrived from
#[derive(Debug, Clone, PartialEq)]
pub struct RunEntry {
    pub test_id: String,
    pub project: Option<String>,
    pub title: Option<String>,
    pub metadata: SummaryMetadata,
    pub summary: RunSummary,
}

/// A page-level payload with the context it arrived from
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    pub test_id: String,
    pub project: Option<String>,
    pub title: Option<String>,
    pub metadata: SummaryMetadata,
    pub summary: PageSummary,
}

impl PageEntry {
    pub fn viewport(&self) -> Option<&str> {
        self.summary
            .viewport
            .as_deref()
            .or(self.metadata.viewport.as_deref())
            .filter(|v| !v.is_empty())
    }

    /// Display identity: two entries with the same key describe the same card
    pub fn key(&self) -> (String, String) {
        (
            self.summary.page.clone(),
            self.viewport().unwrap_or_default().to_string(),
        )
    }
}

/// Entries of one topic that share an execution context
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBucket {
    pub label: String,
    pub runs: Vec<RunEntry>,
    pub pages: Vec<PageEntry>,
}

impl ProjectBucket {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            runs: Vec::new(),
            pages: Vec::new(),
        }
    }

    /// The run entry metrics are read from. The richer `details.pages` shape
    /// wins over any entry without it, whatever the arrival order.
    pub fn authoritative(&self) -> Option<&RunEntry> {
        self.runs
            .iter()
            .find(|r| r.summary.has_detail_pages())
            .or_else(|| self.runs.first())
    }

    /// Pages to display, deduplicated by (page, viewport). A colliding key
    /// keeps the position of its first occurrence and the content of its last.
    ///
    /// Pages listed under the authoritative entry's `details.pages` come
    /// first; explicit page entries override them.
    pub fn display_pages(&self) -> Vec<PageEntry> {
        let mut out: Vec<PageEntry> = Vec::new();
        let detail = self.authoritative().map(detail_page_entries).unwrap_or_default();
        for entry in detail.into_iter().chain(self.pages.iter().cloned()) {
            let key = entry.key();
            match out.iter_mut().find(|e| e.key() == key) {
                Some(slot) => *slot = entry,
                None => out.push(entry),
            }
        }
        out
    }
}

/// All payloads sharing one `baseName`
#[derive(Debug, Clone, PartialEq)]
pub struct TopicGroup {
    pub base_name: String,
    /// First non-empty title seen for the topic
    pub title: Option<String>,
    pub topic: TopicKind,
    pub buckets: Vec<ProjectBucket>,
}

impl TopicGroup {
    fn new(base_name: &str) -> Self {
        Self {
            base_name: base_name.to_string(),
            title: None,
            topic: TopicKind::Other,
            buckets: Vec::new(),
        }
    }

    pub fn has_run_entry(&self) -> bool {
        self.buckets.iter().any(|b| !b.runs.is_empty())
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| crate::topics::humanize_key(&self.base_name))
    }

    fn bucket_mut(&mut self, label: &str) -> &mut ProjectBucket {
        let idx = match self.buckets.iter().position(|b| b.label == label) {
            Some(i) => i,
            None => {
                self.buckets.push(ProjectBucket::new(label));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[idx]
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn run_label(record: &SummaryRecord) -> String {
    let meta = &record.payload.metadata;
    non_empty(meta.project_name.as_deref())
        .or_else(|| (meta.scope == Some(Scope::Run)).then_some(RUN_BUCKET))
        .or_else(|| non_empty(record.project.as_deref()))
        .unwrap_or(DEFAULT_BUCKET)
        .to_string()
}

fn page_label(record: &SummaryRecord) -> String {
    non_empty(record.payload.metadata.project_name.as_deref())
        .or_else(|| non_empty(record.project.as_deref()))
        .unwrap_or(DEFAULT_BUCKET)
        .to_string()
}

/// Group summary records by topic, then by execution context.
///
/// Topics and buckets appear in first-seen order; entries keep arrival order
/// within their bucket.
pub fn group_summaries(records: &[SummaryRecord]) -> Vec<TopicGroup> {
    let mut groups: Vec<TopicGroup> = Vec::new();
    let mut topic_hints: Vec<Option<String>> = Vec::new();

    for record in records {
        let payload = &record.payload;
        let idx = match groups.iter().position(|g| g.base_name == payload.base_name) {
            Some(i) => i,
            None => {
                groups.push(TopicGroup::new(&payload.base_name));
                topic_hints.push(None);
                groups.len() - 1
            }
        };
        let group = &mut groups[idx];

        if group.title.is_none() {
            group.title = non_empty(payload.title.as_deref()).map(str::to_string);
        }
        if topic_hints[idx].is_none() {
            topic_hints[idx] = non_empty(payload.metadata.topic.as_deref()).map(str::to_string);
        }

        match &payload.body {
            SummaryBody::RunSummary(summary) => {
                let label = run_label(record);
                group.bucket_mut(&label).runs.push(RunEntry {
                    test_id: record.test_id.clone(),
                    project: record.project.clone(),
                    title: payload.title.clone(),
                    metadata: payload.metadata.clone(),
                    summary: summary.clone(),
                });
            }
            SummaryBody::PageSummary(summary) => {
                let label = page_label(record);
                group.bucket_mut(&label).pages.push(PageEntry {
                    test_id: record.test_id.clone(),
                    project: record.project.clone(),
                    title: payload.title.clone(),
                    metadata: payload.metadata.clone(),
                    summary: summary.clone(),
                });
            }
        }
    }

    for (group, hint) in groups.iter_mut().zip(topic_hints) {
        group.topic = TopicKind::resolve(hint.as_deref(), &group.base_name);
    }
    groups
}

/// Page entries synthesized from a run entry's `details.pages` array.
/// Items without a `page` (or `url`) string are skipped.
pub fn detail_page_entries(run: &RunEntry) -> Vec<PageEntry> {
    let Some(pages) = run.summary.detail_pages() else {
        return Vec::new();
    };
    pages
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let page = obj
                .get("page")
                .or_else(|| obj.get("url"))
                .and_then(Value::as_str)?
                .to_string();
            let viewport = obj
                .get("viewport")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| run.metadata.viewport.clone());
            let summary = match obj.get("summary") {
                Some(inner) => inner.clone(),
                None => {
                    let mut rest = obj.clone();
                    rest.remove("page");
                    rest.remove("url");
                    rest.remove("viewport");
                    Value::Object(rest)
                }
            };
            Some(PageEntry {
                test_id: run.test_id.clone(),
                project: run.project.clone(),
                title: run.title.clone(),
                metadata: run.metadata.clone(),
                summary: PageSummary {
                    page,
                    viewport,
                    summary,
                },
            })
        })
        .collect()
}
