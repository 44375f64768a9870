//! runreport: aggregation and rendering of end-to-end test run reports
//!
//! This library collects test lifecycle events and the schema-tagged summary
//! artifacts emitted by site checks, groups them per topic and execution
//! context, classifies severity, and renders a self-contained interactive
//! HTML report alongside a Markdown twin.

pub mod aggregate;
pub mod collector;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod logging;
pub mod reporter;
pub mod schema;
pub mod topics;
pub mod writer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use schema::SummaryRecord;

/// Outcome of a single test attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    Passed,
    Failed,
    TimedOut,
    Skipped,
    Interrupted,
}

impl TestStatus {
    pub fn is_pass(self) -> bool {
        matches!(self, TestStatus::Passed)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Passed => write!(f, "passed"),
            TestStatus::Failed => write!(f, "failed"),
            TestStatus::TimedOut => write!(f, "timedOut"),
            TestStatus::Skipped => write!(f, "skipped"),
            TestStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Identity of a logical test case, stable across retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestIdentity {
    /// Stable id assigned by the test framework
    pub id: String,
    /// Hierarchical title (file › describe › test)
    #[serde(default)]
    pub title_path: Vec<String>,
    /// Source file of the test
    #[serde(default)]
    pub file: String,
    /// Line of the test declaration (1-indexed)
    #[serde(default)]
    pub line: u32,
    /// Execution context (browser / project name)
    #[serde(default)]
    pub project: Option<String>,
}

impl TestIdentity {
    /// Display title joined from the title path
    pub fn title(&self) -> String {
        join_title(&self.title_path, &self.id)
    }
}

fn join_title(path: &[String], fallback: &str) -> String {
    let parts: Vec<&str> = path
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        fallback.to_string()
    } else {
        parts.join(" › ")
    }
}

/// Error captured by the framework for a failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Broad class of an attachment, derived from its declared media type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Text,
    Json,
    Binary,
}

impl ArtifactKind {
    pub fn from_media_type(media_type: &str) -> Self {
        let mt = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mt.starts_with("image/") {
            ArtifactKind::Image
        } else if mt == "application/json" || mt.ends_with("+json") {
            ArtifactKind::Json
        } else if mt.starts_with("text/")
            || mt == "application/xml"
            || mt == "application/javascript"
            || mt.ends_with("+xml")
        {
            ArtifactKind::Text
        } else {
            ArtifactKind::Binary
        }
    }
}

/// How an embedded artifact body is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
    Base64,
}

/// A named payload attached to one attempt.
///
/// Bodies are either embedded (`body` + `encoding`) or replaced by an
/// omission marker (`omitted`, `reason`, `size_bytes`); never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    pub media_type: String,
    pub kind: ArtifactKind,
    /// Original payload size in bytes (when known)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub omitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Inline limit that applied when the payload was omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    #[serde(default)]
    pub truncated: bool,
}

impl Artifact {
    /// Data URI for embedded images, if the body is present
    pub fn data_uri(&self) -> Option<String> {
        match (&self.body, self.encoding) {
            (Some(body), Some(Encoding::Base64)) => {
                Some(format!("data:{};base64,{}", self.media_type, body))
            }
            _ => None,
        }
    }
}

/// One execution of a test (the first run or a retry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    /// Retry index (0 = first run)
    pub index: usize,
    pub status: TestStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Worker / execution context label reported for this attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub errors: Vec<TestError>,
}

/// Accumulated record of one logical test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    #[serde(flatten)]
    pub identity: TestIdentity,
    pub attempts: Vec<Attempt>,
}

impl TestRecord {
    pub fn new(identity: TestIdentity) -> Self {
        Self {
            identity,
            attempts: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn title(&self) -> String {
        self.identity.title()
    }

    /// Status of the last attempt
    pub fn final_status(&self) -> Option<TestStatus> {
        self.attempts.last().map(|a| a.status)
    }

    /// Passed in the end, but some earlier attempt did not
    pub fn is_flaky(&self) -> bool {
        match self.attempts.split_last() {
            Some((last, earlier)) => {
                last.status.is_pass() && earlier.iter().any(|a| !a.status.is_pass())
            }
            None => false,
        }
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.attempts
            .iter()
            .map(|a| a.duration_ms)
            .fold(0u64, u64::saturating_add)
    }

    pub fn artifact_count(&self) -> usize {
        self.attempts.iter().map(|a| a.artifacts.len()).sum()
    }
}

/// Per-status test counters folded over final statuses.
///
/// Flaky tests are counted under `flaky` only, not under `passed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timed_out: usize,
    pub interrupted: usize,
    pub flaky: usize,
}

impl StatusCounts {
    pub fn from_tests(tests: &[TestRecord]) -> Self {
        let mut counts = Self::default();
        for test in tests {
            counts.record(test);
        }
        counts
    }

    pub fn record(&mut self, test: &TestRecord) {
        if test.is_flaky() {
            self.flaky += 1;
            return;
        }
        match test.final_status() {
            Some(TestStatus::Passed) => self.passed += 1,
            Some(TestStatus::Failed) => self.failed += 1,
            Some(TestStatus::TimedOut) => self.timed_out += 1,
            Some(TestStatus::Skipped) => self.skipped += 1,
            Some(TestStatus::Interrupted) => self.interrupted += 1,
            None => {}
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.timed_out + self.interrupted + self.flaky
    }
}

/// Overall outcome of the test run (independent of topic severity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
    Interrupted,
}

impl RunStatus {
    pub fn from_counts(counts: &StatusCounts, interrupted: bool) -> Self {
        if interrupted || counts.interrupted > 0 {
            RunStatus::Interrupted
        } else if counts.failed > 0 || counts.timed_out > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Passed
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Passed => write!(f, "passed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Where and against what the run executed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub platform: String,
    pub arch: String,
    /// Site under test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// Check profile the run used (e.g. "smoke", "full")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl Environment {
    pub fn detect(site: Option<String>, profile: Option<String>) -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            site,
            profile,
        }
    }
}

/// The frozen result of a run, produced once by `ReportSession::on_run_end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub planned_tests: usize,
    pub status: RunStatus,
    pub counts: StatusCounts,
    pub environment: Environment,
    pub tests: Vec<TestRecord>,
    /// Validated summary payloads in arrival order
    pub summaries: Vec<SummaryRecord>,
    /// Summary-shaped payloads that failed validation and were dropped
    #[serde(default)]
    pub rejected_summaries: usize,
}

impl RunRecord {
    pub fn test(&self, id: &str) -> Option<&TestRecord> {
        self.tests.iter().find(|t| t.id() == id)
    }

    /// Distinct execution contexts that ran tests, in first-seen order
    pub fn projects(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for test in &self.tests {
            if let Some(p) = test.identity.project.as_deref() {
                if !p.is_empty() && !out.iter().any(|x| x == p) {
                    out.push(p.to_string());
                }
            }
        }
        out
    }
}

/// Report section a topic is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Accessibility,
    Functional,
    Responsive,
    Visual,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Accessibility,
        Domain::Functional,
        Domain::Responsive,
        Domain::Visual,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Domain::Accessibility => "Accessibility",
            Domain::Functional => "Functional",
            Domain::Responsive => "Responsive",
            Domain::Visual => "Visual",
        }
    }
}

/// Closed set of check topics the report knows how to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicKind {
    Accessibility,
    Forms,
    Keyboard,
    Links,
    Resources,
    Availability,
    Performance,
    Visual,
    Responsive,
    /// Unrecognized topic; rendered and classified generically
    Other,
}

/// Resolution order for substring matching. Performance precedes Forms so
/// that "performance" is not claimed by the "form" token.
const RESOLUTION_ORDER: [TopicKind; 9] = [
    TopicKind::Performance,
    TopicKind::Forms,
    TopicKind::Keyboard,
    TopicKind::Links,
    TopicKind::Resources,
    TopicKind::Availability,
    TopicKind::Visual,
    TopicKind::Responsive,
    TopicKind::Accessibility,
];

impl TopicKind {
    pub fn id(self) -> &'static str {
        match self {
            TopicKind::Accessibility => "accessibility",
            TopicKind::Forms => "forms",
            TopicKind::Keyboard => "keyboard",
            TopicKind::Links => "links",
            TopicKind::Resources => "resources",
            TopicKind::Availability => "availability",
            TopicKind::Performance => "performance",
            TopicKind::Visual => "visual",
            TopicKind::Responsive => "responsive",
            TopicKind::Other => "other",
        }
    }

    fn tokens(self) -> &'static [&'static str] {
        match self {
            TopicKind::Accessibility => &["wcag", "a11y", "accessib", "axe"],
            TopicKind::Forms => &["forms", "form-", "-form"],
            TopicKind::Keyboard => &["keyboard", "focus", "tab-order"],
            TopicKind::Links => &["link"],
            TopicKind::Resources => &["console", "resource", "network"],
            TopicKind::Availability => &["uptime", "availability", "http"],
            TopicKind::Performance => &["perf", "lighthouse", "budget", "vitals"],
            TopicKind::Visual => &["visual", "screenshot", "pixel"],
            TopicKind::Responsive => &["responsive", "layout", "breakpoint", "structure"],
            TopicKind::Other => &[],
        }
    }

    /// Resolve a topic from an explicit topic identifier, falling back to the
    /// payload's `baseName`.
    pub fn resolve(topic: Option<&str>, base_name: &str) -> Self {
        topic
            .and_then(Self::match_name)
            .or_else(|| Self::match_name(base_name))
            .unwrap_or(TopicKind::Other)
    }

    fn match_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return None;
        }
        if let Some(exact) = RESOLUTION_ORDER.iter().find(|k| k.id() == name) {
            return Some(*exact);
        }
        RESOLUTION_ORDER
            .iter()
            .find(|k| k.tokens().iter().any(|t| name.contains(t)))
            .copied()
    }

    pub fn domain(self) -> Domain {
        match self {
            TopicKind::Accessibility | TopicKind::Keyboard => Domain::Accessibility,
            TopicKind::Responsive => Domain::Responsive,
            TopicKind::Visual => Domain::Visual,
            TopicKind::Forms
            | TopicKind::Links
            | TopicKind::Resources
            | TopicKind::Availability
            | TopicKind::Performance
            | TopicKind::Other => Domain::Functional,
        }
    }
}

impl std::fmt::Display for TopicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
