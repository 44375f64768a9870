//! Result collector: builds the run record from lifecycle callbacks
//!
//! The host framework serializes reporter callbacks, so a [`ReportSession`]
//! needs no locking. It is created at run start, fed one event at a time, and
//! consumed by [`ReportSession::on_run_end`] into an immutable [`RunRecord`].

mod attachments;

use crate::schema::SummaryRecord;
use crate::{Attempt, Environment, RunRecord, RunStatus, StatusCounts, TestError, TestIdentity, TestRecord, TestStatus};
use attachments::Decoded;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

/// Size ceilings for embedding attachment payloads in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineLimits {
    /// Text and JSON payloads larger than this are omitted
    pub max_text_bytes: u64,
    /// Images larger than this are omitted
    pub max_image_bytes: u64,
    /// Other binary payloads larger than this are omitted
    pub max_binary_bytes: u64,
    /// Embedded text is truncated to this many characters
    pub max_text_chars: usize,
}

impl Default for InlineLimits {
    fn default() -> Self {
        Self {
            max_text_bytes: 256 * 1024,
            max_image_bytes: 1024 * 1024,
            max_binary_bytes: 64 * 1024,
            max_text_chars: 20_000,
        }
    }
}

/// Where an attachment's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentPayload {
    Bytes(Vec<u8>),
    Path(PathBuf),
    /// The producer handed over something that could not be decoded
    Unreadable(String),
    Missing,
}

/// An attachment as reported by the framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInput {
    pub name: String,
    pub media_type: String,
    pub payload: AttachmentPayload,
}

impl AttachmentInput {
    pub fn bytes(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            payload: AttachmentPayload::Bytes(bytes.into()),
        }
    }

    pub fn path(name: impl Into<String>, media_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            payload: AttachmentPayload::Path(path.into()),
        }
    }
}

/// Result of one test attempt as reported by the framework
#[derive(Debug, Clone)]
pub struct AttemptResult {
    pub status: TestStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Worker / execution context label
    pub worker: Option<String>,
    pub attachments: Vec<AttachmentInput>,
    pub errors: Vec<TestError>,
}

impl AttemptResult {
    pub fn new(status: TestStatus, started_at: DateTime<Utc>, duration_ms: u64) -> Self {
        Self {
            status,
            started_at,
            duration_ms,
            worker: None,
            attachments: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: AttachmentInput) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>, stack: Option<String>) -> Self {
        self.errors.push(TestError {
            message: message.into(),
            stack,
        });
        self
    }
}

/// In-progress accumulator for one run
pub struct ReportSession {
    run_id: String,
    title: Option<String>,
    limits: InlineLimits,
    environment: Environment,
    started_at: Option<DateTime<Utc>>,
    planned_tests: usize,
    tests: Vec<TestRecord>,
    index: HashMap<String, usize>,
    summaries: Vec<SummaryRecord>,
    rejected_summaries: usize,
}

impl ReportSession {
    /// Create a session with a freshly generated run id
    pub fn new(limits: InlineLimits) -> Self {
        Self {
            run_id: generate_run_id(Utc::now()),
            title: None,
            limits,
            environment: Environment::detect(None, None),
            started_at: None,
            planned_tests: 0,
            tests: Vec::new(),
            index: HashMap::new(),
            summaries: Vec::new(),
            rejected_summaries: 0,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Record the run start. The planned count is informational only.
    pub fn on_run_begin(&mut self, planned_tests: usize, started_at: DateTime<Utc>) {
        tracing::debug!(run_id = %self.run_id, planned_tests, "run started");
        self.started_at = Some(started_at);
        self.planned_tests = planned_tests;
    }

    /// Append one completed attempt, creating the test record on first sight.
    pub fn on_test_attempt_complete(&mut self, identity: TestIdentity, result: AttemptResult) {
        let idx = match self.index.get(&identity.id) {
            Some(&i) => i,
            None => {
                let i = self.tests.len();
                self.index.insert(identity.id.clone(), i);
                self.tests.push(TestRecord::new(identity));
                i
            }
        };

        let attempt_index = self.tests[idx].attempts.len();
        let test_id = self.tests[idx].identity.id.clone();
        let project = self.tests[idx].identity.project.clone();

        let mut artifacts = Vec::with_capacity(result.attachments.len());
        for input in result.attachments {
            match attachments::decode(input, &self.limits, &test_id) {
                Decoded::Artifact(a) => artifacts.push(a),
                Decoded::Rejected(a) => {
                    self.rejected_summaries += 1;
                    artifacts.push(a);
                }
                Decoded::Summary(payload) => self.summaries.push(SummaryRecord {
                    test_id: test_id.clone(),
                    project: project.clone(),
                    attempt: attempt_index,
                    payload: *payload,
                }),
            }
        }

        tracing::debug!(
            test_id = %test_id,
            attempt = attempt_index,
            status = %result.status,
            artifacts = artifacts.len(),
            "attempt recorded"
        );

        self.tests[idx].attempts.push(Attempt {
            index: attempt_index,
            status: result.status,
            started_at: result.started_at,
            duration_ms: result.duration_ms,
            worker: result.worker,
            artifacts,
            errors: result.errors,
        });
    }

    /// Freeze the run. `interrupted` marks a run that ended without the
    /// framework's normal end signal; whatever completed is still reported.
    pub fn on_run_end(self, ended_at: DateTime<Utc>, interrupted: bool) -> RunRecord {
        let counts = StatusCounts::from_tests(&self.tests);
        let started_at = self
            .started_at
            .or_else(|| self.tests.iter().flat_map(|t| t.attempts.iter()).map(|a| a.started_at).min())
            .unwrap_or(ended_at);
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        let status = RunStatus::from_counts(&counts, interrupted);

        tracing::info!(
            run_id = %self.run_id,
            tests = self.tests.len(),
            summaries = self.summaries.len(),
            rejected = self.rejected_summaries,
            status = %status,
            "run finished"
        );

        RunRecord {
            run_id: self.run_id,
            title: self.title,
            started_at,
            ended_at,
            duration_ms,
            planned_tests: self.planned_tests,
            status,
            counts,
            environment: self.environment,
            tests: self.tests,
            summaries: self.summaries,
            rejected_summaries: self.rejected_summaries,
        }
    }
}

/// Run ids look like `20261017-101500-3fa9c2d1`: sortable timestamp plus a
/// short hash of the start instant and process id.
pub fn generate_run_id(at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(at.to_rfc3339().as_bytes());
    hasher.update(at.timestamp_subsec_nanos().to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}", at.format("%Y%m%d-%H%M%S"), &digest[..8])
}
