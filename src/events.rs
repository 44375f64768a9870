//! JSON Lines event stream replay
//!
//! One lifecycle event per line:
//!
//! ```text
//! {"event":"begin","plannedTests":3,"startedAt":"2026-05-01T10:00:00Z"}
//! {"event":"attempt","test":{"id":"t1","titlePath":["home"]},"result":{"status":"passed",...}}
//! {"event":"end","endedAt":"2026-05-01T10:02:00Z"}
//! ```
//!
//! Malformed lines are logged and skipped. A stream without an `end` event
//! is still finalized and marked interrupted.

use crate::collector::{AttachmentInput, AttachmentPayload, AttemptResult, ReportSession};
use crate::{Encoding, RunRecord, TestError, TestIdentity, TestStatus};
use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    Begin(BeginEvent),
    Attempt(AttemptEvent),
    End(EndEvent),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginEvent {
    #[serde(default)]
    pub planned_tests: usize,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEvent {
    pub test: TestIdentity,
    pub result: AttemptEventResult,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEventResult {
    pub status: TestStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, alias = "duration")]
    pub duration_ms: u64,
    #[serde(default)]
    pub worker: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentEvent>,
    #[serde(default)]
    pub errors: Vec<TestError>,
    /// Single error, as some frameworks report it
    #[serde(default)]
    pub error: Option<TestError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentEvent {
    pub name: String,
    #[serde(alias = "contentType", default = "default_media_type")]
    pub media_type: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub encoding: Option<Encoding>,
}

fn default_media_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndEvent {
    pub ended_at: DateTime<Utc>,
    #[serde(default)]
    pub interrupted: bool,
}

impl AttachmentEvent {
    /// Resolve to a collector input. Relative paths are taken against `base_dir`.
    pub fn into_input(self, base_dir: &Path) -> AttachmentInput {
        let payload = match (self.body, self.path) {
            (Some(body), _) => match self.encoding.unwrap_or(Encoding::Utf8) {
                Encoding::Utf8 => AttachmentPayload::Bytes(body.into_bytes()),
                Encoding::Base64 => match base64::engine::general_purpose::STANDARD.decode(body.trim()) {
                    Ok(bytes) => AttachmentPayload::Bytes(bytes),
                    Err(e) => AttachmentPayload::Unreadable(format!("invalid base64 body: {e}")),
                },
            },
            (None, Some(path)) if path.is_relative() => AttachmentPayload::Path(base_dir.join(path)),
            (None, Some(path)) => AttachmentPayload::Path(path),
            (None, None) => AttachmentPayload::Missing,
        };
        AttachmentInput {
            name: self.name,
            media_type: self.media_type,
            payload,
        }
    }
}

impl AttemptEventResult {
    pub fn into_result(self, base_dir: &Path) -> AttemptResult {
        let mut errors = self.errors;
        if let Some(e) = self.error {
            if !errors.contains(&e) {
                errors.push(e);
            }
        }
        AttemptResult {
            status: self.status,
            started_at: self.started_at,
            duration_ms: self.duration_ms,
            worker: self.worker,
            attachments: self
                .attachments
                .into_iter()
                .map(|a| a.into_input(base_dir))
                .collect(),
            errors,
        }
    }
}

/// Parse one line; blank lines yield `Ok(None)`
pub fn parse_line(line: &str) -> Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let event = serde_json::from_str(line).context("invalid event")?;
    Ok(Some(event))
}

/// End of an attempt, or `None` when the duration does not fit a timestamp
fn finished_at(started_at: DateTime<Utc>, duration_ms: u64) -> Option<DateTime<Utc>> {
    let ms = i64::try_from(duration_ms).ok()?;
    started_at.checked_add_signed(TimeDelta::try_milliseconds(ms)?)
}

/// Feed every event of `reader` into `session` and finalize the run
pub fn replay<R: BufRead>(reader: R, base_dir: &Path, mut session: ReportSession) -> Result<RunRecord> {
    let mut last_activity: Option<DateTime<Utc>> = None;
    let mut end: Option<EndEvent> = None;
    let mut title: Option<String> = None;

    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read event stream at line {}", n + 1))?;
        let event = match parse_line(&line) {
            Ok(Some(e)) => e,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = n + 1, error = %format!("{e:#}"), "skipping malformed event");
                continue;
            }
        };
        if end.is_some() {
            tracing::warn!(line = n + 1, "event after end of run ignored");
            continue;
        }
        match event {
            Event::Begin(begin) => {
                title = begin.title;
                last_activity = Some(begin.started_at);
                session.on_run_begin(begin.planned_tests, begin.started_at);
            }
            Event::Attempt(attempt) => {
                match finished_at(attempt.result.started_at, attempt.result.duration_ms) {
                    Some(finished) => last_activity = Some(last_activity.map_or(finished, |t| t.max(finished))),
                    None => tracing::warn!(
                        line = n + 1,
                        test_id = %attempt.test.id,
                        duration_ms = attempt.result.duration_ms,
                        "attempt duration out of range; not used for run end time"
                    ),
                }
                session.on_test_attempt_complete(attempt.test, attempt.result.into_result(base_dir));
            }
            Event::End(e) => end = Some(e),
        }
    }

    // A title set by the caller wins over the stream's own
    if session.title().is_none() && title.is_some() {
        session = session.with_title(title);
    }
    Ok(match end {
        Some(e) => session.on_run_end(e.ended_at, e.interrupted),
        None => {
            tracing::warn!(run_id = %session.run_id(), "event stream has no end event; finalizing as interrupted");
            session.on_run_end(last_activity.unwrap_or_else(Utc::now), true)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::InlineLimits;
    use crate::{RunStatus, StatusCounts};
    use std::io::Cursor;

    fn session() -> ReportSession {
        ReportSession::new(InlineLimits::default()).with_run_id("replay")
    }

    const STREAM: &str = r#"{"event":"begin","plannedTests":2,"startedAt":"2026-05-01T10:00:00Z","title":"Nightly"}
{"event":"attempt","test":{"id":"t1","titlePath":["home"],"project":"Chrome"},"result":{"status":"failed","startedAt":"2026-05-01T10:00:01Z","durationMs":500,"error":{"message":"boom"}}}
not json at all
{"event":"attempt","test":{"id":"t1","titlePath":["home"],"project":"Chrome"},"result":{"status":"passed","startedAt":"2026-05-01T10:00:02Z","durationMs":400}}

{"event":"attempt","test":{"id":"t2","titlePath":["about"]},"result":{"status":"passed","startedAt":"2026-05-01T10:00:03Z","durationMs":100,"attachments":[{"name":"log","contentType":"text/plain","body":"hello"}]}}
{"event":"end","endedAt":"2026-05-01T10:01:00Z"}
"#;

    #[test]
    fn replays_stream_skipping_bad_lines() {
        let run = replay(Cursor::new(STREAM), Path::new("."), session()).unwrap();
        assert_eq!(run.title.as_deref(), Some("Nightly"));
        assert_eq!(run.planned_tests, 2);
        assert_eq!(run.tests.len(), 2);
        assert_eq!(run.tests[0].attempts.len(), 2);
        assert_eq!(run.tests[0].attempts[0].errors[0].message, "boom");
        assert_eq!(
            run.counts,
            StatusCounts {
                passed: 1,
                flaky: 1,
                ..Default::default()
            }
        );
        assert_eq!(run.status, RunStatus::Passed);
        assert_eq!(run.duration_ms, 60_000);
        let log = &run.tests[1].attempts[0].artifacts[0];
        assert_eq!(log.body.as_deref(), Some("hello"));
    }

    #[test]
    fn missing_end_marks_run_interrupted() {
        let truncated: String = STREAM.lines().filter(|l| !l.contains("\"end\"")).collect::<Vec<_>>().join("\n");
        let run = replay(Cursor::new(truncated), Path::new("."), session()).unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
        assert_eq!(run.tests.len(), 2);
        // last attempt started at :03 and ran 100 ms
        assert_eq!(run.duration_ms, 3_100);
    }

    #[test]
    fn attachment_sources() {
        let base = Path::new("/fixtures");
        let a: AttachmentEvent =
            serde_json::from_str(r#"{"name":"shot","mediaType":"image/png","path":"img/a.png"}"#).unwrap();
        assert_eq!(a.into_input(base).payload, AttachmentPayload::Path(PathBuf::from("/fixtures/img/a.png")));

        let b: AttachmentEvent =
            serde_json::from_str(r#"{"name":"bin","mediaType":"application/zip","body":"aGk=","encoding":"base64"}"#)
                .unwrap();
        assert_eq!(b.into_input(base).payload, AttachmentPayload::Bytes(b"hi".to_vec()));

        let c: AttachmentEvent =
            serde_json::from_str(r#"{"name":"bad","body":"%%%","encoding":"base64"}"#).unwrap();
        assert!(matches!(c.into_input(base).payload, AttachmentPayload::Unreadable(_)));

        let d: AttachmentEvent = serde_json::from_str(r#"{"name":"nothing"}"#).unwrap();
        assert_eq!(d.into_input(base).payload, AttachmentPayload::Missing);
    }

    #[test]
    fn huge_duration_does_not_abort_replay() {
        let stream = r#"{"event":"begin","plannedTests":2,"startedAt":"2026-05-01T10:00:00Z"}
{"event":"attempt","test":{"id":"slow","titlePath":["slow"]},"result":{"status":"passed","startedAt":"2026-05-01T10:00:01Z","durationMs":9000000000000000000}}
{"event":"attempt","test":{"id":"huge","titlePath":["huge"]},"result":{"status":"passed","startedAt":"2026-05-01T10:00:02Z","durationMs":18446744073709551615}}
"#;
        let run = replay(Cursor::new(stream), Path::new("."), session()).unwrap();
        assert_eq!(run.tests.len(), 2);
        assert_eq!(run.status, RunStatus::Interrupted);
        // neither duration moves the end time past the begin event
        assert_eq!(run.duration_ms, 0);
        assert_eq!(run.tests[1].total_duration_ms(), u64::MAX);
    }

    #[test]
    fn finished_at_rejects_out_of_range_durations() {
        let t0 = "2026-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(finished_at(t0, 1_500), Some(t0 + TimeDelta::milliseconds(1_500)));
        assert_eq!(finished_at(t0, u64::MAX), None);
        assert_eq!(finished_at(t0, 9_000_000_000_000_000_000), None);
    }

    #[test]
    fn blank_lines_parse_to_none() {
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line(r#"{"event":"bogus"}"#).is_err());
    }
}
