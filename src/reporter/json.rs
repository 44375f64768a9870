//! JSON reporter for machine-readable output

use crate::aggregate::{AggregatedReport, BucketReport, Metrics, Status, TopicReport};
use crate::{Domain, RunRecord, RunStatus, StatusCounts, TopicKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketDigest {
    pub label: String,
    pub status: Status,
    pub metrics: Metrics,
    pub has_run_entry: bool,
}

impl From<&BucketReport> for BucketDigest {
    fn from(b: &BucketReport) -> Self {
        Self {
            label: b.label.clone(),
            status: b.status,
            metrics: b.metrics,
            has_run_entry: b.has_run_entry,
        }
    }
}

/// Classification of one rendered topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDigest {
    pub base_name: String,
    pub title: String,
    pub topic: TopicKind,
    pub domain: Domain,
    pub status: Status,
    pub justification: String,
    pub metrics: Metrics,
    pub buckets: Vec<BucketDigest>,
}

impl From<&TopicReport> for TopicDigest {
    fn from(t: &TopicReport) -> Self {
        Self {
            base_name: t.base_name().to_string(),
            title: t.title(),
            topic: t.group.topic,
            domain: t.domain(),
            status: t.status,
            justification: t.justification.clone(),
            metrics: t.metrics,
            buckets: t.buckets.iter().map(BucketDigest::from).collect(),
        }
    }
}

/// Digests of every rendered topic, in report order
pub fn topic_digests(report: &AggregatedReport) -> Vec<TopicDigest> {
    report.panels().map(TopicDigest::from).collect()
}

/// Compact summary of a run for CI consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDigest {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: RunStatus,
    pub counts: StatusCounts,
    pub overall_status: Status,
    pub pages_scanned: usize,
    pub browsers: Vec<String>,
    pub topics: Vec<TopicDigest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
}

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn digest(run: &RunRecord, report: &AggregatedReport, report_path: Option<String>) -> RunDigest {
        RunDigest {
            run_id: run.run_id.clone(),
            started_at: run.started_at,
            ended_at: run.ended_at,
            duration_ms: run.duration_ms,
            status: run.status,
            counts: run.counts,
            overall_status: report.overall_status(),
            pages_scanned: report.pages_scanned(),
            browsers: report.browsers(),
            topics: topic_digests(report),
            report_path,
        }
    }

    pub fn report(&self, run: &RunRecord, report: &AggregatedReport, report_path: Option<String>) -> String {
        let digest = Self::digest(run, report, report_path);
        if self.pretty {
            serde_json::to_string_pretty(&digest).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&digest).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}
