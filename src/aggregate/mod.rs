//! Aggregation: topic groups, bucket metrics and run-wide rollups
//!
//! Everything here is pure. The input is the ordered list of validated summary
//! records from a [`RunRecord`]; the output is an [`AggregatedReport`] that
//! both renderers consume.

pub mod group;
pub mod metrics;

pub use group::{group_summaries, PageEntry, ProjectBucket, RunEntry, TopicGroup, DEFAULT_BUCKET, RUN_BUCKET};
pub use metrics::{Candidates, MetricKeys, Metrics, Status};

use crate::schema::SummaryRecord;
use crate::{Domain, RunRecord};
use globset::GlobSet;
use std::collections::BTreeSet;

/// Knobs for [`AggregatedReport::build`]
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Topics whose `baseName` matches are dropped before grouping
    pub ignore_topics: Option<GlobSet>,
}

/// Metrics for one execution-context bucket
#[derive(Debug, Clone, PartialEq)]
pub struct BucketReport {
    pub label: String,
    pub metrics: Metrics,
    pub status: Status,
    /// Buckets without a run entry show page cards but contribute no metrics
    pub has_run_entry: bool,
}

/// A topic group with its classification
#[derive(Debug, Clone, PartialEq)]
pub struct TopicReport {
    pub group: TopicGroup,
    /// Parallel to `group.buckets`
    pub buckets: Vec<BucketReport>,
    pub metrics: Metrics,
    pub status: Status,
    pub justification: String,
}

impl TopicReport {
    fn classify(group: TopicGroup) -> Self {
        let buckets: Vec<BucketReport> = group
            .buckets
            .iter()
            .map(|bucket| {
                let metrics = bucket
                    .authoritative()
                    .map(|run| Metrics::derive(group.topic, &run.summary.overview))
                    .unwrap_or_default();
                BucketReport {
                    label: bucket.label.clone(),
                    metrics,
                    status: metrics.status(),
                    has_run_entry: !bucket.runs.is_empty(),
                }
            })
            .collect();
        let metrics: Metrics = buckets.iter().map(|b| b.metrics).sum();
        Self {
            status: metrics.status(),
            justification: metrics.justification(),
            metrics,
            buckets,
            group,
        }
    }

    /// Topics with no run entry anywhere are not given a panel
    pub fn is_renderable(&self) -> bool {
        self.group.has_run_entry()
    }

    pub fn base_name(&self) -> &str {
        &self.group.base_name
    }

    pub fn title(&self) -> String {
        self.group.display_title()
    }

    pub fn domain(&self) -> Domain {
        self.group.topic.domain()
    }
}

/// The classified, render-ready view of a run's summaries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedReport {
    pub topics: Vec<TopicReport>,
}

impl AggregatedReport {
    pub fn build(records: &[SummaryRecord], options: &AggregateOptions) -> Self {
        let kept: Vec<SummaryRecord> = match &options.ignore_topics {
            Some(set) => records
                .iter()
                .filter(|r| {
                    let ignored = set.is_match(&r.payload.base_name);
                    if ignored {
                        tracing::debug!(base_name = %r.payload.base_name, "ignoring topic");
                    }
                    !ignored
                })
                .cloned()
                .collect(),
            None => records.to_vec(),
        };

        let topics: Vec<TopicReport> = group_summaries(&kept)
            .into_iter()
            .map(TopicReport::classify)
            .collect();

        for topic in topics.iter().filter(|t| !t.is_renderable()) {
            tracing::debug!(
                base_name = %topic.base_name(),
                "topic has page entries only; no panel rendered"
            );
        }

        Self { topics }
    }

    pub fn from_run(run: &RunRecord, options: &AggregateOptions) -> Self {
        Self::build(&run.summaries, options)
    }

    /// Topics that get a panel, in first-seen order
    pub fn panels(&self) -> impl Iterator<Item = &TopicReport> {
        self.topics.iter().filter(|t| t.is_renderable())
    }

    /// Panels of one domain, in first-seen order
    pub fn panels_in(&self, domain: Domain) -> impl Iterator<Item = &TopicReport> {
        self.panels().filter(move |t| t.domain() == domain)
    }

    pub fn find(&self, base_name: &str) -> Option<&TopicReport> {
        self.topics.iter().find(|t| t.base_name() == base_name)
    }

    /// Worst status across rendered topics
    pub fn overall_status(&self) -> Status {
        self.panels().map(|t| t.status).max().unwrap_or(Status::Pass)
    }

    pub fn blocking_total(&self) -> u64 {
        self.panels()
            .map(|t| t.metrics.blocking)
            .fold(0u64, u64::saturating_add)
    }

    /// Distinct pages referenced by rendered topics (page entries, detail
    /// pages and rule snapshots)
    pub fn pages_scanned(&self) -> usize {
        let mut pages: BTreeSet<&str> = BTreeSet::new();
        for topic in self.panels() {
            for bucket in &topic.group.buckets {
                for page in &bucket.pages {
                    pages.insert(page.summary.page.as_str());
                }
                for run in &bucket.runs {
                    for rule in &run.summary.rule_snapshots {
                        pages.extend(rule.pages.iter().map(String::as_str));
                    }
                    if let Some(items) = run.summary.detail_pages() {
                        pages.extend(items.iter().filter_map(|i| {
                            i.get("page").or_else(|| i.get("url")).and_then(|v| v.as_str())
                        }));
                    }
                }
            }
        }
        pages.len()
    }

    /// Execution contexts with findings, excluding synthetic bucket labels
    pub fn browsers(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for topic in self.panels() {
            for bucket in &topic.group.buckets {
                let label = bucket.label.as_str();
                if label != RUN_BUCKET && label != DEFAULT_BUCKET && !out.iter().any(|b| b == label) {
                    out.push(label.to_string());
                }
            }
        }
        out
    }

    /// Number of check executions: one per bucket with a run entry
    pub fn total_checks(&self) -> usize {
        self.panels()
            .map(|t| t.buckets.iter().filter(|b| b.has_run_entry).count())
            .sum()
    }

    pub fn status_counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for topic in self.panels() {
            match topic.status {
                Status::Pass => counts.0 += 1,
                Status::Warn => counts.1 += 1,
                Status::Fail => counts.2 += 1,
            }
        }
        counts
    }
}
