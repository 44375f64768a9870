//! Metric derivation and severity classification
//!
//! Each topic declares ordered candidate key tables. Blocking counts come from
//! the primary keys (summed) and only when none of them is present from the
//! first present fallback key; the two are never combined.

use crate::TopicKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Add, AddAssign};

/// Severity of a topic or bucket, ordered pass < warn < fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One ordered group of overview keys
#[derive(Debug, Clone, Copy)]
pub enum Candidates {
    /// Summed when any is present
    PrimaryKeys(&'static [&'static str]),
    /// First present key wins ("pages affected" style counters)
    FallbackKeys(&'static [&'static str]),
}

/// Key tables for one topic
#[derive(Debug, Clone, Copy)]
pub struct MetricKeys {
    pub blocking: &'static [Candidates],
    pub warnings: &'static [&'static str],
    pub advisories: &'static [&'static str],
    /// Alternative names for the same counter; the first present wins
    pub affected_pages: &'static [&'static str],
}

const GATING: MetricKeys = MetricKeys {
    blocking: &[
        Candidates::PrimaryKeys(&["totalGatingFindings"]),
        Candidates::FallbackKeys(&["gatingPages", "pagesWithGatingIssues"]),
    ],
    warnings: &["advisoryPages", "warnings"],
    advisories: &["totalAdvisoryFindings", "totalBestPracticeFindings"],
    affected_pages: &["gatingPages", "pagesWithGatingIssues"],
};

const LINKS: MetricKeys = MetricKeys {
    blocking: &[
        Candidates::PrimaryKeys(&["brokenCount", "brokenLinks"]),
        Candidates::FallbackKeys(&["pagesWithBrokenLinks"]),
    ],
    warnings: &["redirectCount", "warnings"],
    advisories: &[],
    affected_pages: &["pagesWithBrokenLinks"],
};

const RESOURCES: MetricKeys = MetricKeys {
    blocking: &[
        Candidates::PrimaryKeys(&["consoleErrors", "failedRequests"]),
        Candidates::FallbackKeys(&["pagesWithErrors"]),
    ],
    warnings: &["consoleWarnings", "warnings"],
    advisories: &[],
    affected_pages: &["pagesWithErrors"],
};

const AVAILABILITY: MetricKeys = MetricKeys {
    blocking: &[
        Candidates::PrimaryKeys(&["failedChecks", "httpErrors"]),
        Candidates::FallbackKeys(&["pagesWithFailures"]),
    ],
    warnings: &["slowResponses", "warnings"],
    advisories: &[],
    affected_pages: &["pagesWithFailures"],
};

const PERFORMANCE: MetricKeys = MetricKeys {
    blocking: &[
        Candidates::PrimaryKeys(&["budgetBreaches"]),
        Candidates::FallbackKeys(&["pagesOverBudget"]),
    ],
    warnings: &["nearBudget", "warnings"],
    advisories: &[],
    affected_pages: &["pagesOverBudget"],
};

const VISUAL: MetricKeys = MetricKeys {
    blocking: &[
        Candidates::PrimaryKeys(&["visualDiffs", "diffCount"]),
        Candidates::FallbackKeys(&["pagesWithDiffs"]),
    ],
    warnings: &["missingBaselines", "warnings"],
    advisories: &[],
    affected_pages: &["pagesWithDiffs"],
};

impl MetricKeys {
    pub fn for_topic(kind: TopicKind) -> &'static MetricKeys {
        match kind {
            TopicKind::Links => &LINKS,
            TopicKind::Resources => &RESOURCES,
            TopicKind::Availability => &AVAILABILITY,
            TopicKind::Performance => &PERFORMANCE,
            TopicKind::Visual => &VISUAL,
            TopicKind::Accessibility
            | TopicKind::Forms
            | TopicKind::Keyboard
            | TopicKind::Responsive
            | TopicKind::Other => &GATING,
        }
    }

    fn blocking(&self, overview: &Map<String, Value>) -> u64 {
        for candidates in self.blocking {
            match candidates {
                Candidates::PrimaryKeys(keys) => {
                    let present: Vec<u64> = keys.iter().filter_map(|k| lookup(overview, k)).collect();
                    if !present.is_empty() {
                        return present.iter().fold(0u64, |acc, v| acc.saturating_add(*v));
                    }
                }
                Candidates::FallbackKeys(keys) => {
                    if let Some(v) = keys.iter().find_map(|k| lookup(overview, k)) {
                        return v;
                    }
                }
            }
        }
        0
    }
}

/// Interpret an overview value as a count. Negative, fractional-negative and
/// non-numeric values are not counts.
pub fn numeric(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn lookup(overview: &Map<String, Value>, key: &str) -> Option<u64> {
    overview.get(key).and_then(numeric)
}

fn sum_present(overview: &Map<String, Value>, keys: &[&str]) -> u64 {
    keys.iter()
        .filter_map(|k| lookup(overview, k))
        .fold(0u64, u64::saturating_add)
}

/// Counters derived for one bucket, or summed over a topic. Sums saturate at
/// `u64::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub blocking: u64,
    pub warnings: u64,
    pub advisories: u64,
    /// Display only; never affects status
    pub affected_pages: u64,
}

impl Metrics {
    pub fn derive(kind: TopicKind, overview: &Map<String, Value>) -> Self {
        let keys = MetricKeys::for_topic(kind);
        Self {
            blocking: keys.blocking(overview),
            warnings: sum_present(overview, keys.warnings),
            advisories: sum_present(overview, keys.advisories),
            affected_pages: keys
                .affected_pages
                .iter()
                .find_map(|k| lookup(overview, k))
                .unwrap_or(0),
        }
    }

    pub fn status(&self) -> Status {
        if self.blocking > 0 {
            Status::Fail
        } else if self.warnings.saturating_add(self.advisories) > 0 {
            Status::Warn
        } else {
            Status::Pass
        }
    }

    /// Short human-readable reason for the status
    pub fn justification(&self) -> String {
        match self.status() {
            Status::Fail => {
                let mut s = format!("{} blocking {}", self.blocking, plural(self.blocking, "finding", "findings"));
                if self.affected_pages > 0 {
                    s.push_str(&format!(
                        " on {} {}",
                        self.affected_pages,
                        plural(self.affected_pages, "page", "pages")
                    ));
                }
                s
            }
            Status::Warn => {
                let mut parts = Vec::new();
                if self.warnings > 0 {
                    parts.push(format!("{} {}", self.warnings, plural(self.warnings, "warning", "warnings")));
                }
                if self.advisories > 0 {
                    parts.push(format!(
                        "{} {}",
                        self.advisories,
                        plural(self.advisories, "advisory finding", "advisory findings")
                    ));
                }
                format!("no blocking findings; {}", parts.join(", "))
            }
            Status::Pass => "no blocking or advisory findings".to_string(),
        }
    }
}

fn plural(n: u64, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}

impl Add for Metrics {
    type Output = Metrics;

    fn add(self, rhs: Metrics) -> Metrics {
        Metrics {
            blocking: self.blocking.saturating_add(rhs.blocking),
            warnings: self.warnings.saturating_add(rhs.warnings),
            advisories: self.advisories.saturating_add(rhs.advisories),
            affected_pages: self.affected_pages.saturating_add(rhs.affected_pages),
        }
    }
}

impl AddAssign for Metrics {
    fn add_assign(&mut self, rhs: Metrics) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Metrics {
    fn sum<I: Iterator<Item = Metrics>>(iter: I) -> Self {
        iter.fold(Metrics::default(), Add::add)
    }
}
