//! Property tests for grouping and classification.

use proptest::prelude::*;
use runreport::aggregate::{group_summaries, AggregateOptions, AggregatedReport, Metrics, Status};
use runreport::schema::{validate, SummaryRecord, SCHEMA_ID};
use runreport::TopicKind;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const BASES: [&str; 3] = ["wcag", "internal-links", "console-errors"];
const PROJECTS: [&str; 3] = ["Chrome", "Firefox", "WebKit"];

#[derive(Debug, Clone)]
struct Spec {
    base: usize,
    project: usize,
    page: Option<u8>,
}

impl Spec {
    /// Duplicate run entries in one bucket resolve to the first arrival, so
    /// counts are a function of (topic, project) to keep statuses comparable.
    fn blocking(&self) -> u64 {
        ((self.base + self.project) % 3) as u64
    }
}

fn record(i: usize, spec: &Spec) -> SummaryRecord {
    let base = BASES[spec.base];
    let project = PROJECTS[spec.project];
    let value = match spec.page {
        None => json!({
            "schema": SCHEMA_ID, "version": 1, "kind": "run-summary", "baseName": base,
            "metadata": { "projectName": project },
            "overview": { "totalGatingFindings": spec.blocking(), "brokenCount": spec.blocking(), "consoleErrors": spec.blocking() }
        }),
        Some(p) => json!({
            "schema": SCHEMA_ID, "version": 1, "kind": "page-summary", "baseName": base,
            "metadata": { "projectName": project },
            "page": format!("/page-{p}"), "viewport": "desktop", "summary": {}
        }),
    };
    SummaryRecord {
        test_id: format!("t{i}"),
        project: Some(project.to_string()),
        attempt: 0,
        payload: validate(value).unwrap(),
    }
}

fn spec_strategy() -> impl Strategy<Value = Spec> {
    (0..BASES.len(), 0..PROJECTS.len(), prop::option::of(0u8..4))
        .prop_map(|(base, project, page)| Spec { base, project, page })
}

/// (base, bucket) → sorted test ids
fn membership(records: &[SummaryRecord]) -> BTreeMap<(String, String), Vec<String>> {
    let mut out = BTreeMap::new();
    for group in group_summaries(records) {
        for bucket in group.buckets {
            let mut ids: Vec<String> = bucket
                .runs
                .iter()
                .map(|r| r.test_id.clone())
                .chain(bucket.pages.iter().map(|p| p.test_id.clone()))
                .collect();
            ids.sort();
            out.insert((group.base_name.clone(), bucket.label.clone()), ids);
        }
    }
    out
}

fn overview(blocking: u64, advisories: u64) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("totalGatingFindings".into(), json!(blocking));
    m.insert("totalAdvisoryFindings".into(), json!(advisories));
    m
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn grouping_membership_ignores_arrival_order(
        (specs, order) in prop::collection::vec(spec_strategy(), 0..12).prop_flat_map(|v| {
            let n = v.len();
            (Just(v), Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
        })
    ) {
        let forward: Vec<SummaryRecord> = specs.iter().enumerate().map(|(i, s)| record(i, s)).collect();
        let permuted: Vec<SummaryRecord> = order.iter().map(|&i| forward[i].clone()).collect();
        prop_assert_eq!(membership(&forward), membership(&permuted));

        let a = AggregatedReport::build(&forward, &AggregateOptions::default());
        let b = AggregatedReport::build(&permuted, &AggregateOptions::default());
        let statuses = |r: &AggregatedReport| {
            let mut v: Vec<(String, Status)> = r.panels().map(|t| (t.base_name().to_string(), t.status)).collect();
            v.sort();
            v
        };
        prop_assert_eq!(statuses(&a), statuses(&b));
        prop_assert_eq!(a.overall_status(), b.overall_status());
    }

    #[test]
    fn detail_pages_entry_is_always_authoritative(detail_first in any::<bool>(), plain_blocking in 0u64..10) {
        let rich = validate(json!({
            "schema": SCHEMA_ID, "version": 1, "kind": "run-summary", "baseName": "wcag",
            "metadata": { "projectName": "Chrome" },
            "overview": { "totalGatingFindings": 1 },
            "details": { "pages": [{ "page": "/", "summary": { "gating": [] } }] }
        })).unwrap();
        let plain = validate(json!({
            "schema": SCHEMA_ID, "version": 1, "kind": "run-summary", "baseName": "wcag",
            "metadata": { "projectName": "Chrome" },
            "overview": { "totalGatingFindings": plain_blocking }
        })).unwrap();
        let wrap = |id: &str, payload| SummaryRecord { test_id: id.into(), project: Some("Chrome".into()), attempt: 0, payload };
        let records = if detail_first {
            vec![wrap("rich", rich), wrap("plain", plain)]
        } else {
            vec![wrap("plain", plain), wrap("rich", rich)]
        };
        let groups = group_summaries(&records);
        let bucket = &groups[0].buckets[0];
        prop_assert_eq!(bucket.authoritative().map(|r| r.test_id.as_str()), Some("rich"));

        let report = AggregatedReport::build(&records, &AggregateOptions::default());
        prop_assert_eq!(report.find("wcag").unwrap().metrics.blocking, 1);
    }

    #[test]
    fn classification_is_monotonic_in_blocking(
        blocking in prop_oneof![0u64..1000, (u64::MAX - 1000)..=u64::MAX],
        extra in prop_oneof![0u64..1000, any::<u64>()],
        advisories in prop_oneof![0u64..5, any::<u64>()],
    ) {
        let raised = blocking.saturating_add(extra);
        let low = Metrics::derive(TopicKind::Accessibility, &overview(blocking, advisories));
        let high = Metrics::derive(TopicKind::Accessibility, &overview(raised, advisories));
        prop_assert!(high.status() >= low.status());
        if raised > 0 {
            prop_assert_eq!(high.status(), Status::Fail);
        }
    }

    #[test]
    fn bucket_sums_never_wrap_to_pass(a in any::<u64>(), b in 1u64..=u64::MAX, warn_a in any::<u64>(), warn_b in any::<u64>()) {
        let bucket = |project: &str, blocking: u64, warnings: u64| SummaryRecord {
            test_id: format!("{project}-t"),
            project: Some(project.to_string()),
            attempt: 0,
            payload: validate(json!({
                "schema": SCHEMA_ID, "version": 1, "kind": "run-summary", "baseName": "wcag",
                "metadata": { "projectName": project },
                "overview": { "totalGatingFindings": blocking, "advisoryPages": warnings, "warnings": warn_b }
            })).unwrap(),
        };
        let records = vec![bucket("Chrome", a, warn_a), bucket("Firefox", b, warn_a)];
        let report = AggregatedReport::build(&records, &AggregateOptions::default());
        let topic = report.find("wcag").unwrap();
        prop_assert!(topic.metrics.blocking >= a.max(b));
        prop_assert_eq!(topic.status, Status::Fail);
    }

    #[test]
    fn metric_extraction_never_panics(ref key in "[a-zA-Z]{1,20}", ref value in prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>().prop_map(|f| json!(f)),
        ".{0,12}".prop_map(|s| json!(s)),
        Just(Value::Null),
        Just(json!([1, 2, 3])),
    ]) {
        let mut m = Map::new();
        m.insert(key.clone(), value.clone());
        for kind in [TopicKind::Accessibility, TopicKind::Links, TopicKind::Performance, TopicKind::Other] {
            let _ = Metrics::derive(kind, &m).status();
        }
    }
}
