//! WCAG / axe findings

use super::{array_table, card_status, count_field, scalar_facts, sum_fields, MetricRow, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;

const GATING_FIELDS: &[&str] = &["gating", "violations"];
const ADVISORY_FIELDS: &[&str] = &["advisories", "bestPractices"];

const FINDING_COLUMNS: &[(&str, &str)] = &[
    ("id", "Rule"),
    ("impact", "Impact"),
    ("nodes", "Nodes"),
    ("help", "Help"),
];

/// Renderer for accessibility scans
pub struct AccessibilityRenderer;

impl AccessibilityRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AccessibilityRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRenderer for AccessibilityRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Accessibility
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("totalPages", "Pages Scanned"),
            ("totalGatingFindings", "Gating Findings"),
            ("gatingPages", "Pages With Gating Issues"),
            ("totalAdvisoryFindings", "Advisory Findings"),
            ("advisoryPages", "Pages With Advisories"),
            ("totalBestPracticeFindings", "Best-Practice Findings"),
        ]
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let gating = sum_fields(summary, GATING_FIELDS);
        let advisory = sum_fields(summary, ADVISORY_FIELDS);

        let mut card = PageCard::for_page(page, card_status(gating, advisory));
        card.facts.push(MetricRow::new("Gating", gating.to_string()));
        card.facts.push(MetricRow::new("Advisory", count_field(summary, "advisories").to_string()));
        card.facts.push(MetricRow::new(
            "Best Practice",
            count_field(summary, "bestPractices").to_string(),
        ));
        card.facts.extend(scalar_facts(summary, &[]));

        for (field, caption) in [
            ("gating", "Gating violations"),
            ("violations", "Violations"),
            ("advisories", "Advisories"),
            ("bestPractices", "Best practices"),
        ] {
            card.push_table(array_table(caption, summary.get(field), FINDING_COLUMNS));
        }
        card
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Status;
    use crate::schema::{PageSummary, SummaryMetadata};
    use serde_json::json;

    fn entry(summary: serde_json::Value) -> PageEntry {
        PageEntry {
            test_id: "t".into(),
            project: Some("Chrome".into()),
            title: None,
            metadata: SummaryMetadata::default(),
            summary: PageSummary {
                page: "/".into(),
                viewport: Some("desktop".into()),
                summary,
            },
        }
    }

    #[test]
    fn gating_violations_fail_the_card() {
        let card = AccessibilityRenderer::new().render_page_card(&entry(json!({
            "gating": [{ "id": "color-contrast", "impact": "serious", "nodes": 3 }],
            "advisories": [{ "id": "region", "impact": "moderate", "nodes": 1 }]
        })));
        assert_eq!(card.status, Status::Fail);
        assert_eq!(card.facts[0].value, "1");
        assert_eq!(card.tables.len(), 2);
        assert_eq!(card.tables[0].rows[0], vec!["color-contrast", "serious", "3", ""]);
        assert_eq!(card.subtitle.as_deref(), Some("desktop"));
    }

    #[test]
    fn advisories_only_warn() {
        let card = AccessibilityRenderer::new().render_page_card(&entry(json!({
            "bestPractices": [{ "id": "heading-order" }]
        })));
        assert_eq!(card.status, Status::Warn);
    }
}
