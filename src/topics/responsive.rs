//! Responsive layout coverage across viewports

use super::{array_table, card_status, count_field, scalar_facts, MetricRow, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;

pub struct ResponsiveRenderer;

impl ResponsiveRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResponsiveRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRenderer for ResponsiveRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Responsive
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("viewportsChecked", "Viewports Checked"),
            ("totalGatingFindings", "Gating Findings"),
            ("gatingPages", "Pages With Gating Issues"),
            ("advisoryPages", "Pages With Advisories"),
        ]
    }

    fn rule_group_label(&self) -> &'static str {
        "Category"
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let overflow = count_field(summary, "horizontalOverflow");
        let layout = count_field(summary, "layoutIssues");
        let missing = count_field(summary, "missingLandmarks");

        let mut card = PageCard::for_page(page, card_status(overflow.saturating_add(layout), missing));
        card.facts.push(MetricRow::new("Horizontal Overflow", overflow.to_string()));
        card.facts.push(MetricRow::new("Layout Issues", layout.to_string()));
        card.facts.push(MetricRow::new("Missing Landmarks", missing.to_string()));
        card.facts.extend(scalar_facts(summary, &[("width", "Width"), ("height", "Height")]));

        let element_columns: &[(&str, &str)] = &[("selector", "Element"), ("issue", "Issue")];
        card.push_table(array_table("Overflowing elements", summary.get("horizontalOverflow"), element_columns));
        card.push_table(array_table("Layout issues", summary.get("layoutIssues"), element_columns));
        card.push_table(array_table("Missing landmarks", summary.get("missingLandmarks"), &[]));
        card
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Status;
    use crate::schema::{PageSummary, SummaryMetadata};
    use serde_json::json;

    #[test]
    fn overflow_fails_and_landmarks_warn() {
        let entry = |summary| PageEntry {
            test_id: "t".into(),
            project: None,
            title: None,
            metadata: SummaryMetadata::default(),
            summary: PageSummary {
                page: "/".into(),
                viewport: Some("mobile".into()),
                summary,
            },
        };
        let renderer = ResponsiveRenderer::new();
        let card = renderer.render_page_card(&entry(json!({
            "width": 375,
            "horizontalOverflow": [{ "selector": ".hero img", "issue": "wider than viewport" }]
        })));
        assert_eq!(card.status, Status::Fail);
        assert!(card.facts.iter().any(|f| f.label == "Width" && f.value == "375"));

        let card = renderer.render_page_card(&entry(json!({ "missingLandmarks": ["main", "nav"] })));
        assert_eq!(card.status, Status::Warn);
        assert_eq!(card.tables[0].rows, vec![vec!["main".to_string()], vec!["nav".to_string()]]);
    }
}
