//! Visual regression diffs

use super::{card_status, scalar_facts, MetricRow, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;
use serde_json::Value;

pub struct VisualRenderer;

impl VisualRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VisualRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRenderer for VisualRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Visual
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("screenshots", "Screenshots"),
            ("visualDiffs", "Visual Diffs"),
            ("missingBaselines", "Missing Baselines"),
            ("pagesWithDiffs", "Pages With Diffs"),
        ]
    }

    fn rule_group_label(&self) -> &'static str {
        "Category"
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let missing_baseline = summary.get("baselineMissing").and_then(Value::as_bool) == Some(true);
        let ratio = summary.get("diffRatio").and_then(Value::as_f64).unwrap_or(0.0);
        let threshold = summary.get("threshold").and_then(Value::as_f64).unwrap_or(0.0);
        let differs = match summary.get("passed").and_then(Value::as_bool) {
            Some(passed) => !passed,
            None => !missing_baseline && ratio > threshold,
        };

        let mut card = PageCard::for_page(page, card_status(u64::from(differs), u64::from(missing_baseline)));
        let verdict = if missing_baseline {
            "no baseline"
        } else if differs {
            "changed"
        } else {
            "matches"
        };
        card.facts.push(MetricRow::new("Result", verdict));
        card.facts.extend(scalar_facts(
            summary,
            &[
                ("diffPixels", "Diff Pixels"),
                ("diffRatio", "Diff Ratio"),
                ("threshold", "Threshold"),
            ],
        ));
        card
    }
}
