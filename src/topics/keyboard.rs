//! Keyboard navigation and focus checks

use super::{array_table, card_status, count_field, scalar_facts, MetricRow, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;

pub struct KeyboardRenderer;

impl KeyboardRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KeyboardRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRenderer for KeyboardRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Keyboard
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("focusableElements", "Focusable Elements"),
            ("totalGatingFindings", "Gating Findings"),
            ("gatingPages", "Pages With Gating Issues"),
        ]
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let traps = count_field(summary, "focusTraps");
        let missing_skip = summary
            .get("skipLink")
            .and_then(|v| v.as_bool())
            .map(|present| !present)
            .unwrap_or(false);
        let blocking = traps.saturating_add(count_field(summary, "unreachable"));
        let warnings = count_field(summary, "missingFocusIndicator").saturating_add(u64::from(missing_skip));

        let mut card = PageCard::for_page(page, card_status(blocking, warnings));
        card.facts.push(MetricRow::new("Focus Traps", traps.to_string()));
        card.facts.push(MetricRow::new(
            "Unreachable",
            count_field(summary, "unreachable").to_string(),
        ));
        card.facts.push(MetricRow::new(
            "Missing Focus Indicator",
            count_field(summary, "missingFocusIndicator").to_string(),
        ));
        card.facts.extend(scalar_facts(summary, &[("tabStops", "Tab Stops"), ("skipLink", "Skip Link")]));

        let element_columns: &[(&str, &str)] = &[("selector", "Element"), ("role", "Role"), ("note", "Note")];
        card.push_table(array_table("Focus traps", summary.get("focusTraps"), element_columns));
        card.push_table(array_table("Unreachable elements", summary.get("unreachable"), element_columns));
        card.push_table(array_table(
            "Missing focus indicator",
            summary.get("missingFocusIndicator"),
            element_columns,
        ));
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
            project: None,
            title: None,
            metadata: SummaryMetadata::default(),
            summary: PageSummary {
                page: "/".into(),
                viewport: None,
                summary,
            },
        }
    }

    #[test]
    fn missing_skip_link_warns() {
        let card = KeyboardRenderer::new().render_page_card(&entry(json!({ "tabStops": 14, "skipLink": false })));
        assert_eq!(card.status, Status::Warn);
        assert!(card.facts.iter().any(|f| f.label == "Tab Stops" && f.value == "14"));
    }

    #[test]
    fn focus_trap_fails() {
        let card = KeyboardRenderer::new().render_page_card(&entry(json!({
            "focusTraps": [{ "selector": "#modal", "role": "dialog" }]
        })));
        assert_eq!(card.status, Status::Fail);
        assert_eq!(card.tables[0].rows[0], vec!["#modal", "dialog", ""]);
    }
}
