//! Form validation checks

use super::{array_table, card_status, count_field, scalar_facts, MetricRow, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;

/// Renderer for form checks (labels, validation, submission)
pub struct FormsRenderer;

impl FormsRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FormsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRenderer for FormsRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Forms
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("formsChecked", "Forms Checked"),
            ("totalGatingFindings", "Gating Findings"),
            ("gatingPages", "Pages With Gating Issues"),
            ("totalAdvisoryFindings", "Advisory Findings"),
        ]
    }

    fn rule_group_label(&self) -> &'static str {
        "Category"
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let gating = count_field(summary, "gating").saturating_add(count_field(summary, "errors"));
        let advisory = count_field(summary, "advisories");

        let mut card = PageCard::for_page(page, card_status(gating, advisory));
        card.facts.push(MetricRow::new("Forms", count_field(summary, "forms").to_string()));
        card.facts.push(MetricRow::new("Gating", gating.to_string()));
        card.facts.push(MetricRow::new("Advisory", advisory.to_string()));
        card.facts.extend(scalar_facts(summary, &[]));

        card.push_table(array_table(
            "Forms",
            summary.get("forms"),
            &[("name", "Form"), ("fields", "Fields"), ("unlabelledFields", "Unlabelled"), ("action", "Action")],
        ));
        let issue_columns: &[(&str, &str)] = &[("field", "Field"), ("issue", "Issue"), ("severity", "Severity")];
        card.push_table(array_table("Gating issues", summary.get("gating"), issue_columns));
        card.push_table(array_table("Errors", summary.get("errors"), issue_columns));
        card.push_table(array_table("Advisories", summary.get("advisories"), issue_columns));
        card
    }
}
