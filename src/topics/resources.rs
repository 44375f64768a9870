//! Console and network resource monitoring

use super::{array_table, card_status, count_field, scalar_facts, MetricRow, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;

pub struct ResourcesRenderer;

impl ResourcesRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResourcesRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRenderer for ResourcesRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Resources
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("consoleErrors", "Console Errors"),
            ("consoleWarnings", "Console Warnings"),
            ("failedRequests", "Failed Requests"),
            ("pagesWithErrors", "Pages With Errors"),
        ]
    }

    fn rule_group_label(&self) -> &'static str {
        "Category"
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let errors = count_field(summary, "consoleErrors");
        let failed = count_field(summary, "failedRequests");
        let warnings = count_field(summary, "consoleWarnings");

        let mut card = PageCard::for_page(page, card_status(errors.saturating_add(failed), warnings));
        card.facts.push(MetricRow::new("Console Errors", errors.to_string()));
        card.facts.push(MetricRow::new("Failed Requests", failed.to_string()));
        card.facts.push(MetricRow::new("Console Warnings", warnings.to_string()));
        card.facts.extend(scalar_facts(summary, &[]));

        let console_columns: &[(&str, &str)] = &[("message", "Message"), ("source", "Source")];
        card.push_table(array_table("Console errors", summary.get("consoleErrors"), console_columns));
        card.push_table(array_table(
            "Failed requests",
            summary.get("failedRequests"),
            &[("method", "Method"), ("url", "URL"), ("status", "Status"), ("failure", "Failure")],
        ));
        card.push_table(array_table("Console warnings", summary.get("consoleWarnings"), console_columns));
        card
    }
}
