//! Performance budgets and web vitals

use super::{array_table, card_status, format_value, humanize_key, MetricRow, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;
use serde_json::Value;

pub struct PerformanceRenderer;

impl PerformanceRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PerformanceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// A budget entry is breached when flagged so, or when `actual > budget`
fn breached(entry: &Value) -> bool {
    if let Some(passed) = entry.get("passed").and_then(Value::as_bool) {
        return !passed;
    }
    match (
        entry.get("actual").and_then(Value::as_f64),
        entry.get("budget").and_then(Value::as_f64),
    ) {
        (Some(actual), Some(budget)) => actual > budget,
        _ => false,
    }
}

impl TopicRenderer for PerformanceRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Performance
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("pagesMeasured", "Pages Measured"),
            ("budgetBreaches", "Budget Breaches"),
            ("pagesOverBudget", "Pages Over Budget"),
            ("nearBudget", "Near Budget"),
        ]
    }

    fn rule_group_label(&self) -> &'static str {
        "Category"
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let budgets: &[Value] = summary
            .get("budgets")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let breaches = budgets.iter().filter(|b| breached(b)).count() as u64;

        let mut card = PageCard::for_page(page, card_status(breaches, 0));
        card.facts.push(MetricRow::new("Budget Breaches", breaches.to_string()));
        if let Some(metrics) = summary.get("metrics").and_then(Value::as_object) {
            card.facts.extend(
                metrics
                    .iter()
                    .map(|(k, v)| MetricRow::new(vital_label(k), format_value(v))),
            );
        }

        if !budgets.is_empty() {
            let mut table = array_table(
                "Budgets",
                summary.get("budgets"),
                &[("metric", "Metric"), ("budget", "Budget"), ("actual", "Actual")],
            );
            table.headers.push("Result".to_string());
            for (row, entry) in table.rows.iter_mut().zip(budgets) {
                row.push(if breached(entry) { "over" } else { "ok" }.to_string());
            }
            card.push_table(table);
        }
        card
    }
}

fn vital_label(key: &str) -> String {
    match key.to_ascii_lowercase().as_str() {
        "lcp" => "LCP".to_string(),
        "fcp" => "FCP".to_string(),
        "cls" => "CLS".to_string(),
        "tbt" => "TBT".to_string(),
        "ttfb" => "TTFB".to_string(),
        "inp" => "INP".to_string(),
        _ => humanize_key(key),
    }
}
