//! Uptime and HTTP response validation

use super::{array_table, card_status, count_field, scalar_facts, MetricRow, PageCard, Tone, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;
use serde_json::Value;

pub struct AvailabilityRenderer;

impl AvailabilityRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AvailabilityRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// A page is down when it says so or answered with a 4xx/5xx
fn is_down(summary: &Value) -> bool {
    let explicit = summary.get("ok").and_then(Value::as_bool) == Some(false);
    let status = summary.get("status").and_then(Value::as_u64).unwrap_or(0);
    explicit || status >= 400
}

impl TopicRenderer for AvailabilityRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Availability
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("totalChecks", "Checks"),
            ("failedChecks", "Failed"),
            ("slowResponses", "Slow Responses"),
            ("averageResponseMs", "Average Response (ms)"),
        ]
    }

    fn rule_group_label(&self) -> &'static str {
        "Category"
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let down = is_down(summary);
        let slow = summary.get("slow").and_then(Value::as_bool) == Some(true);

        let mut card = PageCard::for_page(page, card_status(u64::from(down), u64::from(slow)));
        card.facts.push(if down {
            MetricRow::new("Reachable", "no").with_tone(Tone::Bad)
        } else {
            MetricRow::new("Reachable", "yes").with_tone(Tone::Good)
        });
        card.facts.extend(scalar_facts(
            summary,
            &[("status", "HTTP Status"), ("responseTimeMs", "Response Time (ms)")],
        ));
        if count_field(summary, "redirectChain") > 0 {
            card.push_table(array_table(
                "Redirect chain",
                summary.get("redirectChain"),
                &[("url", "URL"), ("status", "Status")],
            ));
        }
        card
    }
}
