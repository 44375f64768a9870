//! Fallback for topics without a dedicated renderer

use super::{card_status, generic_card, sum_fields, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;

/// Renders any finding record: scalars as facts, arrays as tables
pub struct GenericRenderer;

impl GenericRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenericRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRenderer for GenericRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Other
    }

    fn rule_group_label(&self) -> &'static str {
        "Category"
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let mut card = generic_card(page, &[]);
        card.status = card_status(
            sum_fields(summary, &["gating", "errors"]),
            sum_fields(summary, &["advisories", "warnings"]),
        );
        card
    }
}
