//! Link integrity checks

use super::{array_table, card_status, count_field, scalar_facts, MetricRow, PageCard, TopicRenderer};
use crate::aggregate::PageEntry;
use crate::TopicKind;

const LINK_COLUMNS: &[(&str, &str)] = &[("url", "URL"), ("status", "Status"), ("text", "Link Text")];

/// Renderer for internal/external link validation
pub struct LinksRenderer;

impl LinksRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinksRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRenderer for LinksRenderer {
    fn kind(&self) -> TopicKind {
        TopicKind::Links
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("totalLinks", "Total Links"),
            ("checkedLinks", "Checked"),
            ("brokenCount", "Broken"),
            ("brokenLinks", "Broken Links"),
            ("redirectCount", "Redirects"),
            ("pagesWithBrokenLinks", "Pages With Broken Links"),
        ]
    }

    fn rule_group_label(&self) -> &'static str {
        "Category"
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard {
        let summary = &page.summary.summary;
        let broken = count_field(summary, "broken");
        let redirects = count_field(summary, "redirects");

        let mut card = PageCard::for_page(page, card_status(broken, redirects));
        card.facts.push(MetricRow::new("Broken", broken.to_string()));
        card.facts.push(MetricRow::new("Redirects", redirects.to_string()));
        card.facts.extend(scalar_facts(summary, self.labels()));

        card.push_table(array_table("Broken links", summary.get("broken"), LINK_COLUMNS));
        card.push_table(array_table(
            "Redirects",
            summary.get("redirects"),
            &[("url", "URL"), ("status", "Status"), ("location", "Target")],
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

    #[test]
    fn overview_uses_short_labels() {
        let overview = json!({ "totalLinks": 12, "brokenCount": 0 });
        let rows = LinksRenderer::new().render_overview(overview.as_object().unwrap());
        let pairs: Vec<(&str, &str)> = rows.iter().map(|r| (r.label.as_str(), r.value.as_str())).collect();
        assert_eq!(pairs, vec![("Total Links", "12"), ("Broken", "0")]);
    }

    #[test]
    fn broken_links_fail_the_card() {
        let entry = PageEntry {
            test_id: "t".into(),
            project: None,
            title: None,
            metadata: SummaryMetadata::default(),
            summary: PageSummary {
                page: "/blog".into(),
                viewport: None,
                summary: json!({
                    "totalLinks": 30,
                    "broken": [{ "url": "/old", "status": 404, "text": "Old post" }]
                }),
            },
        };
        let card = LinksRenderer::new().render_page_card(&entry);
        assert_eq!(card.status, Status::Fail);
        assert!(card.facts.iter().any(|f| f.label == "Total Links" && f.value == "30"));
        assert_eq!(card.tables[0].rows[0], vec!["/old", "404", "Old post"]);
    }
}
