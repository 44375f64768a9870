//! Declarative view state for the interactive report
//!
//! The selected panel is rendered as a checked radio input; CSS sibling
//! selectors show the matching panel. No script is involved.

use crate::aggregate::AggregatedReport;

/// Identity of one switchable panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelId {
    Summary,
    Tests,
    /// Topic panel keyed by its slug
    Topic(String),
}

impl PanelId {
    /// Suffix shared by the radio input, nav label and panel element ids
    pub fn dom_id(&self) -> String {
        match self {
            PanelId::Summary => "summary".to_string(),
            PanelId::Tests => "tests".to_string(),
            PanelId::Topic(slug) => format!("topic-{slug}"),
        }
    }

    pub fn input_id(&self) -> String {
        format!("view-{}", self.dom_id())
    }

    pub fn panel_id(&self) -> String {
        format!("panel-{}", self.dom_id())
    }
}

/// All panels of a report plus the one shown on load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    /// Topic panels as (base name, panel id), in report order
    topics: Vec<(String, PanelId)>,
    selected: PanelId,
}

impl ReportView {
    /// Build the view for a report. `initial` names `summary`, `tests`, or a
    /// topic `baseName`; anything else selects the summary panel.
    pub fn new(report: &AggregatedReport, initial: Option<&str>) -> Self {
        let mut topics: Vec<(String, PanelId)> = Vec::new();
        for topic in report.panels() {
            let base = slugify(topic.base_name());
            let mut slug = base.clone();
            let mut n = 2;
            while topics.iter().any(|(_, p)| *p == PanelId::Topic(slug.clone())) {
                slug = format!("{base}-{n}");
                n += 1;
            }
            topics.push((topic.base_name().to_string(), PanelId::Topic(slug)));
        }

        let selected = match initial.map(str::trim) {
            None | Some("") | Some("summary") => PanelId::Summary,
            Some("tests") => PanelId::Tests,
            Some(name) => match topics.iter().find(|(b, _)| b == name) {
                Some((_, id)) => id.clone(),
                None => {
                    tracing::warn!(view = name, "initial view names no rendered panel; showing summary");
                    PanelId::Summary
                }
            },
        };
        Self { topics, selected }
    }

    pub fn selected(&self) -> &PanelId {
        &self.selected
    }

    pub fn is_selected(&self, panel: &PanelId) -> bool {
        self.selected == *panel
    }

    /// Panel id of a topic panel
    pub fn topic_panel(&self, base_name: &str) -> Option<&PanelId> {
        self.topics.iter().find(|(b, _)| b == base_name).map(|(_, p)| p)
    }

    /// Every panel: summary, tests, then topics
    pub fn panels(&self) -> Vec<PanelId> {
        let mut out = vec![PanelId::Summary, PanelId::Tests];
        out.extend(self.topics.iter().map(|(_, p)| p.clone()));
        out
    }
}

/// Lowercase ASCII slug safe for element ids
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "topic".to_string()
    } else {
        out
    }
}
