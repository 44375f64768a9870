//! Topic renderers
//!
//! Each topic turns its payloads into format-neutral fragments (metric rows,
//! tables, page cards). The HTML and Markdown reporters lay out the same
//! fragments, so every number appears identically in both documents.

pub mod accessibility;
pub mod availability;
pub mod forms;
pub mod generic;
pub mod keyboard;
pub mod links;
pub mod performance;
pub mod resources;
pub mod responsive;
pub mod visual;

pub use accessibility::AccessibilityRenderer;
pub use availability::AvailabilityRenderer;
pub use forms::FormsRenderer;
pub use generic::GenericRenderer;
pub use keyboard::KeyboardRenderer;
pub use links::LinksRenderer;
pub use performance::PerformanceRenderer;
pub use resources::ResourcesRenderer;
pub use responsive::ResponsiveRenderer;
pub use visual::VisualRenderer;

use crate::aggregate::{MetricKeys, PageEntry, Status};
use crate::schema::RuleSnapshot;
use crate::TopicKind;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Visual emphasis of a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Good,
    Warn,
    Bad,
}

impl Tone {
    pub fn class(self) -> &'static str {
        match self {
            Tone::Neutral => "neutral",
            Tone::Good => "good",
            Tone::Warn => "warn",
            Tone::Bad => "bad",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub label: String,
    pub value: String,
    pub tone: Tone,
}

impl MetricRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            tone: Tone::Neutral,
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Collapsible per-page block
#[derive(Debug, Clone, PartialEq)]
pub struct PageCard {
    pub title: String,
    pub subtitle: Option<String>,
    pub status: Status,
    pub facts: Vec<MetricRow>,
    pub tables: Vec<Table>,
}

impl PageCard {
    /// Card titled by the page with its viewport as subtitle
    pub fn for_page(page: &PageEntry, status: Status) -> Self {
        Self {
            title: page.summary.page.clone(),
            subtitle: page.viewport().map(str::to_string),
            status,
            facts: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn push_table(&mut self, table: Table) {
        if !table.is_empty() {
            self.tables.push(table);
        }
    }
}

/// One renderer per topic kind
pub trait TopicRenderer: Send + Sync {
    fn kind(&self) -> TopicKind;

    /// Overview keys that get a fixed label instead of the humanized key
    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Heading of the rule-table grouping column
    fn rule_group_label(&self) -> &'static str {
        "Impact"
    }

    fn render_overview(&self, overview: &Map<String, Value>) -> Vec<MetricRow> {
        overview_rows(overview, self.labels(), MetricKeys::for_topic(self.kind()))
    }

    fn render_rule_table(&self, rules: &[RuleSnapshot]) -> Vec<Table> {
        rule_tables(rules, self.rule_group_label())
    }

    fn render_page_card(&self, page: &PageEntry) -> PageCard;
}

/// Registry of the closed set of topic renderers
pub struct TopicRegistry {
    renderers: Vec<Box<dyn TopicRenderer>>,
    fallback: GenericRenderer,
}

impl TopicRegistry {
    pub fn builtin() -> Self {
        Self {
            renderers: vec![
                Box::new(AccessibilityRenderer::new()),
                Box::new(FormsRenderer::new()),
                Box::new(KeyboardRenderer::new()),
                Box::new(LinksRenderer::new()),
                Box::new(ResourcesRenderer::new()),
                Box::new(AvailabilityRenderer::new()),
                Box::new(PerformanceRenderer::new()),
                Box::new(VisualRenderer::new()),
                Box::new(ResponsiveRenderer::new()),
            ],
            fallback: GenericRenderer::new(),
        }
    }

    pub fn resolve(&self, kind: TopicKind) -> &dyn TopicRenderer {
        self.renderers
            .iter()
            .find(|r| r.kind() == kind)
            .map(|r| r.as_ref())
            .unwrap_or(&self.fallback)
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap())
}

/// `totalLinks` → `Total Links`, `pages_scanned` → `Pages Scanned`
pub fn humanize_key(key: &str) -> String {
    let spaced = camel_boundary().replace_all(key, "$1 $2");
    spaced
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display form of an overview or finding value, shared by both reporters
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Array(items) => format!("{} items", items.len()),
        Value::Object(map) => format!("{} fields", map.len()),
    }
}

fn is_scalar(v: &Value) -> bool {
    !matches!(v, Value::Array(_) | Value::Object(_))
}

/// Count carried by a finding field: array length, number, or `true` as one
pub fn count_field(summary: &Value, key: &str) -> u64 {
    match summary.get(key) {
        Some(Value::Array(items)) => items.len() as u64,
        Some(Value::Bool(true)) => 1,
        Some(v) => crate::aggregate::metrics::numeric(v).unwrap_or(0),
        None => 0,
    }
}

pub fn sum_fields(summary: &Value, keys: &[&str]) -> u64 {
    keys.iter()
        .map(|k| count_field(summary, k))
        .fold(0u64, u64::saturating_add)
}

pub fn card_status(blocking: u64, warnings: u64) -> Status {
    if blocking > 0 {
        Status::Fail
    } else if warnings > 0 {
        Status::Warn
    } else {
        Status::Pass
    }
}

fn label_for(labels: &[(&str, &str)], key: &str) -> String {
    labels
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, l)| l.to_string())
        .unwrap_or_else(|| humanize_key(key))
}

/// Overview rows: labelled keys first in label order, then the rest sorted.
/// Nested objects are skipped; they belong in details, not the overview.
pub fn overview_rows(
    overview: &Map<String, Value>,
    labels: &[(&str, &str)],
    keys: &MetricKeys,
) -> Vec<MetricRow> {
    let mut ordered: Vec<&str> = labels
        .iter()
        .map(|(k, _)| *k)
        .filter(|k| overview.contains_key(*k))
        .collect();
    let mut rest: Vec<&str> = overview
        .keys()
        .map(String::as_str)
        .filter(|k| !ordered.contains(k))
        .collect();
    rest.sort_unstable();
    ordered.extend(rest);

    ordered
        .into_iter()
        .filter_map(|key| {
            let value = overview.get(key)?;
            if value.is_object() {
                return None;
            }
            let count = crate::aggregate::metrics::numeric(value).unwrap_or(0);
            let tone = if count == 0 {
                Tone::Neutral
            } else if is_blocking_key(keys, key) {
                Tone::Bad
            } else if keys.warnings.contains(&key) || keys.advisories.contains(&key) {
                Tone::Warn
            } else {
                Tone::Neutral
            };
            Some(MetricRow::new(label_for(labels, key), format_value(value)).with_tone(tone))
        })
        .collect()
}

fn is_blocking_key(keys: &MetricKeys, key: &str) -> bool {
    use crate::aggregate::Candidates;
    keys.blocking.iter().any(|c| match c {
        Candidates::PrimaryKeys(ks) | Candidates::FallbackKeys(ks) => ks.contains(&key),
    })
}

const IMPACT_ORDER: [&str; 4] = ["critical", "serious", "moderate", "minor"];

fn impact_rank(impact: &str) -> usize {
    IMPACT_ORDER
        .iter()
        .position(|i| i.eq_ignore_ascii_case(impact))
        .unwrap_or(IMPACT_ORDER.len())
}

/// Rule snapshots grouped by impact/category: known impacts in severity
/// order, then other categories alphabetically, then unclassified rules.
pub fn rule_tables(rules: &[RuleSnapshot], group_label: &str) -> Vec<Table> {
    let mut groups: Vec<(String, Vec<&RuleSnapshot>)> = Vec::new();
    for rule in rules {
        let impact = rule
            .impact
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("unclassified")
            .to_string();
        match groups.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&impact)) {
            Some((_, members)) => members.push(rule),
            None => groups.push((impact, vec![rule])),
        }
    }
    groups.sort_by(|(a, _), (b, _)| {
        let unclassified = |s: &str| s == "unclassified";
        (unclassified(a), impact_rank(a), a.to_ascii_lowercase())
            .cmp(&(unclassified(b), impact_rank(b), b.to_ascii_lowercase()))
    });

    groups
        .into_iter()
        .map(|(impact, members)| Table {
            caption: Some(format!(
                "{}: {} ({} {})",
                group_label,
                humanize_key(&impact),
                members.len(),
                if members.len() == 1 { "rule" } else { "rules" }
            )),
            headers: ["Rule", "Description", "Pages", "Nodes", "Viewports", "Standards", "Help"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: members
                .into_iter()
                .map(|r| {
                    vec![
                        r.rule.clone(),
                        r.description.clone().unwrap_or_default(),
                        r.pages.len().to_string(),
                        r.nodes.to_string(),
                        r.viewports.join(", "),
                        r.standards.join(", "),
                        r.help.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
        })
        .collect()
}

/// Scalar fields of a finding record as facts, labelled keys first
pub fn scalar_facts(summary: &Value, labels: &[(&str, &str)]) -> Vec<MetricRow> {
    let Some(obj) = summary.as_object() else {
        return Vec::new();
    };
    let mut keys: Vec<&str> = labels
        .iter()
        .map(|(k, _)| *k)
        .filter(|k| obj.get(*k).is_some_and(is_scalar))
        .collect();
    let mut rest: Vec<&str> = obj
        .iter()
        .filter(|(k, v)| is_scalar(v) && !keys.contains(&k.as_str()))
        .map(|(k, _)| k.as_str())
        .collect();
    rest.sort_unstable();
    keys.extend(rest);
    keys.into_iter()
        .filter_map(|k| Some(MetricRow::new(label_for(labels, k), format_value(obj.get(k)?))))
        .collect()
}

/// Table from an array of finding objects. With no explicit columns the
/// headers are the union of object keys in first-seen order.
pub fn array_table(caption: &str, items: Option<&Value>, columns: &[(&str, &str)]) -> Table {
    let Some(items) = items.and_then(Value::as_array) else {
        return Table::default();
    };
    let columns: Vec<(String, String)> = if columns.is_empty() {
        let mut keys: Vec<String> = Vec::new();
        for item in items {
            match item.as_object() {
                Some(obj) => {
                    for k in obj.keys() {
                        if !keys.contains(k) {
                            keys.push(k.clone());
                        }
                    }
                }
                None if !keys.iter().any(|k| k == "value") => keys.push("value".to_string()),
                None => {}
            }
        }
        keys.into_iter().map(|k| (humanize_key(&k), k)).collect()
    } else {
        columns
            .iter()
            .map(|(k, h)| (h.to_string(), k.to_string()))
            .collect()
    };

    Table {
        caption: Some(format!("{caption} ({})", items.len())),
        headers: columns.iter().map(|(h, _)| h.clone()).collect(),
        rows: items
            .iter()
            .map(|item| {
                columns
                    .iter()
                    .map(|(_, key)| match item {
                        Value::Object(obj) => obj.get(key).map(format_value).unwrap_or_default(),
                        scalar if key == "value" => format_value(scalar),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect(),
    }
}

/// Card for a finding record of unknown shape
pub fn generic_card(page: &PageEntry, labels: &[(&str, &str)]) -> PageCard {
    let summary = &page.summary.summary;
    let mut card = PageCard::for_page(page, Status::Pass);
    card.facts = scalar_facts(summary, labels);
    if let Some(obj) = summary.as_object() {
        for (key, value) in obj {
            if value.is_array() {
                card.push_table(array_table(&humanize_key(key), Some(value), &[]));
            }
        }
    }
    card
}
