//! Summary payload schema and validation
//!
//! Site checks report their findings as JSON attachments tagged with
//! [`SCHEMA_ID`] / [`SCHEMA_VERSION`]. Two shapes exist, discriminated by
//! `kind`: a run-level summary (overview metrics, rule snapshots, details) and
//! a page-level summary (one page, one viewport, topic-specific findings).

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SCHEMA_ID: &str = "runreport.summary";
pub const SCHEMA_VERSION: u32 = 1;

/// Payload discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryKind {
    RunSummary,
    PageSummary,
}

impl SummaryKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "run-summary" => Some(SummaryKind::RunSummary),
            "page-summary" => Some(SummaryKind::PageSummary),
            _ => None,
        }
    }
}

/// Scope a run-level summary covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Run,
    Project,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetadata {
    /// Topic identifier chosen by the producing check
    #[serde(default, alias = "suite", skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub viewports: Vec<String>,
    /// Gating threshold the check applied (e.g. "serious")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<String>,
}

/// Rule-level finding aggregated over the pages of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSnapshot {
    /// Impact (accessibility) or category (other topics)
    #[serde(default, alias = "category", skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(alias = "id")]
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub nodes: u64,
    #[serde(default)]
    pub viewports: Vec<String>,
    #[serde(default, alias = "wcagTags", alias = "tags")]
    pub standards: Vec<String>,
    #[serde(default, alias = "helpUrl", skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    #[serde(default)]
    pub overview: Map<String, Value>,
    #[serde(default)]
    pub rule_snapshots: Vec<RuleSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RunSummary {
    /// Per-page breakdown carried by the richer payload shape
    pub fn detail_pages(&self) -> Option<&Vec<Value>> {
        self.details.as_ref()?.get("pages")?.as_array()
    }

    pub fn has_detail_pages(&self) -> bool {
        self.detail_pages().is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<String>,
    #[serde(default)]
    pub summary: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SummaryBody {
    RunSummary(RunSummary),
    PageSummary(PageSummary),
}

/// A validated summary payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    pub schema: String,
    pub version: u32,
    pub base_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: SummaryMetadata,
    #[serde(flatten)]
    pub body: SummaryBody,
}

impl SummaryPayload {
    pub fn kind(&self) -> SummaryKind {
        match self.body {
            SummaryBody::RunSummary(_) => SummaryKind::RunSummary,
            SummaryBody::PageSummary(_) => SummaryKind::PageSummary,
        }
    }
}

/// A validated payload tagged with the test and execution context it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub test_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Attempt index that produced the payload
    #[serde(default)]
    pub attempt: usize,
    pub payload: SummaryPayload,
}

/// True when a JSON value claims to be a summary payload (whether or not it
/// is a valid one). Used to decide whether a rejection is worth a warning.
pub fn looks_like_summary(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.contains_key("schema") || (o.contains_key("kind") && o.contains_key("baseName")))
}

/// Validate a decoded JSON value against the summary schema.
pub fn validate(value: Value) -> Result<SummaryPayload, SchemaError> {
    let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;

    let schema = obj
        .get("schema")
        .ok_or(SchemaError::MissingField { field: "schema" })?;
    if schema.as_str() != Some(SCHEMA_ID) {
        return Err(SchemaError::UnknownSchema {
            expected: SCHEMA_ID,
            found: value_label(schema),
        });
    }

    let version = obj
        .get("version")
        .ok_or(SchemaError::MissingField { field: "version" })?;
    if version.as_u64() != Some(u64::from(SCHEMA_VERSION)) {
        return Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found: value_label(version),
        });
    }

    let kind = obj
        .get("kind")
        .ok_or(SchemaError::MissingField { field: "kind" })?;
    match kind.as_str() {
        Some(k) if SummaryKind::parse(k).is_some() => {}
        _ => {
            return Err(SchemaError::UnknownKind {
                found: value_label(kind),
            })
        }
    }

    match obj.get("baseName").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => {}
        _ => return Err(SchemaError::MissingBaseName),
    }

    Ok(serde_json::from_value(value)?)
}

fn value_label(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
