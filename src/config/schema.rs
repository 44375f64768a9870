//! Config schema and deserialization

use crate::collector::InlineLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Report root used when neither config nor CLI names one
pub const DEFAULT_OUTPUT_DIR: &str = "test-results/run-reports";

/// Partial inline limits; unset fields fall back to the base config, then
/// to the built-in defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_text_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_binary_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_text_chars: Option<usize>,
}

impl InlineConfig {
    pub fn resolve(&self) -> InlineLimits {
        let d = InlineLimits::default();
        InlineLimits {
            max_text_bytes: self.max_text_bytes.unwrap_or(d.max_text_bytes),
            max_image_bytes: self.max_image_bytes.unwrap_or(d.max_image_bytes),
            max_binary_bytes: self.max_binary_bytes.unwrap_or(d.max_binary_bytes),
            max_text_chars: self.max_text_chars.unwrap_or(d.max_text_chars),
        }
    }

    fn merge_from(&mut self, base: InlineConfig) {
        self.max_text_bytes = self.max_text_bytes.or(base.max_text_bytes);
        self.max_image_bytes = self.max_image_bytes.or(base.max_image_bytes);
        self.max_binary_bytes = self.max_binary_bytes.or(base.max_binary_bytes);
        self.max_text_chars = self.max_text_chars.or(base.max_text_chars);
    }
}

/// Root config structure for .runreportrc.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Report root directory (manifest, latest pointer, runs/)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Report title; defaults to "Test Run Report"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Site under test, shown in the report header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    /// Check profile name, shown in the report header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Attachment embedding limits
    #[serde(default)]
    pub inline: InlineConfig,

    /// Glob patterns over topic base names to leave out of the report
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_topics: Vec<String>,

    /// Panel shown when the report opens: summary, tests, or a topic base name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_view: Option<String>,
}

/// Values from the command line; set fields win over the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub title: Option<String>,
    pub site: Option<String>,
    pub profile: Option<String>,
    pub initial_view: Option<String>,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if cli.output_dir.is_some() {
            self.output_dir = cli.output_dir;
        }
        if cli.title.is_some() {
            self.title = cli.title;
        }
        if cli.site.is_some() {
            self.site = cli.site;
        }
        if cli.profile.is_some() {
            self.profile = cli.profile;
        }
        if cli.initial_view.is_some() {
            self.initial_view = cli.initial_view;
        }
        self
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        if self.extends.is_none() {
            self.extends = base.extends;
        }
        if self.output_dir.is_none() {
            self.output_dir = base.output_dir;
        }
        if self.title.is_none() {
            self.title = base.title;
        }
        if self.site.is_none() {
            self.site = base.site;
        }
        if self.profile.is_none() {
            self.profile = base.profile;
        }
        if self.initial_view.is_none() {
            self.initial_view = base.initial_view;
        }
        self.inline.merge_from(base.inline);

        let mut ignores = base.ignore_topics;
        for pattern in self.ignore_topics.drain(..) {
            if !ignores.contains(&pattern) {
                ignores.push(pattern);
            }
        }
        self.ignore_topics = ignores;
    }

    pub fn inline_limits(&self) -> InlineLimits {
        self.inline.resolve()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    /// Config written by `runreport init`
    pub fn starter() -> Self {
        let d = InlineLimits::default();
        Self {
            output_dir: Some(PathBuf::from(DEFAULT_OUTPUT_DIR)),
            title: Some("Test Run Report".to_string()),
            inline: InlineConfig {
                max_text_bytes: Some(d.max_text_bytes),
                max_image_bytes: Some(d.max_image_bytes),
                max_binary_bytes: Some(d.max_binary_bytes),
                max_text_chars: Some(d.max_text_chars),
            },
            initial_view: Some("summary".to_string()),
            ..Self::default()
        }
    }
}
