//! Configuration loading for runreport

mod schema;

pub use schema::{CliOverrides, Config, InlineConfig, DEFAULT_OUTPUT_DIR};

use crate::aggregate::AggregateOptions;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".runreportrc.json";

/// Find and load config file with extends resolution. Searches current directory then parents.
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = custom_path {
        let path = if p.is_absolute() {
            p.to_path_buf()
        } else {
            work_dir.join(p)
        };
        if path.exists() {
            Some(path)
        } else {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    } else {
        find_config_in_parents(work_dir)
    };

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_config_with_extends(&path, &mut HashSet::new())
        }
        None => Ok(Config::default()),
    }
}

/// Load a config file and resolve extends chain
fn load_config_with_extends(config_path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Config> {
    let canonical = config_path
        .canonicalize()
        .unwrap_or_else(|_| config_path.to_path_buf());
    if !visited.insert(canonical) {
        anyhow::bail!(
            "Circular extends detected in config: {}",
            config_path.display()
        );
    }

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
    let mut config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in config: {}", config_path.display()))?;

    // Relative output dirs are anchored at the file that names them
    if let Some(dir) = config.output_dir.take() {
        config.output_dir = Some(if dir.is_relative() {
            config_path.parent().unwrap_or(Path::new(".")).join(dir)
        } else {
            dir
        });
    }

    if let Some(extends) = config.extends.take() {
        let base_config = resolve_extends(config_path, &extends, visited)?;
        config.merge_from(base_config);
    }

    Ok(config)
}

/// Resolve an extends reference relative to the referencing file
fn resolve_extends(
    config_path: &Path,
    extends: &str,
    visited: &mut HashSet<PathBuf>,
) -> Result<Config> {
    let config_dir = config_path.parent().unwrap_or(Path::new("."));
    let extends_path = if Path::new(extends).is_absolute() {
        PathBuf::from(extends)
    } else {
        config_dir.join(extends)
    };
    let extends_path = if extends_path.extension().is_none() {
        extends_path.with_extension("json")
    } else {
        extends_path
    };

    if !extends_path.exists() {
        anyhow::bail!(
            "Extended config not found: {} (referenced from {})",
            extends_path.display(),
            config_path.display()
        );
    }

    load_config_with_extends(&extends_path, visited)
}

/// Search for .runreportrc.json in directory and its parents
fn find_config_in_parents(mut dir: &Path) -> Option<PathBuf> {
    loop {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Build a GlobSet from topic ignore patterns
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("Invalid ignoreTopics pattern: {}", pattern))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| anyhow::anyhow!("{}", e))
}

/// Aggregation options derived from config
pub fn aggregate_options(config: &Config) -> Result<AggregateOptions> {
    let ignore_topics = if config.ignore_topics.is_empty() {
        None
    } else {
        Some(build_ignore_set(&config.ignore_topics)?)
    };
    Ok(AggregateOptions { ignore_topics })
}

/// Write the starter config into `dir`. Refuses to overwrite unless `force`.
pub fn write_default_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILENAME);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    let json = serde_json::to_string_pretty(&Config::starter()).context("Failed to serialize config")?;
    fs::write(&path, format!("{json}\n"))
        .with_context(|| format!("Failed to write config: {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn missing_custom_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path(), Some(Path::new("none.json"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn config_found_in_parent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{ "title": "Nightly" }"#).unwrap();
        let nested = dir.path().join("e2e/specs");
        fs::create_dir_all(&nested).unwrap();
        let config = load_config(&nested, None).unwrap();
        assert_eq!(config.title.as_deref(), Some("Nightly"));
    }

    #[test]
    fn ignore_topics_match_base_names() {
        let set = build_ignore_set(&["visual-*".to_string(), "perf*".to_string()]).unwrap();
        assert!(set.is_match("visual-regression"));
        assert!(set.is_match("performance-budgets"));
        assert!(!set.is_match("wcag"));
        assert!(build_ignore_set(&["[".to_string()]).is_err());
    }

    #[test]
    fn test_config_extends() {
        let dir = TempDir::new().unwrap();

        let base_path = dir.path().join("base.json");
        let mut base_file = fs::File::create(&base_path).unwrap();
        writeln!(
            base_file,
            r#"{{
                "site": "https://example.test",
                "inline": {{ "maxTextBytes": 1000, "maxTextChars": 50 }},
                "ignoreTopics": ["visual-*"]
            }}"#
        )
        .unwrap();

        let child_path = dir.path().join(CONFIG_FILENAME);
        let mut child_file = fs::File::create(&child_path).unwrap();
        writeln!(
            child_file,
            r#"{{
                "extends": "./base.json",
                "site": "https://staging.example.test",
                "inline": {{ "maxTextChars": 80 }},
                "ignoreTopics": ["perf*"]
            }}"#
        )
        .unwrap();

        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.site.as_deref(), Some("https://staging.example.test"));
        let limits = config.inline_limits();
        assert_eq!(limits.max_text_bytes, 1000);
        assert_eq!(limits.max_text_chars, 80);
        assert_eq!(limits.max_image_bytes, crate::collector::InlineLimits::default().max_image_bytes);
        assert_eq!(config.ignore_topics, vec!["visual-*".to_string(), "perf*".to_string()]);
    }

    #[test]
    fn circular_extends_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json"), r#"{ "extends": "./b.json" }"#).unwrap();
        fs::write(dir.path().join("b.json"), r#"{ "extends": "./a.json" }"#).unwrap();
        let err = load_config(dir.path(), Some(Path::new("a.json"))).unwrap_err();
        assert!(format!("{err:#}").contains("Circular extends"));
    }

    #[test]
    fn relative_output_dir_is_anchored_at_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{ "outputDir": "reports" }"#).unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.output_dir(), dir.path().join("reports"));
    }

    #[test]
    fn cli_overrides_win() {
        let config = Config {
            title: Some("From file".into()),
            site: Some("https://a.test".into()),
            ..Config::default()
        }
        .merge_with_cli(CliOverrides {
            title: Some("From CLI".into()),
            ..CliOverrides::default()
        });
        assert_eq!(config.title.as_deref(), Some("From CLI"));
        assert_eq!(config.site.as_deref(), Some("https://a.test"));
        assert_eq!(config.output_dir(), PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn init_writes_starter_and_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = write_default_config(dir.path(), false).unwrap();
        let loaded = load_config(dir.path(), None).unwrap();
        assert_eq!(loaded.initial_view.as_deref(), Some("summary"));
        assert!(write_default_config(dir.path(), false).is_err());
        assert_eq!(write_default_config(dir.path(), true).unwrap(), path);
    }
}
