//! Run history: the rolling manifest and the latest-run pointer
//!
//! Both files live in the report root, outside any run directory, so viewers
//! can locate reports without parsing run records. Reads are tolerant: a
//! missing or corrupt file is treated as empty.

use crate::aggregate::Status;
use crate::error::WriteResult;
use crate::reporter::TopicDigest;
use crate::writer::write_atomic;
use crate::{RunRecord, RunStatus, StatusCounts};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub const MANIFEST_FILENAME: &str = "runs-manifest.json";
pub const LATEST_FILENAME: &str = "latest-run.json";
pub const RUNS_DIR: &str = "runs";
pub const REPORT_FILENAME: &str = "index.html";
pub const MARKDOWN_FILENAME: &str = "report.md";
pub const RECORD_FILENAME: &str = "run.json";
pub const TESTS_DIR: &str = "tests";

/// One run as listed in the manifest. Paths are relative to the report root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: RunStatus,
    /// Worst topic status; absent for runs without topic summaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_status: Option<Status>,
    pub counts: StatusCounts,
    pub run_dir: String,
    pub report_path: String,
    pub markdown_path: String,
    pub record_path: String,
}

impl ManifestEntry {
    pub fn new(run: &RunRecord, topic_status: Option<Status>, dir_name: &str) -> Self {
        let run_dir = format!("{RUNS_DIR}/{dir_name}");
        Self {
            run_id: run.run_id.clone(),
            title: run.title.clone(),
            started_at: run.started_at,
            ended_at: run.ended_at,
            status: run.status,
            topic_status,
            counts: run.counts,
            report_path: format!("{run_dir}/{REPORT_FILENAME}"),
            markdown_path: format!("{run_dir}/{MARKDOWN_FILENAME}"),
            record_path: format!("{run_dir}/{RECORD_FILENAME}"),
            run_dir,
        }
    }
}

/// Pointer to the most recently written run: the run's manifest entry plus
/// the time the pointer was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPointer {
    #[serde(flatten)]
    pub entry: ManifestEntry,
    pub updated_at: DateTime<Utc>,
}

impl From<&ManifestEntry> for LatestPointer {
    fn from(entry: &ManifestEntry) -> Self {
        Self {
            entry: entry.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// The run record document as written to `run.json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRun {
    #[serde(flatten)]
    pub run: RunRecord,
    #[serde(default)]
    pub topics: Vec<TopicDigest>,
}

impl StoredRun {
    pub fn topic_status(&self) -> Option<Status> {
        self.topics.iter().map(|t| t.status).max()
    }
}

/// Load the manifest (newest first). Missing or corrupt files yield an empty list.
pub fn load_manifest(root: &Path) -> Vec<ManifestEntry> {
    read_manifest(root).unwrap_or_default()
}

/// Load the manifest before adding to it. A corrupt file is moved aside to
/// `runs-manifest.json.corrupt` and the entries are recovered from the run
/// directories, so an update never drops earlier runs.
pub fn load_manifest_for_update(root: &Path) -> Vec<ManifestEntry> {
    if let Some(entries) = read_manifest(root) {
        return entries;
    }
    let path = root.join(MANIFEST_FILENAME);
    if !path.exists() {
        return Vec::new();
    }
    let aside = root.join(format!("{MANIFEST_FILENAME}.corrupt"));
    match fs::rename(&path, &aside) {
        Ok(()) => tracing::warn!(path = %aside.display(), "corrupt manifest moved aside"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not move corrupt manifest aside"),
    }
    let recovered = scan_runs(root);
    tracing::info!(runs = recovered.len(), "manifest recovered from run directories");
    recovered
}

/// `None` when the manifest is missing, unreadable or corrupt
fn read_manifest(root: &Path) -> Option<Vec<ManifestEntry>> {
    let path = root.join(MANIFEST_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "manifest unreadable; starting empty");
            }
            return None;
        }
    };
    match serde_json::from_str::<Vec<ManifestEntry>>(&content) {
        Ok(entries) => Some(entries),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "manifest corrupt; starting empty");
            None
        }
    }
}

pub fn save_manifest(root: &Path, manifest: &[ManifestEntry]) -> WriteResult<()> {
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|source| crate::error::WriteError::Serialize {
        what: "run manifest",
        source,
    })?;
    write_atomic(&root.join(MANIFEST_FILENAME), &bytes)
}

/// Insert an entry, replacing any earlier entry with the same run id, and
/// keep the list sorted by start time, newest first.
pub fn upsert(manifest: &mut Vec<ManifestEntry>, entry: ManifestEntry) {
    manifest.retain(|e| e.run_id != entry.run_id);
    manifest.push(entry);
    manifest.sort_by(|a, b| b.started_at.cmp(&a.started_at));
}

pub fn load_latest(root: &Path) -> Option<LatestPointer> {
    let path = root.join(LATEST_FILENAME);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(pointer) => Some(pointer),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "latest-run pointer corrupt");
            None
        }
    }
}

pub fn save_latest(root: &Path, pointer: &LatestPointer) -> WriteResult<()> {
    let bytes = serde_json::to_vec_pretty(pointer).map_err(|source| crate::error::WriteError::Serialize {
        what: "latest-run pointer",
        source,
    })?;
    write_atomic(&root.join(LATEST_FILENAME), &bytes)
}

/// Exact run id match, else a unique prefix match
pub fn find_entry<'a>(manifest: &'a [ManifestEntry], run_id: &str) -> Option<&'a ManifestEntry> {
    if let Some(exact) = manifest.iter().find(|e| e.run_id == run_id) {
        return Some(exact);
    }
    let mut matches = manifest.iter().filter(|e| e.run_id.starts_with(run_id));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Rebuild the manifest from the run directories on disk and rewrite both
/// the manifest and the latest pointer. Unreadable run records are skipped.
pub fn rebuild(root: &Path) -> Result<Vec<ManifestEntry>> {
    let manifest = scan_runs(root);
    save_manifest(root, &manifest).context("Failed to write rebuilt manifest")?;
    if let Some(newest) = manifest.first() {
        save_latest(root, &LatestPointer::from(newest)).context("Failed to write latest-run pointer")?;
    }
    Ok(manifest)
}

/// Manifest entries for every readable `runs/*/run.json`, newest first
fn scan_runs(root: &Path) -> Vec<ManifestEntry> {
    let runs_dir = root.join(RUNS_DIR);
    let mut manifest: Vec<ManifestEntry> = Vec::new();

    if runs_dir.is_dir() {
        for entry in WalkDir::new(&runs_dir)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == RECORD_FILENAME)
        {
            let path = entry.path();
            let Some(dir_name) = path
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
            else {
                continue;
            };
            let stored: StoredRun = match fs::read_to_string(path)
                .map_err(anyhow::Error::from)
                .and_then(|c| serde_json::from_str(&c).map_err(anyhow::Error::from))
            {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable run record");
                    continue;
                }
            };
            tracing::debug!(run_id = %stored.run.run_id, dir = dir_name, "indexed run");
            upsert(
                &mut manifest,
                ManifestEntry::new(&stored.run, stored.topic_status(), dir_name),
            );
        }
    }
    manifest
}
