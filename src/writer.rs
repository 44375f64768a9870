//! Run writer: persists one run under the report root
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   runs-manifest.json
//!   latest-run.json
//!   runs/<run-id>[-N]/
//!     index.html
//!     report.md
//!     run.json
//!     tests/001-<slug>.json
//! ```
//!
//! Every failure here is fatal and surfaces as a [`WriteError`].

use crate::aggregate::{AggregatedReport, Status};
use crate::error::{WriteError, WriteResult};
use crate::history::{
    self, LatestPointer, ManifestEntry, MARKDOWN_FILENAME, RECORD_FILENAME, REPORT_FILENAME, RUNS_DIR,
    TESTS_DIR,
};
use crate::reporter::json::topic_digests;
use crate::reporter::view::slugify;
use crate::reporter::{RenderedDocs, TopicDigest};
use crate::{RunRecord, TestRecord};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Collision suffixes tried before giving up
const MAX_DIR_ATTEMPTS: usize = 1000;

/// Where a run ended up on disk
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenRun {
    pub run_dir: PathBuf,
    pub report_path: PathBuf,
    pub markdown_path: PathBuf,
    pub record_path: PathBuf,
    pub manifest_entry: ManifestEntry,
}

/// `run.json`: the run record plus the classified topics
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordDocument<'a> {
    #[serde(flatten)]
    run: &'a RunRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic_status: Option<Status>,
    topics: Vec<TopicDigest>,
}

pub struct RunWriter {
    root: PathBuf,
}

impl RunWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, run: &RunRecord, report: &AggregatedReport, docs: &RenderedDocs) -> WriteResult<WrittenRun> {
        let runs_root = self.root.join(RUNS_DIR);
        fs::create_dir_all(&runs_root).map_err(|source| WriteError::CreateDir {
            path: runs_root.clone(),
            source,
        })?;

        let (run_dir, dir_name) = allocate_run_dir(&runs_root, &run.run_id)?;
        tracing::debug!(run_id = %run.run_id, dir = %run_dir.display(), "allocated run directory");

        let report_path = run_dir.join(REPORT_FILENAME);
        let markdown_path = run_dir.join(MARKDOWN_FILENAME);
        let record_path = run_dir.join(RECORD_FILENAME);

        write_atomic(&report_path, docs.html.as_bytes())?;
        write_atomic(&markdown_path, docs.markdown.as_bytes())?;

        let topic_status = report.panels().map(|t| t.status).max();
        let record = RecordDocument {
            run,
            topic_status,
            topics: topic_digests(report),
        };
        write_json(&record_path, &record, "run record")?;
        write_tests(&run_dir.join(TESTS_DIR), &run.tests)?;

        let entry = ManifestEntry::new(run, topic_status, &dir_name);
        let mut manifest = history::load_manifest_for_update(&self.root);
        history::upsert(&mut manifest, entry.clone());
        history::save_manifest(&self.root, &manifest)?;
        history::save_latest(&self.root, &LatestPointer::from(&entry))?;

        tracing::info!(run_id = %run.run_id, dir = %run_dir.display(), "run written");
        Ok(WrittenRun {
            run_dir,
            report_path,
            markdown_path,
            record_path,
            manifest_entry: entry,
        })
    }
}

/// Create `<runs>/<id>`, or `<id>-1`, `<id>-2`, ... if taken. Creation itself
/// is the existence check, so two writers never share a directory.
fn allocate_run_dir(runs_root: &Path, run_id: &str) -> WriteResult<(PathBuf, String)> {
    let base = sanitize_dir_name(run_id);
    for n in 0..MAX_DIR_ATTEMPTS {
        let name = if n == 0 { base.clone() } else { format!("{base}-{n}") };
        let dir = runs_root.join(&name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok((dir, name)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(WriteError::CreateDir { path: dir, source }),
        }
    }
    Err(WriteError::Exhausted {
        root: runs_root.to_path_buf(),
        attempts: MAX_DIR_ATTEMPTS,
    })
}

fn sanitize_dir_name(run_id: &str) -> String {
    let name: String = run_id
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let name = name.trim_matches('-');
    if name.is_empty() {
        "run".to_string()
    } else {
        name.to_string()
    }
}

fn write_tests(dir: &Path, tests: &[TestRecord]) -> WriteResult<()> {
    if tests.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    for (i, test) in tests.iter().enumerate() {
        let slug = slugify(&test.title());
        let slug: String = slug.chars().take(60).collect();
        let path = dir.join(format!("{:03}-{}.json", i + 1, slug.trim_end_matches('-')));
        write_json(&path, test, "test record")?;
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &'static str) -> WriteResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| WriteError::Serialize { what, source })?;
    write_atomic(path, &bytes)
}

/// Write through a sibling temp file and rename over the target, so readers
/// never observe a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> WriteResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));
    fs::write(&tmp, bytes).map_err(|e| WriteError::write(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(WriteError::write(path, e));
    }
    Ok(())
}
