//! Error types for payload validation and report persistence
//!
//! Validation errors are always recoverable: the collector logs them and
//! drops the payload. Write errors are the one fatal class and are propagated
//! to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Why a summary payload was rejected
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("summary payload must be a JSON object")]
    NotAnObject,

    #[error("summary payload is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("unrecognized summary schema '{found}' (expected '{expected}')")]
    UnknownSchema { expected: &'static str, found: String },

    #[error("summary schema version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: String },

    #[error("unknown summary kind '{found}' (expected 'run-summary' or 'page-summary')")]
    UnknownKind { found: String },

    #[error("summary payload has an empty or non-string baseName")]
    MissingBaseName,

    #[error("malformed summary payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Fatal failure while persisting a run
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not allocate a unique run directory under '{root}' after {attempts} attempts")]
    Exhausted { root: PathBuf, attempts: usize },
}

impl WriteError {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WriteError::Write {
            path: path.into(),
            source,
        }
    }
}

pub type WriteResult<T> = std::result::Result<T, WriteError>;
