use std::path::PathBuf;

use labinv_model::{DocumentKind, ModelError};
use thiserror::Error;

/// Errors from reading and writing the JSON documents on disk.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File exists but is not a document we can read.
    #[error("document corrupted at {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("{path}: {source}")]
    Invalid { path: PathBuf, source: ModelError },

    #[error("{0} is not stored as a category document")]
    NotACategory(DocumentKind),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by [`crate::Lab`] operations.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("{kind} {id:?} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id:?} already exists")]
    Duplicate { kind: &'static str, id: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to write report {path}: {source}")]
    Report {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LabError>;
