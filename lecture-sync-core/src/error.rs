//! Error taxonomy for the sync pipeline.
//!
//! Every stage has its own error type so callers (and tests) can tell which
//! step failed. [`SyncError`] wraps them for the orchestrator and reports the
//! [`SyncStage`] that produced the failure.

use std::path::PathBuf;

use crate::synchronise::SyncStage;

/// A configuration value that would make the run touch the wrong files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be a relative path of plain folder names, got {}", value.display())]
    NotPlainRelative { field: &'static str, value: PathBuf },

    #[error("{field} must name a file, got {}", value.display())]
    NoFileName { field: &'static str, value: PathBuf },
}

/// Failure while retrieving the remote archive.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("cannot build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server answered {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while unpacking a downloaded archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("cannot open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt or unreadable archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry {name:?} would be written outside the target directory")]
    UnsafeEntry { name: String },

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while copying the extracted tree over the content directory.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("source directory {} does not exist", .0.display())]
    MissingSource(PathBuf),

    #[error("cannot walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("cannot copy into {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A content file could not be read or rewritten.
#[derive(Debug, thiserror::Error)]
#[error("cannot rewrite {}: {source}", path.display())]
pub struct TransformIoError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A temporary artifact could not be removed after a successful sync.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("cannot remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to remove {}: {reason}", path.display())]
    Refused { path: PathBuf, reason: &'static str },
}

/// Any failure of the end-to-end pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("copy failed: {0}")]
    Merge(#[from] MergeError),

    #[error("cannot list {}: {source}", dir.display())]
    Enumerate {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transform failed: {0}")]
    Transform(#[from] TransformIoError),

    #[error("cleanup failed: {0}")]
    Cleanup(#[from] CleanupError),
}

impl SyncError {
    /// The pipeline stage that raised this error.
    pub fn stage(&self) -> SyncStage {
        match self {
            SyncError::Config(_) => SyncStage::Configure,
            SyncError::Fetch(_) => SyncStage::Fetch,
            SyncError::Extract(_) => SyncStage::Extract,
            SyncError::Merge(_) => SyncStage::Merge,
            SyncError::Enumerate { .. } => SyncStage::Enumerate,
            SyncError::Transform(_) => SyncStage::Transform,
            SyncError::Cleanup(_) => SyncStage::Cleanup,
        }
    }
}
