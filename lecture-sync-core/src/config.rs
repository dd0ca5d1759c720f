use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ConfigError;

/// Branch archive of the upstream lecture repository.
pub const DEFAULT_SOURCE_URL: &str =
    "https://github.com/QuantEcon/lecture-python-intro/archive/refs/heads/wasm.zip";
pub const DEFAULT_ARCHIVE_PATH: &str = "qe-lecture-intro-wasm.zip";
/// Top-level folder GitHub puts inside a `<repo>-<branch>` archive.
pub const DEFAULT_EXTRACTED_DIR: &str = "lecture-python-intro-wasm";
pub const DEFAULT_CONTENT_SUBDIR: &str = "lectures";
pub const DEFAULT_CONTENT_DIR: &str = "lectures";
pub const DEFAULT_EXTENSION: &str = "md";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

/// Everything one sync run needs to know. Relative paths resolve against
/// `root_dir`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote archive to download.
    pub source_url: String,
    /// Where the archive is saved locally.
    pub archive_path: PathBuf,
    /// Name of the tree the archive unpacks to.
    pub extracted_dir: PathBuf,
    /// Folder inside the extracted tree holding the lectures.
    pub content_subdir: PathBuf,
    /// Local destination of the synced lectures.
    pub content_dir: PathBuf,
    /// Only files with this extension are rewritten.
    pub extension: String,
    pub root_dir: PathBuf,
    /// Re-download even when the archive is already present.
    pub overwrite: bool,
    /// Unpack the archive after download.
    pub unzip: bool,
    /// Unpack into a folder named after the archive.
    pub nested: bool,
    pub fetch_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            archive_path: PathBuf::from(DEFAULT_ARCHIVE_PATH),
            extracted_dir: PathBuf::from(DEFAULT_EXTRACTED_DIR),
            content_subdir: PathBuf::from(DEFAULT_CONTENT_SUBDIR),
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            root_dir: PathBuf::from("."),
            overwrite: false,
            unzip: true,
            nested: false,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    /// Resolves `path` against `root_dir` unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }

    pub fn archive_path(&self) -> PathBuf {
        self.resolve(&self.archive_path)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.resolve(&self.content_dir)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Rejects values that would point the merge or the cleanup outside the
    /// unpacked tree. `extracted_dir` and `content_subdir` must be non-empty
    /// relative paths made of plain folder names only; `archive_path` must
    /// name a file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        plain_relative("extracted_dir", &self.extracted_dir)?;
        plain_relative("content_subdir", &self.content_subdir)?;
        if self.archive_path.file_name().is_none() {
            return Err(ConfigError::NoFileName {
                field: "archive_path",
                value: self.archive_path.clone(),
            });
        }
        if self.extension.is_empty() {
            return Err(ConfigError::Empty { field: "extension" });
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            source_url = %self.source_url,
            root_dir = %self.root_dir.display(),
            content_dir = %self.content_dir.display(),
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

fn plain_relative(field: &'static str, value: &Path) -> Result<(), ConfigError> {
    if value.as_os_str().is_empty() {
        return Err(ConfigError::Empty { field });
    }
    if !value
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(ConfigError::NotPlainRelative {
            field,
            value: value.to_path_buf(),
        });
    }
    Ok(())
}
