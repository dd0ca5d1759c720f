//! High-level pipeline: fetch → extract → merge → rewrite → clean up.
//!
//! [`synchronise`] drives one complete run described by a [`SyncConfig`]:
//!   - Rejects configurations whose paths would escape the unpacked tree
//!   - Downloads the lecture archive (reusing an existing copy unless
//!     `overwrite` is set)
//!   - Unpacks it next to the archive
//!   - Copies the lecture folder of the unpacked tree over the local content
//!     directory
//!   - Rewrites every matching file directly inside the content directory
//!     for the WASM kernel (see [`crate::transform`])
//!   - Removes the unpacked tree and the archive
//!
//! # Error Handling
//! Every step is fail-fast: the first error is returned and the remaining
//! steps never run. A failure before the merge leaves the content directory
//! untouched; temporary artifacts are only removed after a complete run, and
//! never when the tree to delete is the unpack directory itself or holds the
//! content directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::SyncConfig;
use crate::contract::Fetcher;
use crate::download::fetch_archive;
use crate::error::{CleanupError, MergeError, SyncError};
use crate::extract::{extract, is_archive};
use crate::merge::merge_into;
use crate::progress::{SilentProgress, SyncEvent, SyncProgress};
use crate::transform::transform_file;

/// Steps of a sync run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Configure,
    Fetch,
    Extract,
    Merge,
    Enumerate,
    Transform,
    Cleanup,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Configure => "config",
            SyncStage::Fetch => "fetch",
            SyncStage::Extract => "extract",
            SyncStage::Merge => "merge",
            SyncStage::Enumerate => "enumerate",
            SyncStage::Transform => "transform",
            SyncStage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Absolute path of the archive that was used.
    pub archive: PathBuf,
    /// True when an existing archive was reused instead of downloaded.
    pub fetch_skipped: bool,
    /// Lecture folder of the unpacked tree.
    pub source_dir: PathBuf,
    pub content_dir: PathBuf,
    pub files_copied: usize,
    /// Every file the rewrite step visited, sorted.
    pub processed: Vec<PathBuf>,
    /// How many of `processed` actually changed.
    pub changed: usize,
    /// Temporary artifacts removed at the end.
    pub removed: Vec<PathBuf>,
}

pub async fn synchronise<F>(config: &SyncConfig, fetcher: &F) -> Result<SyncReport, SyncError>
where
    F: Fetcher + ?Sized,
{
    synchronise_with_progress(config, fetcher, &SilentProgress).await
}

/// Same as [`synchronise`], announcing each step to `progress` as it starts.
pub async fn synchronise_with_progress<F>(
    config: &SyncConfig,
    fetcher: &F,
    progress: &dyn SyncProgress,
) -> Result<SyncReport, SyncError>
where
    F: Fetcher + ?Sized,
{
    info!(source_url = %config.source_url, "[SYNC] Starting lecture synchronisation");
    config.validate().map_err(fail)?;

    // --- Fetch ---
    let archive_path = config.archive_path();
    progress.on_event(&SyncEvent::Fetching {
        url: &config.source_url,
        archive: &archive_path,
    });
    let fetched = fetch_archive(fetcher, &config.source_url, &archive_path, config.overwrite)
        .await
        .map_err(fail)?;
    let archive = fetched.path;
    if fetched.skipped {
        progress.on_event(&SyncEvent::ArchiveReused { archive: &archive });
    }
    info!(
        stage = %SyncStage::Fetch,
        archive = %archive.display(),
        skipped = fetched.skipped,
        "[SYNC] Archive ready"
    );

    // --- Extract ---
    let unpack_dir = archive
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.root_dir.clone());
    let extract_root = if config.unzip && is_archive(&archive) {
        progress.on_event(&SyncEvent::Extracting {
            archive: &archive,
            into: &unpack_dir,
        });
        extract(&archive, &unpack_dir, config.nested).map_err(fail)?
    } else {
        info!(stage = %SyncStage::Extract, "[SYNC] Extraction skipped");
        unpack_dir.clone()
    };
    let extracted_tree = extract_root.join(&config.extracted_dir);
    // A nested extraction owns its whole folder; otherwise only the tree the
    // archive unpacked to is ours to delete.
    let temp_tree = if extract_root != unpack_dir {
        extract_root.clone()
    } else {
        extracted_tree.clone()
    };

    // --- Merge ---
    let source_dir = extracted_tree.join(&config.content_subdir);
    let content_dir = std::path::absolute(config.content_dir()).map_err(|source| {
        fail(MergeError::Io {
            path: config.content_dir(),
            source,
        })
    })?;
    info!(
        stage = %SyncStage::Merge,
        from = %source_dir.display(),
        to = %content_dir.display(),
        "[SYNC] Copying lectures"
    );
    progress.on_event(&SyncEvent::Copying {
        from: &source_dir,
        to: &content_dir,
    });
    let files_copied = merge_into(&source_dir, &content_dir).map_err(fail)?;

    // --- Enumerate ---
    let lectures = list_content_files(&content_dir, &config.extension).map_err(|source| {
        fail(SyncError::Enumerate {
            dir: content_dir.clone(),
            source,
        })
    })?;
    info!(
        stage = %SyncStage::Enumerate,
        files = lectures.len(),
        "[SYNC] Processing lecture files"
    );
    progress.on_event(&SyncEvent::Processing {
        files: lectures.len(),
    });

    // --- Transform ---
    let mut changed = 0;
    for file in &lectures {
        let rewritten = transform_file(file).map_err(fail)?;
        if rewritten {
            changed += 1;
        }
        progress.on_event(&SyncEvent::Processed {
            file,
            changed: rewritten,
        });
        info!(
            stage = %SyncStage::Transform,
            file = %file.file_name().unwrap_or_default().to_string_lossy(),
            "[SYNC] Processed"
        );
    }

    // --- Cleanup ---
    info!(stage = %SyncStage::Cleanup, "[SYNC] Cleaning up temporary files");
    progress.on_event(&SyncEvent::CleaningUp);
    let removed = cleanup(&temp_tree, &unpack_dir, &content_dir, &archive).map_err(fail)?;

    info!(
        processed = lectures.len(),
        changed,
        "[SYNC] Synchronisation completed successfully"
    );
    Ok(SyncReport {
        archive,
        fetch_skipped: fetched.skipped,
        source_dir,
        content_dir,
        files_copied,
        processed: lectures,
        changed,
        removed,
    })
}

/// Regular files directly inside `dir` whose extension is `extension`,
/// sorted by path. Subdirectories are not descended into.
pub fn list_content_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|ext| ext == extension)
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn cleanup(
    tree: &Path,
    unpack_dir: &Path,
    content_dir: &Path,
    archive: &Path,
) -> Result<Vec<PathBuf>, CleanupError> {
    check_removable(tree, unpack_dir, content_dir)?;
    let mut removed = Vec::new();

    fs::remove_dir_all(tree).map_err(|source| CleanupError::Remove {
        path: tree.to_path_buf(),
        source,
    })?;
    removed.push(tree.to_path_buf());

    fs::remove_file(archive).map_err(|source| CleanupError::Remove {
        path: archive.to_path_buf(),
        source,
    })?;
    removed.push(archive.to_path_buf());

    Ok(removed)
}

/// The tree must be a proper subfolder of `unpack_dir` and must not hold the
/// content directory. Paths are compared after resolving symlinks and `..`.
fn check_removable(tree: &Path, unpack_dir: &Path, content_dir: &Path) -> Result<(), CleanupError> {
    let tree_real = fs::canonicalize(tree).map_err(|source| CleanupError::Remove {
        path: tree.to_path_buf(),
        source,
    })?;
    let unpack_real = fs::canonicalize(unpack_dir).unwrap_or_else(|_| unpack_dir.to_path_buf());
    let content_real = fs::canonicalize(content_dir).unwrap_or_else(|_| content_dir.to_path_buf());

    let refuse = |reason: &'static str| -> Result<(), CleanupError> {
        error!(tree = %tree.display(), reason, "[SYNC][ERROR] Refusing to remove tree");
        Err(CleanupError::Refused {
            path: tree.to_path_buf(),
            reason,
        })
    };
    if tree_real == unpack_real || !tree_real.starts_with(&unpack_real) {
        return refuse("it is not a subfolder of the unpack directory");
    }
    if content_real.starts_with(&tree_real) {
        return refuse("it contains the content directory");
    }
    Ok(())
}

fn fail(err: impl Into<SyncError>) -> SyncError {
    let err = err.into();
    error!(stage = %err.stage(), error = %err, "[SYNC][ERROR] Stage failed");
    err
}
