use std::fs;
use std::path::Path;

use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::error::MergeError;

/// Copies the contents of `source` into `dest`, keeping relative paths.
///
/// Files that exist on both sides are overwritten by the source version;
/// files only present in `dest` are left alone. Returns the number of files
/// copied.
pub fn merge_into(source: &Path, dest: &Path) -> Result<usize, MergeError> {
    if !source.is_dir() {
        error!(path = %source.display(), "Merge source directory is missing");
        return Err(MergeError::MissingSource(source.to_path_buf()));
    }
    info!(from = %source.display(), to = %dest.display(), "Copying files");

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| {
            error!(error = ?source, path = %path.display(), "Copy failed");
            MergeError::Io { path, source }
        }
    };

    fs::create_dir_all(dest).map_err(io_err(dest))?;

    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| MergeError::Walk {
            root: source.to_path_buf(),
            source: e,
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(io_err(&target))?;
            debug!(file = %relative.display(), "Copied");
            copied += 1;
        }
    }

    info!(files = copied, "Copy complete");
    Ok(copied)
}
