use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::ExtractError;

/// True when `path` names an archive format [`extract`] can unpack.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Unpacks `archive` into `into` and returns the directory that received the
/// entries.
///
/// With `nested` the entries land in `into/<archive stem>/` instead. Files
/// that are not a recognised archive are left alone and their path is
/// returned unchanged.
pub fn extract(archive: &Path, into: &Path, nested: bool) -> Result<PathBuf, ExtractError> {
    if !is_archive(archive) {
        debug!(path = %archive.display(), "Not an archive, nothing to extract");
        return Ok(archive.to_path_buf());
    }

    let target = match (nested, archive.file_stem()) {
        (true, Some(stem)) => into.join(stem),
        _ => into.to_path_buf(),
    };

    let file = File::open(archive).map_err(|source| ExtractError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let zip_err = |source: zip::result::ZipError| ExtractError::Zip {
        path: archive.to_path_buf(),
        source,
    };
    let mut zip = zip::ZipArchive::new(file).map_err(|e| {
        error!(error = ?e, path = %archive.display(), "Archive is corrupt or unreadable");
        zip_err(e)
    })?;

    info!(
        archive = %archive.display(),
        target = %target.display(),
        entries = zip.len(),
        "Extracting files"
    );
    create_dir(&target)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(zip_err)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractError::UnsafeEntry {
                name: entry.name().to_string(),
            })?;
        let out_path = target.join(relative);

        if entry.is_dir() {
            create_dir(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            create_dir(parent)?;
        }

        let write_err = |source: io::Error| ExtractError::Io {
            path: out_path.clone(),
            source,
        };
        let mut out = File::create(&out_path).map_err(write_err)?;
        io::copy(&mut entry, &mut out).map_err(write_err)?;
        apply_mode(&out_path, entry.unix_mode()).map_err(write_err)?;
    }

    Ok(target)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(path).map_err(|source| {
        error!(error = ?source, path = %path.display(), "Failed to create directory");
        ExtractError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
