//! Filesystem primitives for saving packages without exposing partial results.
//!
//! Everything is staged next to its destination and moved into place with a
//! rename, so a failed save leaves the destination as it was.

use crate::error::{Result, WorkbookError};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::warn;
use uuid::Uuid;
use walkdir::WalkDir;

pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(WorkbookError::Io)?;
    }
    Ok(())
}

/// The directory staging files for `destination` are created in.
pub(crate) fn staging_dir(destination: &Path) -> Result<PathBuf> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => env::current_dir().map_err(WorkbookError::Io)?,
    };
    ensure_dir(&parent)?;
    Ok(parent)
}

/// Writes `contents` to a temporary file beside `path` and renames it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8], prefix: &str) -> Result<()> {
    let mut staged = Builder::new()
        .prefix(prefix)
        .tempfile_in(staging_dir(path)?)
        .map_err(WorkbookError::Io)?;
    staged.write_all(contents).map_err(WorkbookError::Io)?;
    staged.as_file().sync_all().map_err(WorkbookError::Io)?;
    staged
        .persist(path)
        .map_err(|e| WorkbookError::Io(e.error))?;
    Ok(())
}

pub(crate) fn staged_file(destination: &Path, prefix: &str) -> Result<NamedTempFile> {
    Builder::new()
        .prefix(prefix)
        .tempfile_in(staging_dir(destination)?)
        .map_err(WorkbookError::Io)
}

pub(crate) fn staged_dir(destination: &Path, prefix: &str) -> Result<TempDir> {
    Builder::new()
        .prefix(prefix)
        .tempdir_in(staging_dir(destination)?)
        .map_err(WorkbookError::Io)
}

/// `path` relative to `root`.
pub(crate) fn relative_to<'a>(root: &Path, path: &'a Path) -> Result<&'a Path> {
    path.strip_prefix(root).map_err(|_| {
        WorkbookError::InvalidOperation(format!(
            "{} is outside {}",
            path.display(),
            root.display()
        ))
    })
}

/// Copies every file and directory below `source` into `destination`.
pub(crate) fn copy_tree(source: &Path, destination: &Path) -> Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = relative_to(source, entry.path())?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            fs::copy(entry.path(), &target).map_err(WorkbookError::Io)?;
            files += 1;
        }
    }
    Ok(files)
}

/// Files below `root`, relative to it, in a stable order.
pub(crate) fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Moves `staged` to `destination`, replacing whatever is there. An existing
/// destination is set aside first and restored if the final rename fails.
pub(crate) fn replace(staged: &Path, destination: &Path) -> Result<()> {
    let existing = match fs::symlink_metadata(destination) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return fs::rename(staged, destination).map_err(WorkbookError::Io);
        }
        Err(e) => return Err(WorkbookError::Io(e)),
    };

    if existing.is_file() && staged.is_file() {
        return fs::rename(staged, destination).map_err(WorkbookError::Io);
    }

    let backup = staging_dir(destination)?.join(format!(".workbook-replaced-{}", Uuid::new_v4()));
    fs::rename(destination, &backup).map_err(WorkbookError::Io)?;

    if let Err(e) = fs::rename(staged, destination) {
        if let Err(restore) = fs::rename(&backup, destination) {
            warn!(
                backup = %backup.display(),
                error = %restore,
                "Could not restore the previous workbook after a failed save"
            );
        }
        return Err(WorkbookError::Io(e));
    }

    if let Err(e) = remove_path(&backup) {
        warn!(path = %backup.display(), error = %e, "Could not remove the replaced workbook");
    }
    Ok(())
}

pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Absolute form of `path` used to compare package locations. Resolves symlinks
/// where the path, or failing that its parent, exists.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }
    match env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    }
}
