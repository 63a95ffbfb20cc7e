//! Zip containers for workbook packages.

use super::cancel::CancellationToken;
use crate::error::{Result, WorkbookError};
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Component, Path};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const LOCAL_FILE_SIGNATURE: [u8; 4] = *b"PK\x03\x04";

/// True if the file starts with a zip local file header.
pub(crate) fn smells_like_zip(path: &Path) -> Result<bool> {
    let mut header = [0u8; 4];
    let mut file = File::open(path).map_err(WorkbookError::Io)?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(header == LOCAL_FILE_SIGNATURE),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(WorkbookError::Io(e)),
    }
}

/// Extracts every entry of the archive at `path` below `destination`, checking
/// `cancel` before each entry. Returns the number of files written.
pub(crate) fn extract(path: &Path, destination: &Path, cancel: &CancellationToken) -> Result<usize> {
    let file = File::open(path).map_err(WorkbookError::Io)?;
    let mut archive = ZipArchive::new(file)?;
    let mut files = 0;

    for i in 0..archive.len() {
        cancel.check()?;
        let mut entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| WorkbookError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!("archive entry '{}' escapes the package", entry.name()),
            })?;
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(WorkbookError::Io)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(WorkbookError::Io)?;
        }
        let mut out = File::create(&target).map_err(WorkbookError::Io)?;
        io::copy(&mut entry, &mut out).map_err(WorkbookError::Io)?;
        files += 1;
    }

    debug!(archive = %path.display(), files, "Extracted workbook archive");
    Ok(files)
}

/// Writes the tree under `root` into a zip archive on `writer`. Entry names are
/// relative to `root` and use `/` separators.
pub(crate) fn write_tree<W: Write + Seek>(
    root: &Path,
    writer: W,
    compression: CompressionMethod,
    cancel: &CancellationToken,
) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::<()>::default().compression_method(compression);

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        cancel.check()?;
        let entry = entry.map_err(io::Error::from)?;
        let name = entry_name(root, entry.path())?;

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
            continue;
        }

        zip.start_file(name, options)?;
        let mut source = File::open(entry.path()).map_err(WorkbookError::Io)?;
        io::copy(&mut source, &mut zip).map_err(WorkbookError::Io)?;
    }

    Ok(zip.finish()?)
}

fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = super::fs::relative_to(root, path)?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}
