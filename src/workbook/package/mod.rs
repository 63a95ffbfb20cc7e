//! # Workbook Packages
//!
//! A package is the on-disk container of a workbook page and the files it refers
//! to. Three storage modes exist:
//!
//! ```text
//! Directory   demo.workbook/            opened and saved in place
//!               index.workbook
//!               images/chart.png
//!
//! Archive     demo.workbook  (zip)      extracted into a private temp directory,
//!                                       which is the working copy until close
//!
//! Bare        demo.workbook  (text)     the page itself, no dependency files
//! ```
//!
//! Opening sniffs the path: directories are Directory packages, files starting with
//! a zip header are Archives, any other file is Bare. A file inside a `*.workbook`
//! directory opens that directory.
//!
//! Saving always writes the page into the working copy first. Whatever has to land
//! at the destination (an archive, a copied tree, a page file) is staged beside it
//! and renamed into place, so a failed or cancelled save never leaves a partial
//! destination. After a successful save the package refers to what was written:
//! saving a Directory package as an archive turns it into an Archive package at the
//! destination, and so on.

mod archive;
mod cancel;
mod fs;
mod quarantine;

pub use cancel::CancellationToken;
pub use quarantine::{AllowAll, QuarantineCheck, QuarantineInfo};

use crate::config::WorkbookConfig;
use crate::dependencies;
use crate::error::{Result, WorkbookError};
use crate::page::WorkbookPage;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Directory,
    Archive,
    Bare,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Directory => write!(f, "directory"),
            StorageMode::Archive => write!(f, "archive"),
            StorageMode::Bare => write!(f, "bare"),
        }
    }
}

/// Options for a save. `ARCHIVE` writes a zip archive instead of a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    archive: bool,
}

impl SaveOptions {
    pub const NONE: SaveOptions = SaveOptions { archive: false };
    pub const ARCHIVE: SaveOptions = SaveOptions { archive: true };

    pub fn archive(self) -> bool {
        self.archive
    }

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

/// Where and how to save. Obtained from [`WorkbookPackage::create_save_operation`]
/// and adjusted by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOperation {
    pub destination: PathBuf,
    pub options: SaveOptions,
    supported_options: SaveOptions,
}

impl SaveOperation {
    /// Options that make sense for this package.
    pub fn supported_options(&self) -> SaveOptions {
        self.supported_options
    }
}

enum Storage {
    Directory {
        path: PathBuf,
    },
    Archive {
        working: PathBuf,
        original: PathBuf,
        // Deleted on close or drop.
        temp: TempDir,
    },
    Bare {
        path: PathBuf,
    },
}

pub struct WorkbookPackage {
    storage: Storage,
    page: WorkbookPage,
    options: SaveOptions,
    config: WorkbookConfig,
}

impl fmt::Debug for WorkbookPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkbookPackage")
            .field("mode", &self.storage_mode())
            .field("logical_path", &self.logical_path())
            .field("working_path", &self.working_path())
            .finish()
    }
}

impl WorkbookPackage {
    pub fn open(
        path: impl AsRef<Path>,
        quarantine: &impl QuarantineCheck,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        Self::open_with_config(path, WorkbookConfig::default(), quarantine, cancel)
    }

    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: WorkbookConfig,
        quarantine: &impl QuarantineCheck,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let requested = path.as_ref();
        if !requested.exists() {
            return Err(WorkbookError::NotFound(requested.to_path_buf()));
        }
        let path = enclosing_package(requested, &config);

        if path.is_dir() {
            let page = read_page(&path.join(&config.index_page_name), &path, &config)?;
            info!(path = %path.display(), "Opened workbook directory");
            return Ok(Self {
                storage: Storage::Directory { path },
                page,
                options: SaveOptions::NONE,
                config,
            });
        }

        let quarantine_info = quarantine.inspect(&path);
        if !quarantine.allow(&quarantine_info) {
            info!(path = %path.display(), "Quarantine check declined workbook");
            return Err(WorkbookError::QuarantineRejected(path));
        }

        if !archive::smells_like_zip(&path)? {
            let page = read_page(&path, &path, &config)?;
            info!(path = %path.display(), "Opened bare workbook page");
            return Ok(Self {
                storage: Storage::Bare { path },
                page,
                options: SaveOptions::NONE,
                config,
            });
        }

        let temp = private_dir(&config)?;
        // Any error from here on, cancellation included, drops `temp` and with it
        // the partial extraction.
        archive::extract(&path, temp.path(), cancel)?;
        let working = archive_root(temp.path(), &path, &config)?;
        let page = read_page(&working.join(&config.index_page_name), &path, &config)?;
        info!(
            path = %path.display(),
            working = %working.display(),
            "Opened workbook archive"
        );

        Ok(Self {
            storage: Storage::Archive {
                working,
                original: path,
                temp,
            },
            page,
            options: SaveOptions::ARCHIVE,
            config,
        })
    }

    pub fn page(&self) -> &WorkbookPage {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut WorkbookPage {
        &mut self.page
    }

    pub fn config(&self) -> &WorkbookConfig {
        &self.config
    }

    pub fn storage_mode(&self) -> StorageMode {
        match self.storage {
            Storage::Directory { .. } => StorageMode::Directory,
            Storage::Archive { .. } => StorageMode::Archive,
            Storage::Bare { .. } => StorageMode::Bare,
        }
    }

    /// Where the package lives from the user's point of view.
    pub fn logical_path(&self) -> &Path {
        match &self.storage {
            Storage::Directory { path } | Storage::Bare { path } => path,
            Storage::Archive { original, .. } => original,
        }
    }

    /// The directory (or, for bare pages, the file) edits are made in.
    pub fn working_path(&self) -> &Path {
        match &self.storage {
            Storage::Directory { path } | Storage::Bare { path } => path,
            Storage::Archive { working, .. } => working,
        }
    }

    /// The directory relative dependency paths resolve against.
    pub fn base_path(&self) -> &Path {
        match &self.storage {
            Storage::Directory { path } => path,
            Storage::Archive { working, .. } => working,
            Storage::Bare { path } => path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or(Path::new(".")),
        }
    }

    pub fn main_page_path(&self) -> PathBuf {
        match &self.storage {
            Storage::Bare { path } => path.clone(),
            _ => self.working_path().join(&self.config.index_page_name),
        }
    }

    /// Files in the package other than the main page, relative to the package root.
    pub fn dependency_files(&self) -> Result<Vec<PathBuf>> {
        if self.storage_mode() == StorageMode::Bare {
            return Ok(Vec::new());
        }
        let index = Path::new(&self.config.index_page_name);
        Ok(fs::list_files(self.working_path())?
            .into_iter()
            .filter(|file| file != index)
            .collect())
    }

    /// Relative paths referenced by the page that exist below [`Self::base_path`].
    pub fn referenced_dependencies(&self) -> Vec<PathBuf> {
        let base = self.base_path();
        dependencies::collect(&self.page.contents)
            .into_iter()
            .filter(|path| base.join(path).is_file())
            .collect()
    }

    /// Archiving is offered only when there is more than the main page to keep.
    pub fn supported_options(&self) -> SaveOptions {
        match self.dependency_files() {
            Ok(files) if !files.is_empty() => SaveOptions::ARCHIVE,
            Ok(_) => SaveOptions::NONE,
            Err(e) => {
                warn!(error = %e, "Could not list workbook dependencies");
                SaveOptions::NONE
            }
        }
    }

    pub fn create_save_operation(&self) -> SaveOperation {
        SaveOperation {
            destination: self.logical_path().to_path_buf(),
            options: self.options,
            supported_options: self.supported_options(),
        }
    }

    pub fn save(&mut self, operation: &SaveOperation, cancel: &CancellationToken) -> Result<()> {
        let text = self.page.write()?;
        let destination = fs::normalize(&operation.destination);
        let in_place = destination == fs::normalize(self.logical_path());

        match self.storage_mode() {
            StorageMode::Bare => self.save_bare(&text, destination, operation.options, cancel),
            mode => self.save_tree(&text, destination, in_place, mode, operation.options, cancel),
        }
    }

    fn save_bare(
        &mut self,
        text: &str,
        destination: PathBuf,
        options: SaveOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if options.archive() {
            let temp = private_dir(&self.config)?;
            let working = temp.path().to_path_buf();
            fs::write_atomic(
                &working.join(&self.config.index_page_name),
                text.as_bytes(),
                &self.config.temp_prefix,
            )?;
            self.write_archive(&working, &destination, cancel)?;
            info!(destination = %destination.display(), "Saved page as workbook archive");
            self.storage = Storage::Archive {
                working,
                original: destination,
                temp,
            };
            self.options = SaveOptions::ARCHIVE;
            return Ok(());
        }

        fs::write_atomic(&destination, text.as_bytes(), &self.config.temp_prefix)?;
        debug!(destination = %destination.display(), "Saved bare workbook page");
        self.storage = Storage::Bare { path: destination };
        self.options = SaveOptions::NONE;
        Ok(())
    }

    fn save_tree(
        &mut self,
        text: &str,
        destination: PathBuf,
        in_place: bool,
        mode: StorageMode,
        options: SaveOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let working = self.working_path().to_path_buf();
        // A directory may be replaced by its own archive, but nothing may be staged
        // inside the tree that is being copied or zipped.
        let root = fs::normalize(self.working_root());
        if destination.starts_with(&root)
            && !(mode == StorageMode::Directory && destination == root)
        {
            return Err(WorkbookError::InvalidOperation(format!(
                "cannot save {} inside itself",
                working.display()
            )));
        }

        fs::write_atomic(
            &working.join(&self.config.index_page_name),
            text.as_bytes(),
            &self.config.temp_prefix,
        )?;

        if options.archive() || (mode == StorageMode::Archive && in_place) {
            if mode == StorageMode::Directory {
                // The directory stops being the package; keep editing a private copy.
                let temp = private_dir(&self.config)?;
                fs::copy_tree(&working, temp.path())?;
                self.write_archive(temp.path(), &destination, cancel)?;
                self.storage = Storage::Archive {
                    working: temp.path().to_path_buf(),
                    original: destination.clone(),
                    temp,
                };
            } else {
                self.write_archive(&working, &destination, cancel)?;
                if let Storage::Archive { original, .. } = &mut self.storage {
                    *original = destination.clone();
                }
            }
            info!(destination = %destination.display(), "Saved workbook archive");
            self.options = SaveOptions::ARCHIVE;
            return Ok(());
        }

        if in_place {
            debug!(path = %working.display(), "Saved workbook directory in place");
            return Ok(());
        }

        cancel.check()?;
        let staged = fs::staged_dir(&destination, &self.config.temp_prefix)?;
        let files = fs::copy_tree(&working, staged.path())?;
        cancel.check()?;
        fs::replace(staged.path(), &destination)?;
        info!(destination = %destination.display(), files, "Saved workbook directory");

        // Replacing the storage drops an archive's private working copy.
        self.storage = Storage::Directory { path: destination };
        self.options = SaveOptions::NONE;
        Ok(())
    }

    /// The whole tree owned by the package: an archive's extraction directory.
    fn working_root(&self) -> &Path {
        match &self.storage {
            Storage::Archive { temp, .. } => temp.path(),
            _ => self.working_path(),
        }
    }

    fn write_archive(
        &self,
        root: &Path,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let staged = fs::staged_file(destination, &self.config.temp_prefix)?;
        let staged = archive::write_tree(
            root,
            staged,
            self.config.archive_compression.method(),
            cancel,
        )?;
        staged.as_file().sync_all().map_err(WorkbookError::Io)?;
        let staged = staged.into_temp_path();
        cancel.check()?;
        fs::replace(&staged, destination)
    }

    /// Releases the package, deleting an archive's private working copy.
    pub fn close(self) -> Result<()> {
        if let Storage::Archive { temp, .. } = self.storage {
            let path = temp.path().to_path_buf();
            temp.close().map_err(WorkbookError::Io)?;
            debug!(path = %path.display(), "Removed workbook working copy");
        }
        Ok(())
    }
}

fn private_dir(config: &WorkbookConfig) -> Result<TempDir> {
    Builder::new()
        .prefix(&config.temp_prefix)
        .tempdir()
        .map_err(WorkbookError::Io)
}

/// The package directory for `path`: `path` itself, or the nearest enclosing
/// `*.workbook` directory when `path` is a file inside one.
fn enclosing_package(path: &Path, config: &WorkbookConfig) -> PathBuf {
    if path.is_file() {
        let enclosing = path
            .ancestors()
            .skip(1)
            .find(|ancestor| ancestor.is_dir() && config.has_package_extension(ancestor));
        if let Some(enclosing) = enclosing {
            debug!(
                file = %path.display(),
                package = %enclosing.display(),
                "Opening enclosing workbook directory"
            );
            return enclosing.to_path_buf();
        }
    }
    path.to_path_buf()
}

/// The extracted directory holding the main page: the extraction root, or a
/// single top-level directory archived along with its contents.
fn archive_root(extracted: &Path, archive: &Path, config: &WorkbookConfig) -> Result<PathBuf> {
    if extracted.join(&config.index_page_name).is_file() {
        return Ok(extracted.to_path_buf());
    }

    let entries: Vec<PathBuf> = std::fs::read_dir(extracted)
        .map_err(WorkbookError::Io)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    if let [only] = entries.as_slice() {
        if only.join(&config.index_page_name).is_file() {
            return Ok(only.clone());
        }
    }

    Err(WorkbookError::UnsupportedFormat {
        path: archive.to_path_buf(),
        reason: format!("archive does not contain {}", config.index_page_name),
    })
}

fn read_page(page_path: &Path, package: &Path, config: &WorkbookConfig) -> Result<WorkbookPage> {
    if !page_path.is_file() {
        return Err(WorkbookError::UnsupportedFormat {
            path: package.to_path_buf(),
            reason: format!("missing {}", config.index_page_name),
        });
    }
    let bytes = std::fs::read(page_path).map_err(WorkbookError::Io)?;
    let text = String::from_utf8(bytes).map_err(|_| WorkbookError::UnsupportedFormat {
        path: package.to_path_buf(),
        reason: "page is not UTF-8 text".to_string(),
    })?;

    let page = WorkbookPage::read(&text)
        .map_err(|e| e.with_source_name(page_path.display().to_string()))?;
    if page.needs_migration() {
        debug!(path = %page_path.display(), "Page manifest will be rewritten as yaml on save");
    }
    Ok(page)
}
