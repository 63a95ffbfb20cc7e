use crate::error::{Result, WorkbookError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_INDEX_PAGE: &str = "index.workbook";
const DEFAULT_EXTENSION: &str = "workbook";
const DEFAULT_TEMP_PREFIX: &str = "workbook-";

/// How files are stored inside saved archives.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveCompression {
    #[default]
    Deflated,
    Stored,
}

impl ArchiveCompression {
    pub(crate) fn method(self) -> zip::CompressionMethod {
        match self {
            ArchiveCompression::Deflated => zip::CompressionMethod::Deflated,
            ArchiveCompression::Stored => zip::CompressionMethod::Stored,
        }
    }
}

/// Package conventions, stored in `config.json` in the config directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkbookConfig {
    /// File name of the main page inside a package
    #[serde(default = "default_index_page_name")]
    pub index_page_name: String,

    /// Extension of package directories and archives, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default)]
    pub archive_compression: ArchiveCompression,

    /// Prefix for temporary working directories and files
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
}

fn default_index_page_name() -> String {
    DEFAULT_INDEX_PAGE.to_string()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_temp_prefix() -> String {
    DEFAULT_TEMP_PREFIX.to_string()
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            index_page_name: default_index_page_name(),
            extension: default_extension(),
            archive_compression: ArchiveCompression::default(),
            temp_prefix: default_temp_prefix(),
        }
    }
}

impl WorkbookConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(WorkbookError::Io)?;
        let mut config: WorkbookConfig =
            serde_json::from_str(&content).map_err(WorkbookError::Config)?;
        let extension = config.extension.clone();
        config.set_extension(&extension);
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(WorkbookError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(WorkbookError::Config)?;
        fs::write(config_path, content).map_err(WorkbookError::Io)?;
        Ok(())
    }

    /// Set the package extension (normalizes away a leading dot)
    pub fn set_extension(&mut self, ext: &str) {
        self.extension = ext.trim_start_matches('.').to_string();
    }

    /// True if `path` has the package extension.
    pub fn has_package_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}
