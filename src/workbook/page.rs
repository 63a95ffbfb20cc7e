use crate::document::WorkbookDocument;
use crate::error::Result;
use crate::format::{self, ManifestSource};
use crate::manifest::{Manifest, PlatformTarget};

/// One page of a workbook: its cells and its manifest.
#[derive(Debug, Clone)]
pub struct WorkbookPage {
    pub contents: WorkbookDocument,
    pub manifest: Manifest,
    source: Option<ManifestSource>,
}

impl PartialEq for WorkbookPage {
    fn eq(&self, other: &Self) -> bool {
        self.manifest == other.manifest && self.contents == other.contents
    }
}

impl Default for WorkbookPage {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookPage {
    /// An empty page with a freshly generated id.
    pub fn new() -> Self {
        Self {
            contents: WorkbookDocument::new(),
            manifest: Manifest::new(),
            source: None,
        }
    }

    pub fn with_platform_targets(platforms: impl IntoIterator<Item = PlatformTarget>) -> Self {
        let mut page = Self::new();
        page.manifest.set_platform_targets(platforms);
        page
    }

    pub fn read(text: &str) -> Result<Self> {
        let parsed = format::read(text)?;
        Ok(Self {
            contents: parsed.contents,
            manifest: parsed.manifest,
            source: Some(parsed.source),
        })
    }

    pub fn write(&self) -> Result<String> {
        format::write(&self.manifest, &self.contents)
    }

    /// How the manifest was stored when the page was read; `None` for new pages.
    pub fn manifest_source(&self) -> Option<ManifestSource> {
        self.source
    }

    /// True if saving will rewrite a manifest that is not YAML front matter.
    pub fn needs_migration(&self) -> bool {
        matches!(
            self.source,
            Some(ManifestSource::LegacyJson) | Some(ManifestSource::Missing)
        )
    }

    pub fn title(&self) -> Option<&str> {
        self.manifest.title()
    }
}
