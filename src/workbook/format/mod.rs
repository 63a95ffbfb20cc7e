//! # Page Text Format
//!
//! A page is UTF-8 text made of blocks separated by one blank line:
//!
//! ````text
//! ---                        <- YAML front matter (the manifest)
//! uti: com.xamarin.workbook
//! id: 2b4bbf2c-3f5d-4d4a-8c8a-4f0a6a9e4e11
//! ---
//!
//! Markdown prose
//!
//! ```csharp                  <- code cell, fence info = language [extra info]
//! 2 + 2
//! ```
//! ````
//!
//! Reading sniffs the first line to pick a manifest grammar: `---` is YAML front
//! matter, ```` ```json ```` is the legacy JSON block, anything else means the page
//! has no manifest. Writing always produces YAML front matter, so a legacy page is
//! upgraded the first time it is saved.
//!
//! Writing then reading yields the same manifest and the same cell sequence, with
//! one inherent exception: two adjacent Markdown cells are read back as one.

mod body;
mod front_matter;
mod legacy;

use crate::document::WorkbookDocument;
use crate::error::Result;
use crate::manifest::Manifest;
use tracing::debug;

pub(crate) use body::fence_length;

const BLOCK_SEPARATOR: &str = "\n\n";
const BOM: char = '\u{feff}';

/// Where a page's manifest was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSource {
    FrontMatter,
    LegacyJson,
    Missing,
}

#[derive(Debug)]
pub struct ParsedPage {
    pub manifest: Manifest,
    pub contents: WorkbookDocument,
    pub source: ManifestSource,
}

pub fn read(text: &str) -> Result<ParsedPage> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let lines: Vec<&str> = if text.is_empty() {
        Vec::new()
    } else if uses_crlf(text) {
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect()
    } else {
        // A `\r` in an LF page belongs to a cell buffer.
        text.split('\n').collect()
    };

    let (manifest, consumed, source) = match lines.first() {
        Some(&front_matter::DELIMITER) => {
            let (manifest, consumed) = front_matter::read_manifest(&lines)?;
            (manifest, consumed, ManifestSource::FrontMatter)
        }
        Some(&legacy::MARKER) => {
            let (mapping, consumed) = legacy::read(&lines)?;
            debug!("Reading legacy json manifest; it will be rewritten as yaml on save");
            (Manifest::from_mapping(mapping)?, consumed, ManifestSource::LegacyJson)
        }
        _ => (Manifest::new(), 0, ManifestSource::Missing),
    };

    let mut contents = WorkbookDocument::new();
    body::read_cells(
        &lines[consumed..],
        consumed,
        source != ManifestSource::Missing,
        &mut contents,
    )?;

    Ok(ParsedPage {
        manifest,
        contents,
        source,
    })
}

/// The line ending of a page is the one its first line ends with.
fn uses_crlf(text: &str) -> bool {
    text.find('\n')
        .is_some_and(|end| text[..end].ends_with('\r'))
}

pub fn write(manifest: &Manifest, contents: &WorkbookDocument) -> Result<String> {
    let mut out = String::new();
    front_matter::write(manifest, &mut out)?;
    for cell in contents.cells() {
        out.push_str(BLOCK_SEPARATOR);
        body::write_cell(cell, &mut out)?;
    }
    Ok(out)
}
