//! Cell types.
//!
//! A workbook is an ordered sequence of cells. Prose lives in [`MarkdownCell`]s and
//! executable source in [`CodeCell`]s. Cells are plain values; linkage and ownership
//! are handled by [`crate::document::WorkbookDocument`].

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownCell {
    pub buffer: String,
}

impl MarkdownCell {
    pub fn new(buffer: impl Into<String>) -> Self {
        Self {
            buffer: buffer.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCell {
    /// Identifier from the fence info string, e.g. `csharp`.
    pub language_name: String,
    /// Everything after the first space of the info string, kept verbatim.
    pub extra_info: Option<String>,
    pub buffer: String,
}

impl CodeCell {
    pub fn new(language_name: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self {
            language_name: language_name.into(),
            extra_info: None,
            buffer: buffer.into(),
        }
    }

    pub fn with_extra_info(mut self, extra_info: impl Into<String>) -> Self {
        self.extra_info = Some(extra_info.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Markdown(MarkdownCell),
    Code(CodeCell),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Markdown,
    Code,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKind::Markdown => write!(f, "markdown"),
            CellKind::Code => write!(f, "code"),
        }
    }
}

impl Cell {
    pub fn markdown(buffer: impl Into<String>) -> Self {
        Cell::Markdown(MarkdownCell::new(buffer))
    }

    pub fn code(language_name: impl Into<String>, buffer: impl Into<String>) -> Self {
        Cell::Code(CodeCell::new(language_name, buffer))
    }

    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Markdown(_) => CellKind::Markdown,
            Cell::Code(_) => CellKind::Code,
        }
    }

    pub fn buffer(&self) -> &str {
        match self {
            Cell::Markdown(cell) => &cell.buffer,
            Cell::Code(cell) => &cell.buffer,
        }
    }

    pub fn buffer_mut(&mut self) -> &mut String {
        match self {
            Cell::Markdown(cell) => &mut cell.buffer,
            Cell::Code(cell) => &mut cell.buffer,
        }
    }

    pub fn as_code(&self) -> Option<&CodeCell> {
        match self {
            Cell::Code(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_markdown(&self) -> Option<&MarkdownCell> {
        match self {
            Cell::Markdown(cell) => Some(cell),
            _ => None,
        }
    }
}

impl From<MarkdownCell> for Cell {
    fn from(cell: MarkdownCell) -> Self {
        Cell::Markdown(cell)
    }
}

impl From<CodeCell> for Cell {
    fn from(cell: CodeCell) -> Self {
        Cell::Code(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_access_is_uniform() {
        let mut cell = Cell::code("csharp", "2 + 2");
        assert_eq!(cell.buffer(), "2 + 2");
        cell.buffer_mut().push_str(" + 1");
        assert_eq!(cell.as_code().unwrap().buffer, "2 + 2 + 1");
        assert!(cell.as_markdown().is_none());
    }

    #[test]
    fn test_kind() {
        assert_eq!(Cell::markdown("# Title").kind(), CellKind::Markdown);
        assert_eq!(Cell::code("fsharp", "1").kind(), CellKind::Code);
        assert_eq!(CellKind::Code.to_string(), "code");
    }

    #[test]
    fn test_extra_info_builder() {
        let cell = CodeCell::new("csharp", "x").with_extra_info("{ hidden }");
        assert_eq!(cell.extra_info.as_deref(), Some("{ hidden }"));
    }
}
