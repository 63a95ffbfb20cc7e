//! Cell body grammar: Markdown prose interleaved with fenced code cells.

use crate::cell::{Cell, CodeCell, MarkdownCell};
use crate::document::WorkbookDocument;
use crate::error::{Result, WorkbookError};

const MIN_FENCE: usize = 3;

/// An opening fence line.
#[derive(Debug, PartialEq)]
pub(crate) struct Fence<'a> {
    pub ticks: &'a str,
    pub language: Option<&'a str>,
    pub extra_info: Option<&'a str>,
}

impl<'a> Fence<'a> {
    /// Recognises a line that opens a fenced block. A fence with no language, or
    /// whose info string starts with whitespace, is a plain Markdown code block.
    pub fn parse(line: &'a str) -> Option<Self> {
        let count = line.bytes().take_while(|b| *b == b'`').count();
        if count < MIN_FENCE {
            return None;
        }
        let (ticks, info) = line.split_at(count);
        if info.contains('`') {
            return None;
        }
        if info.is_empty() || info.starts_with(char::is_whitespace) {
            return Some(Fence {
                ticks,
                language: None,
                extra_info: None,
            });
        }
        let (language, extra_info) = match info.split_once(' ') {
            Some((language, extra)) => (language, Some(extra)),
            None => (info, None),
        };
        Some(Fence {
            ticks,
            language: Some(language),
            extra_info,
        })
    }
}

/// Reads cells from body lines into `document`.
///
/// `offset` is the number of page lines preceding `lines`, used for error line
/// numbers. `after_block` is true when the body follows a manifest block, in which
/// case the blank separator line after that block is structural.
pub(crate) fn read_cells(
    lines: &[&str],
    offset: usize,
    after_block: bool,
    document: &mut WorkbookDocument,
) -> Result<()> {
    let mut pending: Vec<&str> = Vec::new();
    let mut after_block = after_block;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let Some(fence) = Fence::parse(line) else {
            pending.push(line);
            i += 1;
            continue;
        };

        let Some(language) = fence.language else {
            // Plain fenced block: part of the prose, contents are not scanned.
            pending.push(line);
            i += 1;
            while i < lines.len() {
                pending.push(lines[i]);
                i += 1;
                if lines[i - 1] == fence.ticks {
                    break;
                }
            }
            continue;
        };

        flush_markdown(&mut pending, after_block, true, document);

        let start = i + 1;
        let close = lines[start..]
            .iter()
            .position(|l| *l == fence.ticks)
            .map(|p| start + p)
            .ok_or_else(|| {
                WorkbookError::format_at(
                    offset + i + 1,
                    format!("'{}' code block is missing its closing fence", language),
                )
            })?;

        let mut cell = CodeCell::new(language, lines[start..close].join("\n"));
        cell.extra_info = fence.extra_info.map(str::to_string);
        document.append(cell);

        after_block = true;
        i = close + 1;
    }

    flush_markdown(&mut pending, after_block, false, document);
    Ok(())
}

fn flush_markdown(
    pending: &mut Vec<&str>,
    drop_leading: bool,
    drop_trailing: bool,
    document: &mut WorkbookDocument,
) {
    let mut segment = &pending[..];
    if drop_leading && segment.first() == Some(&"") {
        segment = &segment[1..];
    }
    if drop_trailing && segment.last() == Some(&"") {
        segment = &segment[..segment.len() - 1];
    }
    if !segment.is_empty() {
        document.append(MarkdownCell::new(segment.join("\n")));
    }
    pending.clear();
}

/// Renders one cell as a page block.
pub(crate) fn write_cell(cell: &Cell, out: &mut String) -> Result<()> {
    match cell {
        Cell::Markdown(markdown) => out.push_str(&markdown.buffer),
        Cell::Code(code) => {
            validate_info(code)?;
            let fence = "`".repeat(fence_length(&code.buffer));
            out.push_str(&fence);
            out.push_str(&code.language_name);
            if let Some(extra) = &code.extra_info {
                out.push(' ');
                out.push_str(extra);
            }
            out.push('\n');
            out.push_str(&code.buffer);
            out.push('\n');
            out.push_str(&fence);
        }
    }
    Ok(())
}

/// Smallest fence that no line of `buffer` can close.
pub(crate) fn fence_length(buffer: &str) -> usize {
    buffer
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty() && line.bytes().all(|b| b == b'`'))
        .map(|line| line.len() + 1)
        .fold(MIN_FENCE, usize::max)
}

fn validate_info(code: &CodeCell) -> Result<()> {
    let language = &code.language_name;
    if language.is_empty() || language.contains(|c: char| c.is_whitespace() || c == '`') {
        return Err(WorkbookError::InvalidOperation(format!(
            "'{}' is not a valid code cell language",
            language
        )));
    }
    if let Some(extra) = &code.extra_info {
        if extra.contains(|c: char| c == '\n' || c == '\r' || c == '`') {
            return Err(WorkbookError::InvalidOperation(format!(
                "extra info for the '{}' cell must be a single line without backticks",
                language
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str, after_block: bool) -> Result<WorkbookDocument> {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut document = WorkbookDocument::new();
        read_cells(&lines, 0, after_block, &mut document)?;
        Ok(document)
    }

    #[test]
    fn test_fence_parse() {
        assert_eq!(Fence::parse("``"), None);
        assert_eq!(Fence::parse("```cs `x`"), None);
        let plain = Fence::parse("````").unwrap();
        assert_eq!(plain.ticks, "````");
        assert_eq!(plain.language, None);
        assert_eq!(Fence::parse("``` csharp").unwrap().language, None);

        let code = Fence::parse("```csharp hidden run=false").unwrap();
        assert_eq!(code.language, Some("csharp"));
        assert_eq!(code.extra_info, Some("hidden run=false"));
    }

    #[test]
    fn test_markdown_and_code_cells() {
        let document = read("# Title\n\nSome text\n\n```csharp\n2 + 2\n```\n\nMore", false).unwrap();
        let cells: Vec<&Cell> = document.cells().collect();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0], &Cell::markdown("# Title\n\nSome text"));
        assert_eq!(cells[1], &Cell::code("csharp", "2 + 2"));
        assert_eq!(cells[2], &Cell::markdown("More"));
    }

    #[test]
    fn test_separator_after_manifest_is_dropped() {
        let document = read("\nHello", true).unwrap();
        assert_eq!(document[0], Cell::markdown("Hello"));

        let document = read("\nHello", false).unwrap();
        assert_eq!(document[0], Cell::markdown("\nHello"));
    }

    #[test]
    fn test_adjacent_code_cells() {
        let document = read("```csharp\na\n```\n\n```fsharp\nb\n```", false).unwrap();
        assert_eq!(document.len(), 2);
        assert_eq!(document[1], Cell::code("fsharp", "b"));
    }

    #[test]
    fn test_plain_fence_contents_are_not_scanned() {
        let text = "Example:\n\n```\n```csharp\nnot a cell\n```\n\nDone";
        let document = read(text, false).unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(document[0].buffer(), text);
    }

    #[test]
    fn test_longer_fence_contains_shorter_runs() {
        let document = read("````csharp\nvar s = @\"\n```\n\";\n````", false).unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(document[0].buffer(), "var s = @\"\n```\n\";");
    }

    #[test]
    fn test_missing_closing_fence_reports_line() {
        let err = read("intro\n\n```csharp\n2 + 2", false).unwrap_err();
        match err {
            WorkbookError::Format { line, .. } => assert_eq!(line, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_code_cell() {
        let mut out = String::new();
        let cell: Cell = CodeCell::new("csharp", "2 + 2")
            .with_extra_info("hidden")
            .into();
        write_cell(&cell, &mut out).unwrap();
        assert_eq!(out, "```csharp hidden\n2 + 2\n```");
    }

    #[test]
    fn test_fence_length_outgrows_buffer_fences() {
        assert_eq!(fence_length("2 + 2"), 3);
        assert_eq!(fence_length("```\nx\n```"), 4);
        assert_eq!(fence_length("a ````` b\n`````"), 6);
    }

    #[test]
    fn test_invalid_language_is_refused() {
        let mut out = String::new();
        assert!(write_cell(&Cell::code("", "x"), &mut out).is_err());
        assert!(write_cell(&Cell::code("c sharp", "x"), &mut out).is_err());
    }
}
