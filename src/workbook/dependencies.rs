//! Finds files a page refers to by relative path.
//!
//! Markdown cells contribute link and image destinations. Code cells contribute the
//! quoted argument of `#load` and `#r` directives. Anything that looks like a URL, an
//! absolute path or an in-page anchor is ignored.

use crate::cell::Cell;
use crate::document::WorkbookDocument;
use pulldown_cmark::{Event, Parser, Tag};
use std::path::{Component, Path, PathBuf};

const DIRECTIVES: [&str; 2] = ["#load", "#r"];

/// Relative paths referenced by `contents`, in document order, without duplicates.
pub fn collect(contents: &WorkbookDocument) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for cell in contents.cells() {
        match cell {
            Cell::Markdown(markdown) => collect_markdown(&markdown.buffer, &mut found),
            Cell::Code(code) => collect_directives(&code.buffer, &mut found),
        }
    }
    found
}

fn collect_markdown(text: &str, found: &mut Vec<PathBuf>) {
    for event in Parser::new(text) {
        let destination = match event {
            Event::Start(Tag::Link { dest_url, .. }) => dest_url,
            Event::Start(Tag::Image { dest_url, .. }) => dest_url,
            _ => continue,
        };
        push_relative(&destination, found);
    }
}

fn collect_directives(source: &str, found: &mut Vec<PathBuf>) {
    for line in source.lines() {
        if let Some(argument) = directive_argument(line) {
            push_relative(argument, found);
        }
    }
}

fn directive_argument(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let rest = DIRECTIVES
        .iter()
        .find_map(|directive| line.strip_prefix(directive))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let quoted = rest.trim_start().strip_prefix('"')?;
    let end = quoted.find('"')?;
    Some(&quoted[..end])
}

fn push_relative(target: &str, found: &mut Vec<PathBuf>) {
    if let Some(path) = relative_path(target) {
        if !found.contains(&path) {
            found.push(path);
        }
    }
}

/// The normalized relative path `target` names, if it names one.
pub fn relative_path(target: &str) -> Option<PathBuf> {
    let target = target.split(['#', '?']).next().unwrap_or_default().trim();
    if target.is_empty() || target.contains(':') || target.starts_with(['/', '\\']) {
        return None;
    }

    let mut path = PathBuf::new();
    for component in Path::new(target).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            // Leaving the package is not a dependency of the package.
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!path.as_os_str().is_empty()).then_some(path)
}
