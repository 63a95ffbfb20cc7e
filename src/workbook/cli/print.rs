use colored::Colorize;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use workbook::cell::{Cell, CellKind};
use workbook::package::WorkbookPackage;
use workbook::page::WorkbookPage;

const LABEL_WIDTH: usize = 12;
const SUMMARY_WIDTH: usize = 60;

pub(super) fn render_info(package: &WorkbookPackage, dependencies: &[PathBuf]) -> String {
    let page = package.page();
    let manifest = &page.manifest;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {}",
        package.logical_path().display().to_string().bold(),
        format!("({})", package.storage_mode()).dimmed()
    );
    field(&mut out, "id", &manifest.id().to_string());
    field(&mut out, "uti", manifest.uti());
    if let Some(title) = manifest.title() {
        field(&mut out, "title", title);
    }

    if !manifest.platform_targets().is_empty() {
        let platforms: Vec<&str> = manifest.platform_targets().iter().map(|p| p.name()).collect();
        field(&mut out, "platforms", &platforms.join(", "));
    }

    if !manifest.packages.is_empty() {
        section(&mut out, "packages");
        for reference in manifest.packages.iter() {
            let line = match (reference.original_range_string(), reference.normalized_range_string()) {
                (Some(original), Some(normalized)) if original != normalized => format!(
                    "{} {} {}",
                    reference.id().as_str().yellow(),
                    original,
                    format!("→ {}", normalized).dimmed()
                ),
                (Some(original), _) => format!("{} {}", reference.id().as_str().yellow(), original),
                (None, _) => reference.id().as_str().yellow().to_string(),
            };
            let _ = writeln!(out, "    {}", line);
        }
    }

    if !manifest.properties.is_empty() {
        section(&mut out, "properties");
        for (key, value) in manifest.properties.iter() {
            let _ = writeln!(out, "    {} = {}", key, value);
        }
    }

    let code = page.contents.code_cells().count();
    field(
        &mut out,
        "cells",
        &format!(
            "{} ({} markdown, {} code)",
            page.contents.len(),
            page.contents.len() - code,
            code
        ),
    );

    if !dependencies.is_empty() {
        section(&mut out, "files");
        for file in dependencies {
            let _ = writeln!(out, "    {}", file.display());
        }
    }

    if page.needs_migration() {
        let _ = writeln!(
            out,
            "{}",
            "The manifest will be rewritten as YAML front matter on save.".yellow()
        );
    }

    out
}

pub(super) fn render_cells(page: &WorkbookPage) -> String {
    if page.contents.is_empty() {
        return format!("{}\n", "No cells.".dimmed());
    }

    let mut out = String::new();
    for (index, cell) in page.contents.cells().enumerate() {
        let kind = match cell.kind() {
            CellKind::Markdown => format!("{:<8}", cell.kind()).normal(),
            CellKind::Code => format!("{:<8}", cell.kind()).cyan(),
        };
        let language = match cell {
            Cell::Code(code) => code.language_name.as_str(),
            Cell::Markdown(_) => "",
        };
        let _ = writeln!(
            out,
            "{:>4}  {} {:<8} {}",
            (index + 1).to_string().yellow(),
            kind,
            language,
            summary(cell.buffer()).dimmed()
        );
    }
    out
}

pub(super) fn render_saved(destination: &Path, package: &WorkbookPackage) -> String {
    format!(
        "{} {} {}\n",
        "Saved".green(),
        destination.display(),
        format!("({})", package.storage_mode()).dimmed()
    )
}

pub(super) fn render_migrated() -> String {
    format!("{}\n", "Manifest migrated to YAML front matter.".dimmed())
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {:<width$}{}", label, value, width = LABEL_WIDTH);
}

fn section(out: &mut String, label: &str) {
    let _ = writeln!(out, "  {}", label);
}

/// First non-blank line of `buffer`, shortened to fit one terminal line.
fn summary(buffer: &str) -> String {
    let line = buffer
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    if line.chars().count() <= SUMMARY_WIDTH {
        return line.to_string();
    }
    let mut short: String = line.chars().take(SUMMARY_WIDTH - 1).collect();
    short.push('…');
    short
}
