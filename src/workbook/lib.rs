//! # Workbook Architecture
//!
//! A workbook is a page of alternating markdown and code cells, plus a manifest that
//! says what the page targets and which packages it needs. This crate owns the in-memory
//! model, the on-disk page format, and the package that holds a page together with the
//! files it refers to. The `workbook` binary is a thin client over it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, renders output, sets up logging        │
//! │  - The only place that knows about stdout and exit codes    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Package Layer (package/)                                   │
//! │  - Directory, archive and bare-page storage                 │
//! │  - Quarantine checks, cancellation, staged saves            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Page Layer (page.rs, format/)                              │
//! │  - Front matter, fenced code cells, legacy JSON manifests   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Model (document.rs, cell.rs, manifest.rs, packages/)       │
//! │  - Ordered cells with stable handles, typed manifest        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing below the CLI layer writes to stdout or stderr; diagnostics go through
//! `tracing`.
//!
//! ## Module Overview
//!
//! - [`cell`]: Markdown and code cells
//! - [`document`]: Ordered cell list with generation-checked [`document::CellId`] handles
//! - [`manifest`]: Page metadata, platform targets and extra properties
//! - [`packages`]: NuGet-style versions, ranges and package references
//! - [`format`]: Reading and writing the page text format
//! - [`page`]: A manifest and its contents as one unit
//! - [`dependencies`]: Files a page refers to by relative path
//! - [`package`]: Opening and saving workbook packages
//! - [`config`]: Package conventions loaded from `config.json`
//! - [`error`]: Error types
//! - `cli`: Argument parsing and printing for the binary (not part of the lib API)

pub mod cell;
pub mod config;
pub mod dependencies;
pub mod document;
pub mod error;
pub mod format;
pub mod manifest;
pub mod package;
pub mod packages;
pub mod page;

pub use cell::{Cell, CellKind, CodeCell, MarkdownCell};
pub use document::{CellId, WorkbookDocument};
pub use error::{Result, WorkbookError};
pub use manifest::{Manifest, PlatformTarget};
pub use package::{SaveOperation, SaveOptions, StorageMode, WorkbookPackage};
pub use page::WorkbookPage;
