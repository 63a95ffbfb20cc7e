//! # Workbook CLI
//!
//! The binary is a thin client of the `workbook` library: `cli::run()` parses the
//! arguments, opens packages through the library and renders what it gets back.
//! This file only maps errors to an exit code.
//!
//! ```text
//! workbook info  <path>                         manifest, cells, dependencies
//! workbook cells <path>                         one line per cell
//! workbook save  <path> [--output P] [--archive]  re-save or convert
//! ```
//!
//! Logging goes to stderr through `tracing-subscriber`. The filter comes from
//! `RUST_LOG` and defaults to `warn`, or `info` with `--verbose`.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
