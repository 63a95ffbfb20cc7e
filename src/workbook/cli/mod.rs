//! # CLI Layer
//!
//! The only place that knows about terminal I/O, exit codes and output formatting.
//!
//! - `setup.rs`: clap definitions
//! - `commands.rs`: context wiring and per-command handlers
//! - `print.rs`: rendering of packages and pages for the terminal

mod commands;
mod print;
mod setup;

pub use commands::run;
