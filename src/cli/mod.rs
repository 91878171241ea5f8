//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Workspace setup | `init` |
//! | Page | Global pages and their versions | `page new`, `page edit`, `page publish` |
//! | Region | Translations and sync | `region add`, `region status`, `region accept` |
//! | Bin | Soft-deleted records | `bin list`, `bin restore`, `bin purge` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON; errors carry a stable `code`
//!
//! ## Logging
//!
//! Use `--verbose` (or `-v`) for debug logs, or set `PAGESYNC_LOG`:
//! ```bash
//! PAGESYNC_LOG=pagesync=trace pagesync page publish p-1a2b3c4
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod common;
mod page;
mod region;
mod bin_cmd;

pub use app::{Cli, Commands, Reported, run};
pub use output::{Output, OutputFormat};
