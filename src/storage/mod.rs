//! # Storage Layer
//!
//! Persistence for pagesync workspaces with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Pages, translations, recycle bin | JSONL, one tagged record per line | `.pagesync/content.jsonl` |
//! | Config | TOML | `.pagesync/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`Workspace::lock`] holds an exclusive `fs2` lock for a whole
//!   load-mutate-save cycle
//! - [`JsonlStore`] takes shared locks on read and exclusive locks on write
//! - All writes are atomic (temp file + rename); one save is one rename,
//!   so moving a record into or out of the bin is all-or-nothing
//!
//! ## Workspace Structure
//!
//! ```text
//! .pagesync/
//! ├── content.jsonl         # Global pages, translations and bin entries
//! ├── config.toml           # Workspace configuration
//! ├── .lock                 # Held while a command runs
//! └── .gitignore
//! ```

mod config;
mod jsonl;
mod workspace;

pub use config::{
    BinConfig, Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, PropagationConfig,
    TranslatorConfig,
};
pub use jsonl::JsonlStore;
pub use workspace::{Workspace, WorkspaceError, WorkspaceLock, WORKSPACE_DIR};
