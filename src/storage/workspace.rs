//! Workspace management
//!
//! Handles workspace initialization, locking, and loading and saving the
//! content repository.
//!
//! Every record, active or deleted, is one line of `content.jsonl`. A save
//! replaces that file in a single rename, so a record moving between the
//! active set and the recycle bin is never lost or stored twice by an
//! interrupted write.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Config, JsonlStore};
use crate::domain::{Page, Translation, Versioned};
use crate::repository::{ContentRepository, DeletedItem};
use crate::translator::Translators;

/// Directory holding a workspace's records and configuration
pub const WORKSPACE_DIR: &str = ".pagesync";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not in a pagesync workspace. Run 'pagesync init' first.")]
    NotInWorkspace,

    #[error("Workspace records are inconsistent: {0}")]
    Corrupt(String),
}

/// One line of the content file
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StoredRecord {
    Page(Versioned<Page>),
    Translation(Versioned<Translation>),
    Deleted(DeletedItem),
}

/// Exclusive hold on a workspace; released on drop
pub struct WorkspaceLock {
    file: File,
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// A pagesync workspace
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(WORKSPACE_DIR).is_dir() {
            return Err(WorkspaceError::NotInWorkspace.into());
        }

        let config = Config::for_workspace(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the workspace at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_workspace_root().ok_or(WorkspaceError::NotInWorkspace)?;

        Self::open(root)
    }

    /// Initializes a workspace at the given path; safe to run twice
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let dir = root.join(WORKSPACE_DIR);

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {} directory: {}", WORKSPACE_DIR, dir.display()))?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# pagesync workspace configuration

# Author recorded on edits (defaults to $PAGESYNC_AUTHOR, then $USER)
# author = "Alex M."

# Method for 'pagesync region add' when --method is not given: "ai" or "copy"
default_method = "ai"

[translator]
# Command used for "ai" generation. It receives one JSON request line on
# stdin and answers with one JSON response line on stdout.
# command = "pagesync-translate"
args = []

[propagation]
# Re-publish regenerated translations that were published
republish = true

[bin]
# Days after which 'pagesync bin purge --expired' drops deleted items
# retention_days = 30
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Lock file held while a command runs
.lock

# Interrupted writes
*.tmp
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        tracing::info!(root = %root.display(), "Initialized workspace");
        Self::open(root)
    }

    /// Returns the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .pagesync directory path
    pub fn dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Path of the file holding every page, translation and bin entry
    pub fn content_path(&self) -> PathBuf {
        self.dir().join("content.jsonl")
    }

    fn content_store(&self) -> JsonlStore<StoredRecord> {
        JsonlStore::new(self.content_path())
    }

    /// Blocks until no other process holds the workspace
    ///
    /// Hold the lock across load, mutate and save.
    pub fn lock(&self) -> Result<WorkspaceLock> {
        let path = self.dir().join(".lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock workspace: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Locked workspace");

        Ok(WorkspaceLock { file })
    }

    /// Loads every record into a repository
    pub fn load(&self) -> Result<ContentRepository> {
        let mut pages = Vec::new();
        let mut translations = Vec::new();
        let mut bin = Vec::new();
        for record in self.content_store().read_all()? {
            match record {
                StoredRecord::Page(page) => pages.push(page),
                StoredRecord::Translation(translation) => translations.push(translation),
                StoredRecord::Deleted(item) => bin.push(item),
            }
        }
        tracing::debug!(
            pages = pages.len(),
            translations = translations.len(),
            deleted = bin.len(),
            "Loaded workspace"
        );

        let repo = ContentRepository::from_parts(pages, translations, bin)
            .map_err(|e| WorkspaceError::Corrupt(e.to_string()))?;
        Ok(repo.with_policy(self.config.project.sync_policy()))
    }

    /// Writes every record back to disk in one atomic replace
    pub fn save(&self, repo: &ContentRepository) -> Result<()> {
        let records: Vec<StoredRecord> = repo
            .page_records()
            .cloned()
            .map(StoredRecord::Page)
            .chain(repo.translation_records().cloned().map(StoredRecord::Translation))
            .chain(repo.bin().items().cloned().map(StoredRecord::Deleted))
            .collect();

        let count = self.content_store().write_all(&records)?;
        tracing::debug!(records = count, "Saved workspace");
        Ok(())
    }

    /// Translators configured for this workspace
    pub fn translators(&self) -> Result<Translators> {
        self.config.project.translators()
    }

    /// Author recorded on edits
    pub fn author(&self) -> String {
        self.config.project.effective_author()
    }
}
