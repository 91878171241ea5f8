//! Configuration handling for pagesync
//!
//! Configuration is stored in `.pagesync/config.toml` (workspace) and
//! `~/.config/pagesync/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::GenerationMethod;
use crate::repository::SyncPolicy;
use crate::translator::{CommandTranslator, Translators};

use super::workspace::WORKSPACE_DIR;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// External machine-translation command
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Program to run for `ai` generation; `ai` is unavailable when unset
    pub command: Option<String>,

    /// Arguments passed to the command
    pub args: Vec<String>,
}

/// How publishing a Global page reaches its translations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PropagationConfig {
    /// Re-publish regenerated translations that were Published
    pub republish: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self { republish: true }
    }
}

/// Recycle bin settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BinConfig {
    /// Days after which `bin purge --expired` drops deleted items
    pub retention_days: Option<u32>,
}

/// Workspace-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Author recorded on edits (defaults to $PAGESYNC_AUTHOR, then $USER)
    pub author: Option<String>,

    /// Method used by `region add` when none is given
    pub default_method: GenerationMethod,

    pub translator: TranslatorConfig,

    pub propagation: PropagationConfig,

    pub bin: BinConfig,
}

impl ProjectConfig {
    /// Gets the effective author from config, environment, or defaults
    pub fn effective_author(&self) -> String {
        self.author
            .clone()
            .or_else(|| std::env::var("PAGESYNC_AUTHOR").ok())
            .or_else(|| std::env::var("USER").ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    /// Builds the translator set this workspace is configured for
    pub fn translators(&self) -> Result<Translators> {
        let translators = Translators::new();
        match &self.translator.command {
            Some(command) if command.trim().is_empty() => {
                Err(ConfigError::Invalid("translator.command is empty".to_string()).into())
            }
            Some(command) => Ok(translators.with_ai(CommandTranslator::new(
                command,
                self.translator.args.clone(),
            ))),
            None => Ok(translators),
        }
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            republish: self.propagation.republish,
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + workspace)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub workspace_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let workspace_root = Self::find_workspace_root();
        let project = match &workspace_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };

        Ok(Self {
            project,
            global,
            workspace_root,
        })
    }

    /// Loads configuration for a specific workspace
    pub fn for_workspace(root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(root)?;

        Ok(Self {
            project,
            global,
            workspace_root: Some(root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "pagesync", "pagesync").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    fn load_project_config(root: &Path) -> Result<ProjectConfig> {
        let config_path = root.join(WORKSPACE_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read workspace config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse workspace config")
    }

    /// Finds the workspace root by looking for a `.pagesync/` directory
    pub fn find_workspace_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns the workspace root, or an error if not in a workspace
    pub fn require_workspace_root(&self) -> Result<&Path> {
        self.workspace_root
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not in a pagesync workspace. Run 'pagesync init' first."))
    }

    /// Saves the workspace configuration
    pub fn save_project(&self) -> Result<()> {
        let root = self.require_workspace_root()?;
        let config_path = root.join(WORKSPACE_DIR).join("config.toml");

        let content =
            toml::to_string_pretty(&self.project).context("Failed to serialize workspace config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write workspace config: {}", config_path.display()))
    }
}
