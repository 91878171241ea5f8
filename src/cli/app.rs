//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{bin_cmd, page, region};
use crate::storage::{Config, Workspace};

#[derive(Parser)]
#[command(name = "pagesync")]
#[command(author, version, about = "Multi-region page management with translation sync")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new pagesync workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage Global pages
    #[command(subcommand)]
    Page(page::PageCommands),

    /// Manage regional translations and their sync with Global pages
    #[command(subcommand)]
    Region(region::RegionCommands),

    /// Manage the recycle bin
    #[command(subcommand)]
    Bin(bin_cmd::BinCommands),
}

/// Returned by [`run`] once the error has been printed
#[derive(Debug, Error)]
#[error("command failed")]
pub struct Reported;

/// Sets up logging to stderr
///
/// `PAGESYNC_LOG` takes an env-filter directive; otherwise only warnings
/// are shown, or debug output for pagesync with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "pagesync=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("PAGESYNC_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => match Config::load() {
            Ok(config) => config.global.default_format,
            Err(e) => {
                tracing::warn!("Ignoring unreadable configuration: {:#}", e);
                OutputFormat::default()
            }
        },
    };
    let output = Output::new(format);
    tracing::debug!(?format, "pagesync starting");

    if let Err(e) = execute(cli.command, &output) {
        output.error(&e);
        return Err(Reported.into());
    }

    tracing::debug!("Command completed successfully");
    Ok(())
}

fn execute(command: Commands, output: &Output) -> Result<()> {
    match command {
        Commands::Init { path } => {
            tracing::debug!(%path, "Initializing workspace");
            let workspace = Workspace::init(&path)?;
            if output.is_json() {
                output.data(&serde_json::json!({
                    "root": workspace.root().display().to_string(),
                    "dir": workspace.dir().display().to_string(),
                }));
            } else {
                output.success(&format!(
                    "Initialized pagesync workspace at {}",
                    workspace.root().display()
                ));
            }
        }

        Commands::Page(cmd) => page::run(cmd, output)?,
        Commands::Region(cmd) => region::run(cmd, output)?,
        Commands::Bin(cmd) => bin_cmd::run(cmd, output)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pagesync", "page", "list", "--format", "json", "-v"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(cli.verbose);
    }

    #[test]
    fn purge_flags_conflict() {
        let result = Cli::try_parse_from(["pagesync", "bin", "purge", "p-1a2b3c4", "--expired"]);
        assert!(result.is_err());
    }
}
