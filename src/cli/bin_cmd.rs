//! Recycle bin CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::common::{inspect, mutate};
use super::output::Output;
use crate::domain::Locale;
use crate::repository::{BinQuery, BinTarget, DeletedItem};

#[derive(Subcommand)]
pub enum BinCommands {
    /// List deleted pages and translations, newest first
    List {
        /// Only Global pages ("global") or one region (e.g., TW)
        #[arg(long)]
        origin: Option<String>,

        /// Match title or slug
        #[arg(long)]
        search: Option<String>,
    },

    /// Restore a deleted page or translation
    ///
    /// A page ID or translation key restores its most recent deletion;
    /// a deletion ID (d-...) picks one entry.
    Restore {
        /// Deletion ID, page ID or translation key
        key: String,
    },

    /// Permanently delete items from the bin
    ///
    /// Examples:
    ///   pagesync bin purge p-1a2b3c4@TW      # Latest deletion of a translation
    ///   pagesync bin purge d-03c9e1a         # One entry
    ///   pagesync bin purge --older-than 30   # Deleted more than 30 days ago
    ///   pagesync bin purge --expired         # Past bin.retention_days
    Purge {
        /// Deletion ID, page ID or translation key
        key: Option<String>,

        /// Purge items past the configured retention
        #[arg(long, conflicts_with = "key")]
        expired: bool,

        /// Purge items deleted more than this many days ago
        #[arg(long, value_name = "DAYS", conflicts_with_all = ["key", "expired"])]
        older_than: Option<u32>,
    },

    /// Permanently delete everything in the bin
    Empty,
}

pub fn run(cmd: BinCommands, output: &Output) -> Result<()> {
    match cmd {
        BinCommands::List { origin, search } => list(output, origin.as_deref(), search),
        BinCommands::Restore { key } => restore(output, &key.parse()?),
        BinCommands::Purge {
            key,
            expired,
            older_than,
        } => match (key, expired, older_than) {
            (Some(key), _, _) => purge(output, &key.parse()?),
            (None, true, _) => purge_expired(output, None),
            (None, false, Some(days)) => purge_expired(output, Some(days)),
            (None, false, None) => bail!("Specify a key, --expired or --older-than DAYS"),
        },
        BinCommands::Empty => empty(output),
    }
}

fn parse_origin(origin: &str) -> Result<Option<Locale>> {
    if origin.eq_ignore_ascii_case("global") {
        Ok(None)
    } else {
        Ok(Some(origin.parse()?))
    }
}

fn list(output: &Output, origin: Option<&str>, search: Option<String>) -> Result<()> {
    let query = BinQuery {
        origin: origin.map(parse_origin).transpose()?,
        search,
    };

    inspect(|_, repo| {
        let items = repo.bin().list(&query);

        if output.is_json() {
            output.data(&items);
        } else if items.is_empty() {
            println!("Recycle bin is empty");
        } else {
            println!(
                "{:<10} {:<18} {:<8} {:<17} {:<16} {:<28} TITLE",
                "ID", "KEY", "ORIGIN", "DELETED", "BY", "SLUG"
            );
            println!("{}", "-".repeat(110));
            for item in &items {
                let doc = item.doc();
                println!(
                    "{:<10} {:<18} {:<8} {:<17} {:<16} {:<28} {}",
                    item.id.to_string(),
                    item.key().to_string(),
                    item.locale().map_or("global", Locale::as_str),
                    item.deleted_at.format("%Y-%m-%d %H:%M").to_string(),
                    item.deleted_by,
                    doc.slug.to_string(),
                    doc.title
                );
            }
        }
        Ok(())
    })
}

fn restore(output: &Output, target: &BinTarget) -> Result<()> {
    let restored = mutate(|_, repo| Ok(repo.restore(target.clone())?))?;

    if output.is_json() {
        output.data(&serde_json::json!({ "restored": restored }));
    } else {
        output.success(&format!("Restored {}", restored));
    }
    Ok(())
}

fn purge(output: &Output, target: &BinTarget) -> Result<()> {
    let item = mutate(|_, repo| Ok(repo.bin_mut().purge(target.clone())?))?;

    if output.is_json() {
        output.data(&serde_json::json!({ "purged": [summary(&item)] }));
    } else {
        output.success(&format!("Permanently deleted {} ({})", item.key(), item.id));
    }
    Ok(())
}

fn summary(item: &DeletedItem) -> serde_json::Value {
    serde_json::json!({ "id": item.id, "key": item.key() })
}

/// Purges by age; `None` uses the configured retention
fn purge_expired(output: &Output, days: Option<u32>) -> Result<()> {
    let purged = mutate(|ws, repo| {
        let days = match days.or(ws.config().project.bin.retention_days) {
            Some(days) => days,
            None => bail!("bin.retention_days is not set in .pagesync/config.toml; use --older-than DAYS"),
        };
        Ok(repo.purge_expired(days))
    })?;

    if output.is_json() {
        let purged: Vec<_> = purged.iter().map(summary).collect();
        output.data(&serde_json::json!({ "purged": purged }));
    } else if purged.is_empty() {
        println!("Nothing to purge");
    } else {
        output.success(&format!("Permanently deleted {} item(s)", purged.len()));
    }
    Ok(())
}

fn empty(output: &Output) -> Result<()> {
    let count = mutate(|_, repo| Ok(repo.bin_mut().purge_all()))?;

    if output.is_json() {
        output.data(&serde_json::json!({ "purged": count }));
    } else {
        output.success(&format!("Emptied the recycle bin ({} item(s))", count));
    }
    Ok(())
}
