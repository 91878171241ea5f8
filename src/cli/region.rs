//! Regional translation CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::common::{expected_version, inspect, mutate, ContentArgs, EditArgs};
use super::output::Output;
use super::page::{delete, history, print_document, revert};
use crate::domain::{
    GenerationMethod, Locale, PageId, PageStatus, RecordKey, Slug, SyncStatus, Translation,
    TranslationKey,
};
use crate::repository::{TranslationQuery, TranslationView};

#[derive(Subcommand)]
pub enum RegionCommands {
    /// Add a translation of a Global page
    ///
    /// Examples:
    ///   pagesync region add p-1a2b3c4 TW               # Machine translation
    ///   pagesync region add p-1a2b3c4 JP --method copy # Verbatim copy
    Add {
        /// Global page ID
        page: String,

        /// Region code (e.g., TW, JP, EN-GB)
        locale: String,

        /// Generation method (ai, copy); defaults to the workspace setting
        #[arg(long)]
        method: Option<String>,
    },

    /// Create a page that exists only in one region
    New {
        /// Region code
        locale: String,

        /// Page title
        title: String,

        /// URL path, unique within the region
        #[arg(long)]
        slug: String,

        #[command(flatten)]
        body: ContentArgs,
    },

    /// List translations
    List {
        /// Only translations of this page
        #[arg(long)]
        page: Option<String>,

        /// Only this region
        #[arg(long)]
        locale: Option<String>,

        /// Filter by status (draft, published)
        #[arg(long)]
        status: Option<String>,

        /// Filter by sync status (synced, overridden, local)
        #[arg(long)]
        sync: Option<String>,

        /// Match title or slug
        #[arg(long)]
        search: Option<String>,

        /// Sort by last-modified, title or status
        #[arg(long, default_value = "last-modified")]
        sort: String,

        /// Sort order (asc, desc)
        #[arg(long, default_value = "desc")]
        order: String,
    },

    /// Show a translation
    Show {
        /// Translation key (PAGE@LOCALE, e.g., p-1a2b3c4@TW)
        key: String,
    },

    /// Edit a translation (edited content stops following the source)
    Edit {
        /// Translation key
        key: String,

        /// Version you are editing; fails if the translation moved on
        #[arg(long)]
        expect: Option<String>,

        #[command(flatten)]
        edit: EditArgs,
    },

    /// Publish a translation
    Publish {
        /// Translation key
        key: String,

        /// Version you are publishing
        #[arg(long)]
        expect: Option<String>,
    },

    /// Show how a translation relates to its Global source
    Status {
        /// Translation key
        key: String,
    },

    /// Diff the Global source against the local content
    Compare {
        /// Translation key
        key: String,
    },

    /// Replace the local content with the current Global source
    Accept {
        /// Translation key
        key: String,

        /// Version you are reconciling
        #[arg(long)]
        expect: Option<String>,
    },

    /// Keep the local content and stop flagging this source version
    Keep {
        /// Translation key
        key: String,

        /// Version you are reconciling
        #[arg(long)]
        expect: Option<String>,
    },

    /// List every revision of a translation
    History {
        /// Translation key
        key: String,
    },

    /// Copy an earlier revision into a new draft
    Revert {
        /// Translation key
        key: String,

        /// Revision to restore (e.g., v2)
        #[arg(value_name = "VERSION")]
        revision: String,

        /// Version you are editing
        #[arg(long)]
        expect: Option<String>,
    },

    /// Move a translation to the recycle bin
    Delete {
        /// Translation key
        key: String,
    },
}

pub fn run(cmd: RegionCommands, output: &Output) -> Result<()> {
    match cmd {
        RegionCommands::Add {
            page,
            locale,
            method,
        } => add_region(output, &page, &locale, method.as_deref()),
        RegionCommands::New {
            locale,
            title,
            slug,
            body,
        } => new_local(output, &locale, &title, &slug, body),
        RegionCommands::List {
            page,
            locale,
            status,
            sync,
            search,
            sort,
            order,
        } => {
            let query = TranslationQuery {
                page: page.map(|p| p.parse::<PageId>()).transpose()?,
                locale: locale.map(|l| l.parse::<Locale>()).transpose()?,
                status: status
                    .map(|s| s.parse::<PageStatus>())
                    .transpose()
                    .map_err(anyhow::Error::msg)?,
                sync_status: sync
                    .map(|s| s.parse::<SyncStatus>())
                    .transpose()
                    .map_err(anyhow::Error::msg)?,
                search,
                sort: sort.parse().map_err(anyhow::Error::msg)?,
                order: order.parse().map_err(anyhow::Error::msg)?,
            };
            list_regions(output, &query)
        }
        RegionCommands::Show { key } => show_region(output, &key.parse()?),
        RegionCommands::Edit { key, expect, edit } => {
            edit_region(output, &key.parse()?, expect.as_deref(), edit)
        }
        RegionCommands::Publish { key, expect } => {
            publish_region(output, &key.parse()?, expect.as_deref())
        }
        RegionCommands::Status { key } => sync_status(output, &key.parse()?),
        RegionCommands::Compare { key } => compare(output, &key.parse()?),
        RegionCommands::Accept { key, expect } => {
            accept_source(output, &key.parse()?, expect.as_deref())
        }
        RegionCommands::Keep { key, expect } => keep_local(output, &key.parse()?, expect.as_deref()),
        RegionCommands::History { key } => {
            history(output, &RecordKey::Translation(key.parse()?))
        }
        RegionCommands::Revert {
            key,
            revision,
            expect,
        } => revert(
            output,
            &RecordKey::Translation(key.parse()?),
            &revision,
            expect.as_deref(),
        ),
        RegionCommands::Delete { key } => delete(output, &RecordKey::Translation(key.parse()?)),
    }
}

fn print_translation(output: &Output, message: &str, translation: &Translation) {
    if output.is_json() {
        output.data(translation);
    } else {
        output.success(message);
    }
}

fn add_region(output: &Output, page: &str, locale: &str, method: Option<&str>) -> Result<()> {
    let id: PageId = page.parse()?;
    let locale: Locale = locale.parse()?;
    let method = method
        .map(|m| m.parse::<GenerationMethod>())
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let translation = mutate(|ws, repo| {
        let method = method.unwrap_or(ws.config().project.default_method);
        let translators = ws.translators()?;
        Ok(repo
            .add_region(&id, &locale, method, &translators, &ws.author())?
            .clone())
    })?;

    print_translation(
        output,
        &format!(
            "Added {} ({}, {}) at {}",
            translation.key(),
            translation.origin.label(),
            translation.doc.version,
            translation.doc.slug
        ),
        &translation,
    );
    Ok(())
}

fn new_local(output: &Output, locale: &str, title: &str, slug: &str, body: ContentArgs) -> Result<()> {
    let locale: Locale = locale.parse()?;
    let slug: Slug = slug.parse()?;
    let content = body.read()?.unwrap_or_default();

    let translation = mutate(|ws, repo| {
        Ok(repo
            .create_local(&locale, title, slug, &content, &ws.author())?
            .clone())
    })?;

    print_translation(
        output,
        &format!("Created local page {}: {}", translation.key(), translation.doc.title),
        &translation,
    );
    Ok(())
}

fn list_regions(output: &Output, query: &TranslationQuery) -> Result<()> {
    inspect(|_, repo| {
        let views = repo.list_translations(query);

        if output.is_json() {
            output.data(&views);
        } else if views.is_empty() {
            println!("No translations found");
        } else {
            println!(
                "{:<18} {:<11} {:<10} {:<5} {:<28} TITLE",
                "KEY", "SYNC", "STATUS", "VER", "SLUG"
            );
            println!("{}", "-".repeat(90));
            for view in &views {
                print_row(view);
            }
        }
        Ok(())
    })
}

fn print_row(view: &TranslationView<'_>) {
    let t = view.translation;
    let marker = if t.has_pending_source() { " *" } else { "" };
    println!(
        "{:<18} {:<11} {:<10} {:<5} {:<28} {}{}",
        t.key().to_string(),
        view.sync_status.to_string(),
        t.doc.status.to_string(),
        t.doc.version.to_string(),
        t.doc.slug.to_string(),
        t.doc.title,
        marker
    );
}

fn show_region(output: &Output, key: &TranslationKey) -> Result<()> {
    inspect(|_, repo| {
        let translation = repo.translation(key)?;
        let sync_status = repo.sync_status(key)?;

        if output.is_json() {
            output.data(&TranslationView {
                translation,
                sync_status,
            });
            return Ok(());
        }

        println!("{} ({})", translation.doc.title, key);
        println!("  Origin:    {}", translation.origin.label());
        println!("  Sync:      {}", sync_status);
        print_document(&translation.doc);
        if let Some(pending) = translation.pending_source {
            println!("  Source {} is waiting for review", pending);
        }

        if !translation.doc.content.is_empty() {
            println!();
            println!("{}", translation.doc.content);
        }
        Ok(())
    })
}

fn edit_region(output: &Output, key: &TranslationKey, expect: Option<&str>, args: EditArgs) -> Result<()> {
    let translation = mutate(|ws, repo| {
        let record = repo.translation_record(key)?;
        let expected = expected_version(expect, record.version());
        let edit = args.into_edit(&record.head.doc)?;

        if edit.is_empty() {
            bail!("Nothing to change. Pass --title, --content, --slug or another field.");
        }

        Ok(repo.update_translation(key, expected, &edit, &ws.author())?.clone())
    })?;

    print_translation(
        output,
        &format!(
            "Updated {} ({} {})",
            translation.key(),
            translation.doc.status,
            translation.doc.version
        ),
        &translation,
    );
    Ok(())
}

fn publish_region(output: &Output, key: &TranslationKey, expect: Option<&str>) -> Result<()> {
    let (published, version) = mutate(|ws, repo| {
        let expected = expected_version(expect, repo.translation_record(key)?.version());
        let published = repo.publish_translation(key, expected, &ws.author())?;
        Ok((published, repo.translation_record(key)?.version()))
    })?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "key": key,
            "version": version,
            "published": published,
        }));
    } else if published {
        output.success(&format!("Published {} {}", key, version));
    } else {
        output.success(&format!("{} {} was already published", key, version));
    }
    Ok(())
}

fn sync_status(output: &Output, key: &TranslationKey) -> Result<()> {
    inspect(|_, repo| {
        let translation = repo.translation(key)?;
        let status = repo.sync_status(key)?;
        let source_version = repo.source_version(translation);
        let baseline = translation.baseline.as_ref().map(|b| b.source_version);

        if output.is_json() {
            output.data(&serde_json::json!({
                "key": key,
                "sync_status": status,
                "source_version": source_version,
                "synced_from": baseline,
                "pending_source": translation.pending_source,
                "dismissed_source": translation.dismissed_source,
            }));
            return Ok(());
        }

        println!("{}: {}", key, status);
        if let Some(version) = source_version {
            println!("  Source:      {}", version);
        }
        if let Some(version) = baseline {
            println!("  Synced from: {}", version);
        }
        if let Some(version) = translation.pending_source {
            println!("  Needs review against source {} (run 'pagesync region compare {}')", version, key);
        }
        if let Some(version) = translation.dismissed_source {
            println!("  Kept local over source {}", version);
        }
        Ok(())
    })
}

fn compare(output: &Output, key: &TranslationKey) -> Result<()> {
    inspect(|ws, repo| {
        let translators = ws.translators()?;
        let comparison = repo.compare(key, &translators)?;

        if output.is_json() {
            output.data(&comparison);
        } else if comparison.is_identical() {
            println!("{} matches its source", key);
        } else {
            println!("--- source");
            println!("+++ {}", key);
            print!("{}", comparison.to_unified());
            println!();
            println!(
                "{} added, {} removed, {} unchanged",
                comparison.added, comparison.removed, comparison.unchanged
            );
        }
        Ok(())
    })
}

fn accept_source(output: &Output, key: &TranslationKey, expect: Option<&str>) -> Result<()> {
    let translation = mutate(|ws, repo| {
        let expected = expected_version(expect, repo.translation_record(key)?.version());
        let translators = ws.translators()?;
        Ok(repo
            .accept_source(key, expected, &translators, &ws.author())?
            .clone())
    })?;

    print_translation(
        output,
        &format!(
            "Accepted source for {} ({} {})",
            translation.key(),
            translation.doc.status,
            translation.doc.version
        ),
        &translation,
    );
    Ok(())
}

fn keep_local(output: &Output, key: &TranslationKey, expect: Option<&str>) -> Result<()> {
    let translation = mutate(|ws, repo| {
        let expected = expected_version(expect, repo.translation_record(key)?.version());
        Ok(repo.keep_local(key, expected, &ws.author())?.clone())
    })?;

    print_translation(output, &format!("Kept local content for {}", translation.key()), &translation);
    Ok(())
}
