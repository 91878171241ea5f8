//! Global page CLI commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::common::{expected_version, inspect, mutate, ContentArgs, EditArgs};
use super::output::Output;
use crate::domain::{Document, PageId, PageStatus, Placement, RecordKey, Slug, VersionTag};
use crate::repository::{Outcome, PageQuery, PropagationReport, PublishReport, TranslationQuery};

#[derive(Subcommand)]
pub enum PageCommands {
    /// Create a Global page as a draft
    ///
    /// Examples:
    ///   pagesync page new "Company History" --slug /about/history
    ///   pagesync page new "Careers" --slug /careers --content-file careers.html
    New {
        /// Page title
        title: String,

        /// URL path, unique among Global pages
        #[arg(long)]
        slug: String,

        #[command(flatten)]
        body: ContentArgs,

        /// Forbid translations of this page
        #[arg(long)]
        no_local_translation: bool,
    },

    /// List Global pages
    List {
        /// Filter by status (draft, published)
        #[arg(long)]
        status: Option<String>,

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

    /// Show a page with its translations
    Show {
        /// Page ID
        id: String,
    },

    /// Edit a page (a published page gets a new draft version)
    Edit {
        /// Page ID
        id: String,

        /// Version you are editing; fails if the page moved on
        #[arg(long)]
        expect: Option<String>,

        #[command(flatten)]
        edit: EditArgs,

        /// Allow or forbid translations (true/false)
        #[arg(long)]
        allow_local_translation: Option<bool>,
    },

    /// Publish the current draft and sync translations
    Publish {
        /// Page ID
        id: String,

        /// Version you are publishing
        #[arg(long)]
        expect: Option<String>,
    },

    /// Push the latest published version to translations again
    Propagate {
        /// Page ID
        id: String,
    },

    /// List every revision of a page
    History {
        /// Page ID
        id: String,
    },

    /// Copy an earlier revision into a new draft
    Revert {
        /// Page ID
        id: String,

        /// Revision to restore (e.g., v2)
        #[arg(value_name = "VERSION")]
        revision: String,

        /// Version you are editing
        #[arg(long)]
        expect: Option<String>,
    },

    /// Move a page to the recycle bin
    Delete {
        /// Page ID
        id: String,
    },
}

pub fn run(cmd: PageCommands, output: &Output) -> Result<()> {
    match cmd {
        PageCommands::New {
            title,
            slug,
            body,
            no_local_translation,
        } => new_page(output, &title, &slug, body, no_local_translation),
        PageCommands::List {
            status,
            search,
            sort,
            order,
        } => list_pages(output, status.as_deref(), search, &sort, &order),
        PageCommands::Show { id } => show_page(output, &id),
        PageCommands::Edit {
            id,
            expect,
            edit,
            allow_local_translation,
        } => edit_page(output, &id, expect.as_deref(), edit, allow_local_translation),
        PageCommands::Publish { id, expect } => publish_page(output, &id, expect.as_deref()),
        PageCommands::Propagate { id } => propagate_page(output, &id),
        PageCommands::History { id } => history(output, &RecordKey::Page(id.parse()?)),
        PageCommands::Revert {
            id,
            revision,
            expect,
        } => revert(output, &RecordKey::Page(id.parse()?), &revision, expect.as_deref()),
        PageCommands::Delete { id } => delete(output, &RecordKey::Page(id.parse()?)),
    }
}

fn new_page(
    output: &Output,
    title: &str,
    slug: &str,
    body: ContentArgs,
    no_local_translation: bool,
) -> Result<()> {
    let slug: Slug = slug.parse()?;
    let content = body.read()?.unwrap_or_default();

    let page = mutate(|ws, repo| {
        let id = repo.create_page(title, slug, &content, &ws.author())?.id.clone();
        if no_local_translation {
            repo.set_allow_local_translation(&id, false)?;
        }
        Ok(repo.page(&id)?.clone())
    })?;

    if output.is_json() {
        output.data(&page);
    } else {
        output.success(&format!(
            "Created page {}: {} ({}, {})",
            page.id, page.doc.title, page.doc.slug, page.doc.version
        ));
    }

    Ok(())
}

fn list_pages(
    output: &Output,
    status: Option<&str>,
    search: Option<String>,
    sort: &str,
    order: &str,
) -> Result<()> {
    let query = PageQuery {
        status: status.map(str::parse::<PageStatus>).transpose().map_err(anyhow::Error::msg)?,
        search,
        sort: sort.parse().map_err(anyhow::Error::msg)?,
        order: order.parse().map_err(anyhow::Error::msg)?,
    };

    inspect(|_, repo| {
        let pages = repo.list_pages(&query);

        if output.is_json() {
            output.data(&pages);
        } else if pages.is_empty() {
            println!("No pages found");
        } else {
            println!(
                "{:<11} {:<10} {:<5} {:<28} {:<8} TITLE",
                "ID", "STATUS", "VER", "SLUG", "REGIONS"
            );
            println!("{}", "-".repeat(80));
            for page in &pages {
                let regions = repo.locales_of(&page.id);
                println!(
                    "{:<11} {:<10} {:<5} {:<28} {:<8} {}",
                    page.id,
                    page.doc.status,
                    page.doc.version,
                    page.doc.slug,
                    regions.len(),
                    page.doc.title
                );
            }
        }
        Ok(())
    })
}

fn show_page(output: &Output, id: &str) -> Result<()> {
    let id: PageId = id.parse()?;

    inspect(|_, repo| {
        let record = repo.page_record(&id)?;
        let regions = repo.list_translations(&TranslationQuery {
            page: Some(id.clone()),
            ..Default::default()
        });

        if output.is_json() {
            output.data(&serde_json::json!({
                "page": &record.head,
                "published_version": record.latest_published().map(|p| p.doc.version),
                "regions": regions,
            }));
            return Ok(());
        }

        let page = &record.head;
        println!("{} ({})", page.doc.title, page.id);
        print_document(&page.doc);
        if let Some(live) = record.latest_published() {
            if live.doc.version != page.doc.version {
                println!("  Live:      {}", live.doc.version);
            }
        }
        println!(
            "  Local translation: {}",
            if page.allow_local_translation { "allowed" } else { "forbidden" }
        );

        if !regions.is_empty() {
            println!();
            println!("Regions:");
            for view in &regions {
                let t = view.translation;
                println!(
                    "  {:<6} {:<11} {:<10} {:<5} {}",
                    t.locale, view.sync_status, t.doc.status, t.doc.version, t.doc.slug
                );
            }
        }

        if !page.doc.content.is_empty() {
            println!();
            println!("{}", page.doc.content);
        }
        Ok(())
    })
}

/// Prints the fields every page and translation has
pub(super) fn print_document(doc: &Document) {
    println!("  Status:    {} {}", doc.status, doc.version);
    println!("  Slug:      {}", doc.slug);
    println!("  Author:    {}", doc.author);
    println!("  Modified:  {}", doc.last_modified.format("%Y-%m-%d %H:%M"));

    for (resource, placement) in doc.resources.iter() {
        let placement = match placement {
            Placement::Head => "head",
            Placement::Body => "body",
        };
        println!("  Resource:  {} {}", placement, resource.href);
    }

    let seo = &doc.seo;
    if let Some(title) = &seo.meta_title {
        println!("  Meta title: {}", title);
    }
    if let Some(description) = &seo.meta_description {
        println!("  Meta description: {}", description);
    }
    if !seo.keywords.is_empty() {
        println!("  Keywords:  {}", seo.keywords.join(", "));
    }
    if let Some(url) = &seo.canonical_url {
        println!("  Canonical: {}", url);
    }
    if seo.structured_data.is_some() {
        println!("  Structured data: yes");
    }
}

fn edit_page(
    output: &Output,
    id: &str,
    expect: Option<&str>,
    args: EditArgs,
    allow_local_translation: Option<bool>,
) -> Result<()> {
    let id: PageId = id.parse()?;

    let page = mutate(|ws, repo| {
        let record = repo.page_record(&id)?;
        let expected = expected_version(expect, record.version());
        let edit = args.into_edit(&record.head.doc)?;

        if edit.is_empty() && allow_local_translation.is_none() {
            bail!("Nothing to change. Pass --title, --content, --slug or another field.");
        }

        if !edit.is_empty() {
            repo.update_page(&id, expected, &edit, &ws.author())?;
        } else {
            record.check_version(expected)?;
        }
        if let Some(allow) = allow_local_translation {
            repo.set_allow_local_translation(&id, allow)?;
        }
        Ok(repo.page(&id)?.clone())
    })?;

    if output.is_json() {
        output.data(&page);
    } else {
        output.success(&format!("Updated page {} ({} {})", page.id, page.doc.status, page.doc.version));
    }

    Ok(())
}

fn publish_page(output: &Output, id: &str, expect: Option<&str>) -> Result<()> {
    let id: PageId = id.parse()?;

    let report: PublishReport = mutate(|ws, repo| {
        let expected = expected_version(expect, repo.page_record(&id)?.version());
        let translators = ws.translators()?;
        Ok(repo.publish_page(&id, expected, &translators, &ws.author())?)
    })?;

    if output.is_json() {
        output.data(&report);
        return Ok(());
    }

    if report.published {
        output.success(&format!("Published page {} {}", report.page_id, report.version));
    } else {
        output.success(&format!("Page {} {} was already published", report.page_id, report.version));
    }
    print_propagation(&report.propagation);

    Ok(())
}

fn propagate_page(output: &Output, id: &str) -> Result<()> {
    let id: PageId = id.parse()?;

    let report = mutate(|ws, repo| {
        let translators = ws.translators()?;
        Ok(repo.propagate(&id, &translators, &ws.author())?)
    })?;

    if output.is_json() {
        output.data(&report);
    } else {
        output.success(&format!("Propagated {} {}", id, report.source_version));
        print_propagation(&report);
    }

    Ok(())
}

fn print_propagation(report: &PropagationReport) {
    for entry in &report.outcomes {
        let line = match &entry.outcome {
            Outcome::Regenerated { republished: true } => "regenerated and republished".to_string(),
            Outcome::Regenerated { republished: false } => "regenerated".to_string(),
            Outcome::MarkedPending => "edited locally, needs review".to_string(),
            Outcome::UpToDate => "up to date".to_string(),
            Outcome::Skipped => continue,
            Outcome::Failed { error } => format!("failed: {}", error),
        };
        println!("  {:<6} {}", entry.locale, line);
    }

    if report.failed() > 0 {
        eprintln!(
            "Warning: {} translation(s) could not be regenerated; run 'pagesync page propagate' to retry",
            report.failed()
        );
    }
}

/// Prints the revisions of a page or translation
pub(super) fn history(output: &Output, key: &RecordKey) -> Result<()> {
    inspect(|_, repo| {
        let docs = repo.history(key)?;

        if output.is_json() {
            output.data(&docs);
            return Ok(());
        }

        println!("History of {}:", key);
        let head = docs.len().saturating_sub(1);
        for (i, doc) in docs.iter().enumerate() {
            println!(
                "{} {:<5} {:<10} {}  {:<16} {}",
                if i == head { "*" } else { " " },
                doc.version,
                doc.status,
                doc.last_modified.format("%Y-%m-%d %H:%M"),
                doc.author,
                doc.title
            );
        }
        Ok(())
    })
}

/// Copies an earlier revision of a page or translation into a draft
pub(super) fn revert(output: &Output, key: &RecordKey, version: &str, expect: Option<&str>) -> Result<()> {
    let version = VersionTag::parse_lenient(version);

    let head = mutate(|ws, repo| {
        let current = match key {
            RecordKey::Page(id) => repo.page_record(id)?.version(),
            RecordKey::Translation(tkey) => repo.translation_record(tkey)?.version(),
        };
        let expected = expected_version(expect, current);
        Ok(repo.revert(key, version, expected, &ws.author())?)
    })?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "key": key,
            "restored": version,
            "version": head,
        }));
    } else {
        output.success(&format!("Restored {} of {} as draft {}", version, key, head));
    }

    Ok(())
}

/// Moves a page or translation to the recycle bin
pub(super) fn delete(output: &Output, key: &RecordKey) -> Result<()> {
    let id = mutate(|ws, repo| Ok(repo.soft_delete(key, &ws.author())?))?;

    if output.is_json() {
        output.data(&serde_json::json!({ "deleted": key, "bin_id": id }));
    } else {
        output.success(&format!("Moved {} to the recycle bin as {}", key, id));
    }

    Ok(())
}

