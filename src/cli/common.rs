//! Arguments and workspace plumbing shared by the command groups

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::{Document, Placement, Resource, SeoSettings, Slug, VersionTag};
use crate::repository::{parse_structured_data, ContentRepository, Edit};
use crate::storage::Workspace;

/// Body of a new page, inline or from a file
#[derive(Args, Debug, Default)]
pub struct ContentArgs {
    /// HTML body
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read the HTML body from a file
    #[arg(long, value_name = "PATH")]
    pub content_file: Option<PathBuf>,
}

impl ContentArgs {
    pub fn read(self) -> Result<Option<String>> {
        match (self.content, self.content_file) {
            (Some(content), _) => Ok(Some(content)),
            (None, Some(path)) => fs::read_to_string(&path)
                .map(Some)
                .with_context(|| format!("Failed to read content file: {}", path.display())),
            (None, None) => Ok(None),
        }
    }
}

/// Field changes accepted by `page edit` and `region edit`
#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New slug (URL path)
    #[arg(long)]
    pub slug: Option<String>,

    #[command(flatten)]
    pub body: ContentArgs,

    /// SEO meta title
    #[arg(long)]
    pub meta_title: Option<String>,

    /// SEO meta description
    #[arg(long)]
    pub meta_description: Option<String>,

    /// SEO keywords, comma separated
    #[arg(long, value_delimiter = ',')]
    pub keywords: Option<Vec<String>>,

    /// Absolute canonical URL
    #[arg(long)]
    pub canonical_url: Option<String>,

    /// JSON-LD structured data
    #[arg(long, value_name = "JSON")]
    pub structured_data: Option<String>,

    /// Attach a stylesheet or script to the head (repeatable)
    #[arg(long = "head", value_name = "HREF")]
    pub head: Vec<String>,

    /// Attach a stylesheet or script to the end of the body (repeatable)
    #[arg(long = "body", value_name = "HREF")]
    pub body_resources: Vec<String>,

    /// Detach a resource by href (repeatable)
    #[arg(long, value_name = "HREF")]
    pub detach: Vec<String>,
}

impl EditArgs {
    fn touches_seo(&self) -> bool {
        self.meta_title.is_some()
            || self.meta_description.is_some()
            || self.keywords.is_some()
            || self.canonical_url.is_some()
            || self.structured_data.is_some()
    }

    /// Builds an edit against the document currently being edited
    ///
    /// SEO flags override single fields; the rest of the SEO settings are
    /// kept. An empty flag value clears the field.
    pub fn into_edit(self, current: &Document) -> Result<Edit> {
        let seo = if self.touches_seo() {
            let mut seo: SeoSettings = current.seo.clone();
            if let Some(title) = self.meta_title {
                seo.meta_title = non_empty(title);
            }
            if let Some(description) = self.meta_description {
                seo.meta_description = non_empty(description);
            }
            if let Some(keywords) = self.keywords {
                seo.keywords = keywords
                    .into_iter()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
            }
            if let Some(url) = self.canonical_url {
                seo.canonical_url = non_empty(url);
            }
            if let Some(raw) = self.structured_data {
                seo.structured_data = match non_empty(raw) {
                    Some(raw) => Some(parse_structured_data(&raw)?),
                    None => None,
                };
            }
            Some(seo)
        } else {
            None
        };

        let mut attach = Vec::new();
        for (hrefs, placement) in [(self.head, Placement::Head), (self.body_resources, Placement::Body)] {
            for href in hrefs {
                let resource = Resource::from_href(href.as_str()).ok_or_else(|| {
                    anyhow::anyhow!("Cannot attach '{}': expected a .css or .js file", href)
                })?;
                attach.push((resource, placement));
            }
        }

        let slug = self.slug.map(|s| s.parse::<Slug>()).transpose()?;

        Ok(Edit {
            title: self.title,
            slug,
            content: self.body.read()?,
            seo,
            attach,
            detach: self.detach,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses an optional `--expect` version, defaulting to the current head
pub fn expected_version(expect: Option<&str>, head: VersionTag) -> VersionTag {
    expect.map(VersionTag::parse_lenient).unwrap_or(head)
}

/// Runs `f` against the workspace under its lock and saves the result
///
/// Nothing is written if `f` fails.
pub fn mutate<R>(f: impl FnOnce(&Workspace, &mut ContentRepository) -> Result<R>) -> Result<R> {
    let workspace = Workspace::open_current()?;
    let _lock = workspace.lock()?;
    let mut repo = workspace.load()?;

    let result = f(&workspace, &mut repo)?;
    workspace.save(&repo)?;
    Ok(result)
}

/// Runs `f` against a read-only snapshot of the workspace
pub fn inspect<R>(f: impl FnOnce(&Workspace, &ContentRepository) -> Result<R>) -> Result<R> {
    let workspace = Workspace::open_current()?;
    let repo = workspace.load()?;
    f(&workspace, &repo)
}
