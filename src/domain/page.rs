//! Page domain model
//!
//! A [`Page`] is the Global master of a piece of content. Its editable
//! fields live in a [`Document`], which translations share, so the
//! draft/publish lifecycle and sanitization apply to both the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{PageId, Slug};
use super::version::VersionTag;

/// Publication status of a page or translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

impl PageStatus {
    pub fn is_published(&self) -> bool {
        matches!(self, PageStatus::Published)
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, PageStatus::Draft)
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageStatus::Draft => write!(f, "draft"),
            PageStatus::Published => write!(f, "published"),
        }
    }
}

impl std::str::FromStr for PageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(PageStatus::Draft),
            "published" | "publish" | "live" => Ok(PageStatus::Published),
            _ => Err(format!("Unknown page status: {}", s)),
        }
    }
}

/// Where an attached resource is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Head,
    Body,
}

/// Kind of attached resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Stylesheet,
    Script,
}

impl ResourceKind {
    /// Infers the kind from a file extension (`.css` or `.js`/`.mjs`)
    pub fn infer(href: &str) -> Option<Self> {
        let path = href.split(['?', '#']).next().unwrap_or(href).to_ascii_lowercase();
        if path.ends_with(".css") {
            Some(ResourceKind::Stylesheet)
        } else if path.ends_with(".js") || path.ends_with(".mjs") {
            Some(ResourceKind::Script)
        } else {
            None
        }
    }
}

/// A stylesheet or script reference attached outside the HTML body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    pub href: String,
    pub kind: ResourceKind,
}

impl Resource {
    pub fn new(href: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            href: href.into(),
            kind,
        }
    }

    /// Creates a resource whose kind is inferred from its extension
    pub fn from_href(href: impl Into<String>) -> Option<Self> {
        let href = href.into();
        ResourceKind::infer(&href).map(|kind| Self { href, kind })
    }
}

/// Ordered resources, partitioned by placement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub head: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<Resource>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a resource; returns false if the href is already attached
    pub fn attach(&mut self, resource: Resource, placement: Placement) -> bool {
        if self.contains(&resource.href) {
            return false;
        }
        self.list_mut(placement).push(resource);
        true
    }

    /// Detaches a resource by href from either placement
    pub fn detach(&mut self, href: &str) -> bool {
        let before = self.head.len() + self.body.len();
        self.head.retain(|r| r.href != href);
        self.body.retain(|r| r.href != href);
        self.head.len() + self.body.len() != before
    }

    pub fn contains(&self, href: &str) -> bool {
        self.iter().any(|(r, _)| r.href == href)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.body.is_empty()
    }

    pub fn len(&self) -> usize {
        self.head.len() + self.body.len()
    }

    /// Iterates head resources first, then body resources
    pub fn iter(&self) -> impl Iterator<Item = (&Resource, Placement)> {
        self.head
            .iter()
            .map(|r| (r, Placement::Head))
            .chain(self.body.iter().map(|r| (r, Placement::Body)))
    }

    fn list_mut(&mut self, placement: Placement) -> &mut Vec<Resource> {
        match placement {
            Placement::Head => &mut self.head,
            Placement::Body => &mut self.body,
        }
    }
}

/// Search-engine settings for a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,

    /// JSON-LD structured data, stored as parsed JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<serde_json::Value>,
}

impl SeoSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Editable fields shared by pages and translations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Human-readable title
    pub title: String,

    /// URL path, unique within its scope
    pub slug: Slug,

    pub status: PageStatus,

    pub version: VersionTag,

    /// Sanitized HTML body
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Resources::is_empty")]
    pub resources: Resources,

    #[serde(default, skip_serializing_if = "SeoSettings::is_empty")]
    pub seo: SeoSettings,

    /// Who last modified the document
    pub author: String,

    pub created_at: DateTime<Utc>,

    pub last_modified: DateTime<Utc>,
}

impl Document {
    /// Creates a new draft at the initial version
    pub fn new(
        title: impl Into<String>,
        slug: Slug,
        content: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            slug,
            status: PageStatus::Draft,
            version: VersionTag::INITIAL,
            content: content.into(),
            resources: Resources::new(),
            seo: SeoSettings::default(),
            author: author.into(),
            created_at: now,
            last_modified: now,
        }
    }

    /// Records a modification by `author`
    pub fn touch(&mut self, author: &str) {
        self.author = author.to_string();
        self.last_modified = Utc::now();
    }
}

/// A Global page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Unique identifier
    pub id: PageId,

    #[serde(flatten)]
    pub doc: Document,

    /// When false, no locale may create a translation of this page
    #[serde(default = "default_true")]
    pub allow_local_translation: bool,
}

fn default_true() -> bool {
    true
}

impl Page {
    pub fn new(id: PageId, doc: Document) -> Self {
        Self {
            id,
            doc,
            allow_local_translation: true,
        }
    }
}
