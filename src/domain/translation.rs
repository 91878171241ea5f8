//! Translation (Local page) domain model
//!
//! A translation is a page published under a locale. It either derives
//! from a Global page (`source_page_id` set) or originates locally.
//! Its sync status is never stored: see [`super::sync::compute_sync_status`].

use serde::{Deserialize, Serialize};

use super::id::{Locale, PageId, TranslationKey};
use super::page::Document;
use super::version::VersionTag;

/// How a translation's content came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Machine-translated from the Global source
    Translated,
    /// Copied verbatim from the Global source
    Copied,
    /// Written locally, no Global source
    LocalOriginal,
}

impl Origin {
    /// The generation method that recreates this translation, if any
    pub fn method(&self) -> Option<GenerationMethod> {
        match self {
            Origin::Translated => Some(GenerationMethod::Ai),
            Origin::Copied => Some(GenerationMethod::Copy),
            Origin::LocalOriginal => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Origin::Translated => "translated",
            Origin::Copied => "copied",
            Origin::LocalOriginal => "local",
        }
    }
}

impl From<GenerationMethod> for Origin {
    fn from(method: GenerationMethod) -> Self {
        match method {
            GenerationMethod::Ai => Origin::Translated,
            GenerationMethod::Copy => Origin::Copied,
        }
    }
}

/// Method used to produce translation content from a Global page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    /// Machine translation
    #[default]
    Ai,
    /// Verbatim copy
    Copy,
}

impl std::fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMethod::Ai => write!(f, "ai"),
            GenerationMethod::Copy => write!(f, "copy"),
        }
    }
}

impl std::str::FromStr for GenerationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ai" | "translate" | "translated" => Ok(GenerationMethod::Ai),
            "copy" | "copied" => Ok(GenerationMethod::Copy),
            _ => Err(format!("Unknown generation method: {}", s)),
        }
    }
}

/// Derived relationship between a translation and its Global source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Mirrors the current published source version
    Synced,
    /// Derived from a source but edited locally or behind the source
    Overridden,
    /// No Global source
    Local,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Synced => write!(f, "synced"),
            SyncStatus::Overridden => write!(f, "overridden"),
            SyncStatus::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "synced" => Ok(SyncStatus::Synced),
            "overridden" => Ok(SyncStatus::Overridden),
            "local" => Ok(SyncStatus::Local),
            _ => Err(format!("Unknown sync status: {}", s)),
        }
    }
}

/// Snapshot of the source at the last successful sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBaseline {
    /// Source version the content was generated from
    pub source_version: VersionTag,

    /// blake3 digest of the generated content
    pub content_digest: String,
}

/// A Local page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Page ID: the source's ID for derived translations, fresh for local originals
    pub page_id: PageId,

    pub locale: Locale,

    /// The Global page this derives from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_page_id: Option<PageId>,

    pub origin: Origin,

    #[serde(flatten)]
    pub doc: Document,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<SyncBaseline>,

    /// Set when a newer source version was published while this
    /// translation was Overridden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_source: Option<VersionTag>,

    /// Source version the editor chose to keep local content against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_source: Option<VersionTag>,
}

impl Translation {
    /// Creates a translation derived from a Global page
    pub fn derived(
        source: PageId,
        locale: Locale,
        method: GenerationMethod,
        doc: Document,
        baseline: SyncBaseline,
    ) -> Self {
        Self {
            page_id: source.clone(),
            locale,
            source_page_id: Some(source),
            origin: method.into(),
            doc,
            baseline: Some(baseline),
            pending_source: None,
            dismissed_source: None,
        }
    }

    /// Creates a locally originated translation
    pub fn local(page_id: PageId, locale: Locale, doc: Document) -> Self {
        Self {
            page_id,
            locale,
            source_page_id: None,
            origin: Origin::LocalOriginal,
            doc,
            baseline: None,
            pending_source: None,
            dismissed_source: None,
        }
    }

    pub fn key(&self) -> TranslationKey {
        TranslationKey::new(self.page_id.clone(), self.locale.clone())
    }

    /// Returns true if this translation derives from a Global page
    pub fn is_derived(&self) -> bool {
        self.source_page_id.is_some()
    }

    /// Returns true if a newer source version awaits manual reconciliation
    pub fn has_pending_source(&self) -> bool {
        self.pending_source.is_some()
    }
}
