//! Domain error taxonomy
//!
//! Every failure a caller of the content model can see is a [`CmsError`].
//! Storage and CLI layers wrap these in `anyhow` with context.

use thiserror::Error;

use crate::domain::{DeletionId, IdError, Locale, PageId, RecordKey, Slug, SlugScope, VersionTag, Violation};
use crate::translator::TranslateError;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("Slug '{slug}' is already used in {scope} scope by {holder}")]
    DuplicateSlug {
        scope: SlugScope,
        slug: Slug,
        holder: RecordKey,
    },

    #[error("Page {page} already has a {locale} translation")]
    DuplicateRegion { page: PageId, locale: Locale },

    #[error("{key} changed since it was loaded (expected {expected}, found {actual}); reload and retry")]
    Conflict {
        key: RecordKey,
        expected: VersionTag,
        actual: VersionTag,
    },

    #[error("Not found: {0}")]
    NotFound(RecordKey),

    #[error("Not found in the recycle bin: {0}")]
    NotInBin(DeletionId),

    #[error("Content contains forbidden markup: {}", list_violations(.0))]
    ForbiddenContent(Vec<Violation>),

    #[error("Page {0} does not allow local translations")]
    TranslationNotAllowed(PageId),

    #[error("{0} has no Global source")]
    NoSource(RecordKey),

    #[error("{0} has reached the highest version number")]
    VersionExhausted(RecordKey),

    #[error("{key} has no revision {version}")]
    UnknownRevision { key: RecordKey, version: VersionTag },

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error(transparent)]
    InvalidId(#[from] IdError),

    #[error("Translation failed: {0}")]
    Translation(#[from] TranslateError),
}

fn list_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CmsError {
    /// Stable machine-readable code for presentation layers
    pub fn code(&self) -> &'static str {
        match self {
            CmsError::DuplicateSlug { .. } => "duplicate_slug",
            CmsError::DuplicateRegion { .. } => "duplicate_region",
            CmsError::Conflict { .. } => "conflict",
            CmsError::NotFound(_) | CmsError::NotInBin(_) => "not_found",
            CmsError::ForbiddenContent(_) => "forbidden_content",
            CmsError::TranslationNotAllowed(_) => "translation_not_allowed",
            CmsError::NoSource(_) => "no_source",
            CmsError::VersionExhausted(_) => "version_exhausted",
            CmsError::UnknownRevision { .. } => "unknown_revision",
            CmsError::InvalidContent(_) => "invalid_content",
            CmsError::InvalidId(_) => "invalid_id",
            CmsError::Translation(_) => "translation_failed",
        }
    }
}

pub type CmsResult<T> = std::result::Result<T, CmsError>;
