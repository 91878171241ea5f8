//! pagesync - Global pages, regional translations and the sync between them
//!
//! A Global page is the master copy of a piece of content. Translations
//! derive from it per locale and stay in sync until someone edits them
//! locally; from then on publishing the Global page only flags them for
//! review. Every page and translation is versioned through a draft/publish
//! lifecycle, and deleted records go to a recycle bin until purged.

pub mod domain;
pub mod error;
pub mod translator;
pub mod repository;
pub mod storage;
pub mod cli;

pub use domain::{
    Document, GenerationMethod, Locale, Page, PageId, PageStatus, RecordKey, Slug, SyncStatus,
    Translation, TranslationKey, VersionTag,
};
pub use error::{CmsError, CmsResult};
pub use repository::{ContentRepository, Edit};
