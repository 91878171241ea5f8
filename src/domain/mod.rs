//! Domain models for pagesync
//!
//! Contains the content model and its business rules without any I/O concerns.

mod id;
mod version;
mod page;
mod translation;
pub mod sanitize;
pub mod lifecycle;
pub mod sync;
pub mod compare;

pub use id::{DeletionId, IdError, Locale, PageId, RecordKey, Slug, SlugScope, TranslationKey};
pub use version::{increment, VersionTag};
pub use page::{Document, Page, PageStatus, Placement, Resource, ResourceKind, Resources, SeoSettings};
pub use translation::{GenerationMethod, Origin, SyncBaseline, SyncStatus, Translation};
pub use sanitize::{Violation, ViolationKind};
pub use lifecycle::{Revisioned, Versioned};
pub use sync::{compute_sync_status, SyncAction};
pub use compare::{Comparison, DiffLine, DiffOp};
