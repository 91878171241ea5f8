//! Content repository
//!
//! [`ContentRepository`] owns every active Global page and translation,
//! the slug index and the recycle bin. All mutations take `&mut self`,
//! so a slug check and the write that depends on it happen in one call.
//!
//! Records are stored as [`Versioned`] heads with their history, keyed by
//! page ID or `(page ID, locale)`.

mod content;
mod query;
mod recycle_bin;
mod regions;
mod slugs;

pub use content::{parse_structured_data, Edit, PublishReport};
pub use query::{PageQuery, SortKey, SortOrder, TranslationQuery, TranslationView};
pub use recycle_bin::{BinQuery, BinTarget, DeletedItem, DeletedRecord, RecycleBin};
pub use regions::{LocaleOutcome, Outcome, PropagationReport};
pub use slugs::SlugIndex;

use std::collections::BTreeMap;

use chrono::{Duration, Utc};

use crate::domain::{
    compute_sync_status, DeletionId, Locale, Page, PageId, RecordKey, Revisioned, SlugScope, SyncStatus,
    Translation, TranslationKey, VersionTag, Versioned,
};
use crate::error::{CmsError, CmsResult};

/// How propagation treats translations that follow their source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Re-publish regenerated translations that were Published
    pub republish: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self { republish: true }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ContentRepository {
    pages: BTreeMap<PageId, Versioned<Page>>,
    translations: BTreeMap<TranslationKey, Versioned<Translation>>,
    slugs: SlugIndex,
    bin: RecycleBin,
    policy: SyncPolicy,
}

impl ContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Rebuilds a repository from persisted records
    ///
    /// The slug index is derived from the records, so a workspace whose
    /// files hold two records with the same slug in one scope is rejected.
    pub fn from_parts(
        pages: impl IntoIterator<Item = Versioned<Page>>,
        translations: impl IntoIterator<Item = Versioned<Translation>>,
        bin: impl IntoIterator<Item = DeletedItem>,
    ) -> CmsResult<Self> {
        let mut repo = Self::new();

        for record in pages {
            let id = record.head.id.clone();
            repo.slugs.reserve(
                SlugScope::Global,
                record.head.doc.slug.clone(),
                RecordKey::Page(id.clone()),
            )?;
            repo.pages.insert(id, record);
        }

        for record in translations {
            let key = record.head.key();
            if repo.translations.contains_key(&key) {
                return Err(CmsError::DuplicateRegion {
                    page: key.page,
                    locale: key.locale,
                });
            }
            repo.slugs.reserve(
                SlugScope::Locale(key.locale.clone()),
                record.head.doc.slug.clone(),
                RecordKey::Translation(key.clone()),
            )?;
            repo.translations.insert(key, record);
        }

        repo.bin = RecycleBin::from_items(bin);
        Ok(repo)
    }

    /// Active Global pages, ID order
    pub fn page_records(&self) -> impl Iterator<Item = &Versioned<Page>> {
        self.pages.values()
    }

    /// Active translations, key order
    pub fn translation_records(&self) -> impl Iterator<Item = &Versioned<Translation>> {
        self.translations.values()
    }

    pub fn bin(&self) -> &RecycleBin {
        &self.bin
    }

    pub fn bin_mut(&mut self) -> &mut RecycleBin {
        &mut self.bin
    }

    pub fn page_record(&self, id: &PageId) -> CmsResult<&Versioned<Page>> {
        self.pages
            .get(id)
            .ok_or_else(|| CmsError::NotFound(RecordKey::Page(id.clone())))
    }

    pub fn page(&self, id: &PageId) -> CmsResult<&Page> {
        self.page_record(id).map(|record| &record.head)
    }

    pub fn translation_record(&self, key: &TranslationKey) -> CmsResult<&Versioned<Translation>> {
        self.translations
            .get(key)
            .ok_or_else(|| CmsError::NotFound(RecordKey::Translation(key.clone())))
    }

    pub fn translation(&self, key: &TranslationKey) -> CmsResult<&Translation> {
        self.translation_record(key).map(|record| &record.head)
    }

    /// Active translations sharing a page ID
    pub fn translations_of<'a>(&'a self, id: &'a PageId) -> impl Iterator<Item = &'a Translation> + 'a {
        self.translations
            .iter()
            .filter(move |(key, _)| &key.page == id)
            .map(|(_, record)| &record.head)
    }

    /// Locales with an active translation of a page
    pub fn locales_of(&self, id: &PageId) -> Vec<Locale> {
        self.translations_of(id).map(|t| t.locale.clone()).collect()
    }

    /// Version a derived translation is compared against, `None` when
    /// the translation has no active source
    pub fn source_version(&self, translation: &Translation) -> Option<VersionTag> {
        translation
            .source_page_id
            .as_ref()
            .and_then(|id| self.pages.get(id))
            .map(|record| record.effective_version())
    }

    pub fn sync_status(&self, key: &TranslationKey) -> CmsResult<SyncStatus> {
        let translation = self.translation(key)?;
        Ok(compute_sync_status(translation, self.source_version(translation)))
    }

    /// Moves an active record, head and history, into the recycle bin
    ///
    /// Deleting a Global page leaves its translations active; they report
    /// Overridden until the page is restored.
    pub fn soft_delete(&mut self, key: &RecordKey, author: &str) -> CmsResult<DeletionId> {
        let record = match key {
            RecordKey::Page(id) => {
                let record = self
                    .pages
                    .remove(id)
                    .ok_or_else(|| CmsError::NotFound(key.clone()))?;
                self.slugs.release(&SlugScope::Global, &record.head.doc.slug, key);
                DeletedRecord::Page(record)
            }
            RecordKey::Translation(tkey) => {
                let record = self
                    .translations
                    .remove(tkey)
                    .ok_or_else(|| CmsError::NotFound(key.clone()))?;
                self.slugs.release(
                    &SlugScope::Locale(tkey.locale.clone()),
                    &record.head.doc.slug,
                    key,
                );
                DeletedRecord::Translation(record)
            }
        };

        let id = self.bin.insert(DeletedItem::new(record, author));
        tracing::info!(%key, %id, author, "Moved to recycle bin");
        Ok(id)
    }

    /// Moves a bin entry back into the repository unchanged
    ///
    /// The entry stays in the bin if its slug or translation key is taken.
    /// Returns the key of the restored record.
    pub fn restore(&mut self, target: impl Into<BinTarget>) -> CmsResult<RecordKey> {
        let target: BinTarget = target.into();
        let item = self.bin.resolve(&target)?;
        let id = item.id.clone();
        let key = item.key();

        match &item.record {
            DeletedRecord::Page(record) => {
                if self.pages.contains_key(&record.head.id) {
                    return Err(CmsError::InvalidContent(format!(
                        "page {} is already active",
                        record.head.id
                    )));
                }
                self.slugs
                    .check(&SlugScope::Global, &record.head.doc.slug, &key)?;
            }
            DeletedRecord::Translation(record) => {
                let tkey = record.head.key();
                if self.translations.contains_key(&tkey) {
                    return Err(CmsError::DuplicateRegion {
                        page: tkey.page,
                        locale: tkey.locale,
                    });
                }
                self.slugs.check(
                    &SlugScope::Locale(tkey.locale.clone()),
                    &record.head.doc.slug,
                    &key,
                )?;
            }
        }

        let item = self
            .bin
            .take(&id)
            .ok_or_else(|| CmsError::NotInBin(id.clone()))?;

        match item.record {
            DeletedRecord::Page(record) => {
                let page_id = record.head.id.clone();
                self.slugs.reserve(
                    SlugScope::Global,
                    record.head.doc.slug.clone(),
                    key.clone(),
                )?;
                self.pages.insert(page_id, record);
            }
            DeletedRecord::Translation(record) => {
                let tkey = record.head.key();
                self.slugs.reserve(
                    SlugScope::Locale(tkey.locale.clone()),
                    record.head.doc.slug.clone(),
                    key.clone(),
                )?;
                self.translations.insert(tkey, record);
            }
        }

        tracing::info!(%key, %id, "Restored from recycle bin");
        Ok(key)
    }

    /// Purges bin entries older than `days`; returns them
    pub fn purge_expired(&mut self, days: u32) -> Vec<DeletedItem> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        self.bin.purge_older_than(cutoff)
    }

    /// Returns true if a page ID is held by any active or deleted record
    fn id_in_use(&self, id: &PageId) -> bool {
        self.pages.contains_key(id)
            || self.translations.keys().any(|key| &key.page == id)
            || self.bin.items().any(|item| match item.key() {
                RecordKey::Page(page) => &page == id,
                RecordKey::Translation(tkey) => &tkey.page == id,
            })
    }

    /// Generates a page ID no record holds yet
    fn fresh_page_id(&self, title: &str) -> PageId {
        let mut timestamp = Utc::now();
        let mut id = PageId::new(title, timestamp);
        while self.id_in_use(&id) {
            timestamp += Duration::nanoseconds(1);
            id = PageId::new(title, timestamp);
        }
        id
    }

    fn page_mut(&mut self, id: &PageId) -> CmsResult<&mut Versioned<Page>> {
        self.pages
            .get_mut(id)
            .ok_or_else(|| CmsError::NotFound(RecordKey::Page(id.clone())))
    }

    fn translation_mut(&mut self, key: &TranslationKey) -> CmsResult<&mut Versioned<Translation>> {
        self.translations
            .get_mut(key)
            .ok_or_else(|| CmsError::NotFound(RecordKey::Translation(key.clone())))
    }
}

/// Replaces a record's head with a staged draft
///
/// A Published head moves to history first, so history stays append-only.
fn commit<T: Revisioned>(record: &mut Versioned<T>, head: T) {
    record.replace_head(head);
}
