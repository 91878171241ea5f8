//! Recycle bin for soft-deleted records
//!
//! The bin owns deleted records by value, head and history together, so a
//! record is either active in the repository or in the bin, never both.
//! Each deletion is its own entry with a [`DeletionId`]: deleting a
//! translation, adding the region again and deleting it again leaves two
//! entries. Restoring goes through [`super::ContentRepository::restore`],
//! which re-checks slug and key uniqueness.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DeletionId, Document, IdError, Locale, Page, RecordKey, Translation, Versioned};
use crate::error::{CmsError, CmsResult};

/// The record that was deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeletedRecord {
    Page(Versioned<Page>),
    Translation(Versioned<Translation>),
}

impl DeletedRecord {
    pub fn key(&self) -> RecordKey {
        match self {
            DeletedRecord::Page(rec) => RecordKey::Page(rec.head.id.clone()),
            DeletedRecord::Translation(rec) => RecordKey::Translation(rec.head.key()),
        }
    }
}

/// A record in the bin plus deletion metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedItem {
    pub id: DeletionId,
    pub record: DeletedRecord,
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: String,
}

impl DeletedItem {
    pub fn new(record: DeletedRecord, deleted_by: impl Into<String>) -> Self {
        let deleted_at = Utc::now();
        Self {
            id: DeletionId::new(&record.key(), deleted_at, 0),
            record,
            deleted_at,
            deleted_by: deleted_by.into(),
        }
    }

    pub fn key(&self) -> RecordKey {
        self.record.key()
    }

    /// Head document at the time of deletion
    pub fn doc(&self) -> &Document {
        match &self.record {
            DeletedRecord::Page(rec) => &rec.head.doc,
            DeletedRecord::Translation(rec) => &rec.head.doc,
        }
    }

    /// Locale of a deleted translation, `None` for Global pages
    pub fn locale(&self) -> Option<&Locale> {
        match &self.record {
            DeletedRecord::Page(_) => None,
            DeletedRecord::Translation(rec) => Some(&rec.head.locale),
        }
    }
}

/// Which bin entry a restore or purge acts on
///
/// Parses `d-…` as an exact entry and anything else as a record key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinTarget {
    Entry(DeletionId),
    /// The most recently deleted entry holding this record
    Record(RecordKey),
}

impl fmt::Display for BinTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinTarget::Entry(id) => id.fmt(f),
            BinTarget::Record(key) => key.fmt(f),
        }
    }
}

impl FromStr for BinTarget {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().starts_with("d-") {
            Ok(BinTarget::Entry(s.parse()?))
        } else {
            Ok(BinTarget::Record(s.parse()?))
        }
    }
}

impl From<DeletionId> for BinTarget {
    fn from(id: DeletionId) -> Self {
        BinTarget::Entry(id)
    }
}

impl From<&DeletionId> for BinTarget {
    fn from(id: &DeletionId) -> Self {
        BinTarget::Entry(id.clone())
    }
}

impl From<RecordKey> for BinTarget {
    fn from(key: RecordKey) -> Self {
        BinTarget::Record(key)
    }
}

impl From<&RecordKey> for BinTarget {
    fn from(key: &RecordKey) -> Self {
        BinTarget::Record(key.clone())
    }
}

/// Filter for listing the bin
#[derive(Debug, Clone, Default)]
pub struct BinQuery {
    /// `Some(None)` keeps only Global pages, `Some(Some(locale))` one locale
    pub origin: Option<Option<Locale>>,

    /// Case-insensitive match on title or slug
    pub search: Option<String>,
}

impl BinQuery {
    fn matches(&self, item: &DeletedItem) -> bool {
        if let Some(origin) = &self.origin {
            if item.locale() != origin.as_ref() {
                return false;
            }
        }

        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                let doc = item.doc();
                doc.title.to_lowercase().contains(&needle)
                    || doc.slug.as_str().to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

fn newest_first(a: &DeletedItem, b: &DeletedItem) -> std::cmp::Ordering {
    b.deleted_at.cmp(&a.deleted_at).then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Default, Clone)]
pub struct RecycleBin {
    items: BTreeMap<DeletionId, DeletedItem>,
}

impl RecycleBin {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_items(items: impl IntoIterator<Item = DeletedItem>) -> Self {
        let mut bin = Self::new();
        for item in items {
            bin.insert(item);
        }
        bin
    }

    /// Adds an entry, re-deriving its ID if another entry holds it
    pub(crate) fn insert(&mut self, mut item: DeletedItem) -> DeletionId {
        let key = item.key();
        let mut salt = 0;
        while self.items.contains_key(&item.id) {
            salt += 1;
            item.id = DeletionId::new(&key, item.deleted_at, salt);
        }

        let id = item.id.clone();
        self.items.insert(id.clone(), item);
        id
    }

    pub(crate) fn take(&mut self, id: &DeletionId) -> Option<DeletedItem> {
        self.items.remove(id)
    }

    /// Finds the entry a target points at
    pub fn resolve(&self, target: &BinTarget) -> CmsResult<&DeletedItem> {
        match target {
            BinTarget::Entry(id) => self
                .items
                .get(id)
                .ok_or_else(|| CmsError::NotInBin(id.clone())),
            BinTarget::Record(key) => self.get(key).ok_or_else(|| CmsError::NotFound(key.clone())),
        }
    }

    /// Most recently deleted entry for a record key
    pub fn get(&self, key: &RecordKey) -> Option<&DeletedItem> {
        self.items
            .values()
            .filter(|item| &item.key() == key)
            .min_by(|a, b| newest_first(a, b))
    }

    pub fn entry(&self, id: &DeletionId) -> Option<&DeletedItem> {
        self.items.get(id)
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.items.values().any(|item| &item.key() == key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All entries, deletion ID order
    pub fn items(&self) -> impl Iterator<Item = &DeletedItem> {
        self.items.values()
    }

    /// Entries matching the query, most recently deleted first
    pub fn list(&self, query: &BinQuery) -> Vec<&DeletedItem> {
        let mut items: Vec<_> = self.items.values().filter(|item| query.matches(item)).collect();
        items.sort_by(|a, b| newest_first(a, b));
        items
    }

    /// Permanently removes one entry
    pub fn purge(&mut self, target: impl Into<BinTarget>) -> CmsResult<DeletedItem> {
        let target: BinTarget = target.into();
        let id = self.resolve(&target)?.id.clone();
        let item = self
            .items
            .remove(&id)
            .ok_or_else(|| CmsError::NotInBin(id.clone()))?;
        tracing::info!(%id, key = %item.key(), "Purged from recycle bin");
        Ok(item)
    }

    /// Permanently removes everything; returns the number of entries purged
    pub fn purge_all(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        tracing::info!(count, "Emptied recycle bin");
        count
    }

    /// Purges entries deleted before `cutoff`; returns them
    pub fn purge_older_than(&mut self, cutoff: DateTime<Utc>) -> Vec<DeletedItem> {
        let expired: Vec<DeletionId> = self
            .items
            .values()
            .filter(|item| item.deleted_at < cutoff)
            .map(|item| item.id.clone())
            .collect();

        let purged: Vec<DeletedItem> = expired.iter().filter_map(|id| self.items.remove(id)).collect();

        if !purged.is_empty() {
            tracing::info!(count = purged.len(), %cutoff, "Purged expired recycle bin items");
        }
        purged
    }
}
