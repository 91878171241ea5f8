//! Listing with filters and sorting

use std::cmp::Ordering;

use serde::Serialize;

use super::ContentRepository;
use crate::domain::{compute_sync_status, Document, Locale, Page, PageId, PageStatus, SyncStatus, Translation};

/// Field to sort listings by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    LastModified,
    Title,
    Status,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "last_modified" | "modified" | "updated" => Ok(SortKey::LastModified),
            "title" => Ok(SortKey::Title),
            "status" => Ok(SortKey::Status),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    pub status: Option<PageStatus>,
    /// Case-insensitive match on title or slug
    pub search: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default)]
pub struct TranslationQuery {
    pub page: Option<PageId>,
    pub locale: Option<Locale>,
    pub status: Option<PageStatus>,
    pub sync_status: Option<SyncStatus>,
    pub search: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
}

/// A translation with its derived sync status
#[derive(Debug, Clone, Serialize)]
pub struct TranslationView<'a> {
    #[serde(flatten)]
    pub translation: &'a Translation,
    pub sync_status: SyncStatus,
}

fn matches_search(doc: &Document, search: Option<&str>) -> bool {
    match search {
        Some(needle) => {
            let needle = needle.to_lowercase();
            doc.title.to_lowercase().contains(&needle) || doc.slug.as_str().to_lowercase().contains(&needle)
        }
        None => true,
    }
}

fn compare_docs(a: &Document, b: &Document, key: SortKey, order: SortOrder) -> Ordering {
    let ordering = match key {
        SortKey::LastModified => a.last_modified.cmp(&b.last_modified),
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Status => a.status.cmp(&b.status),
    };
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

impl ContentRepository {
    pub fn list_pages(&self, query: &PageQuery) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self
            .page_records()
            .map(|record| &record.head)
            .filter(|page| query.status.map_or(true, |s| page.doc.status == s))
            .filter(|page| matches_search(&page.doc, query.search.as_deref()))
            .collect();

        pages.sort_by(|a, b| compare_docs(&a.doc, &b.doc, query.sort, query.order).then_with(|| a.id.cmp(&b.id)));
        pages
    }

    pub fn list_translations(&self, query: &TranslationQuery) -> Vec<TranslationView<'_>> {
        let mut views: Vec<TranslationView<'_>> = self
            .translation_records()
            .map(|record| &record.head)
            .filter(|t| query.page.as_ref().map_or(true, |p| &t.page_id == p))
            .filter(|t| query.locale.as_ref().map_or(true, |l| &t.locale == l))
            .filter(|t| query.status.map_or(true, |s| t.doc.status == s))
            .filter(|t| matches_search(&t.doc, query.search.as_deref()))
            .map(|t| TranslationView {
                translation: t,
                sync_status: compute_sync_status(t, self.source_version(t)),
            })
            .filter(|view| query.sync_status.map_or(true, |s| view.sync_status == s))
            .collect();

        views.sort_by(|a, b| {
            compare_docs(&a.translation.doc, &b.translation.doc, query.sort, query.order)
                .then_with(|| a.translation.page_id.cmp(&b.translation.page_id))
                .then_with(|| a.translation.locale.cmp(&b.translation.locale))
        });
        views
    }
}
