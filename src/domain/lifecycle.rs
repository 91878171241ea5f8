//! Draft/publish lifecycle with append-only history
//!
//! State machine: `Draft --publish--> Published --begin_edit--> Draft(v+1)`.
//!
//! Editing a Published head never mutates it: the Published snapshot is
//! appended to history and a Draft with the next version becomes the head.
//! Editing a Draft continues on the same version. History is never rewritten.

use serde::{Deserialize, Serialize};

use super::id::RecordKey;
use super::page::{Document, Page, PageStatus};
use super::sanitize;
use super::translation::Translation;
use super::version::VersionTag;
use crate::error::{CmsError, CmsResult};

/// A record that goes through the draft/publish lifecycle
pub trait Revisioned: Clone {
    fn record_key(&self) -> RecordKey;
    fn doc(&self) -> &Document;
    fn doc_mut(&mut self) -> &mut Document;
}

impl Revisioned for Page {
    fn record_key(&self) -> RecordKey {
        RecordKey::Page(self.id.clone())
    }

    fn doc(&self) -> &Document {
        &self.doc
    }

    fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }
}

impl Revisioned for Translation {
    fn record_key(&self) -> RecordKey {
        RecordKey::Translation(self.key())
    }

    fn doc(&self) -> &Document {
        &self.doc
    }

    fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }
}

/// Returns the draft an editor should work on
///
/// A Published item yields a clone with status Draft and the next version;
/// a Draft item is returned as-is. Fails with
/// [`CmsError::VersionExhausted`] if no next version exists.
pub fn begin_edit<T: Revisioned>(item: &T) -> CmsResult<T> {
    let mut draft = item.clone();
    if item.doc().status.is_published() {
        let next = item
            .doc()
            .version
            .next()
            .ok_or_else(|| CmsError::VersionExhausted(item.record_key()))?;
        let doc = draft.doc_mut();
        doc.status = PageStatus::Draft;
        doc.version = next;
    }
    Ok(draft)
}

/// Checks that a document may be saved or published
pub fn validate(doc: &Document) -> CmsResult<()> {
    let violations = sanitize::check(&doc.content);
    if !violations.is_empty() {
        return Err(CmsError::ForbiddenContent(violations));
    }
    Ok(())
}

/// Returns the published form of a draft
///
/// Fails with [`CmsError::ForbiddenContent`] if the body does not pass
/// sanitization; the input is left untouched either way.
pub fn publish<T: Revisioned>(draft: &T) -> CmsResult<T> {
    validate(draft.doc())?;
    let mut published = draft.clone();
    published.doc_mut().status = PageStatus::Published;
    Ok(published)
}

/// A record head plus its prior revisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub head: T,

    /// Prior revisions, oldest first
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<T>,
}

impl<T: Revisioned> Versioned<T> {
    pub fn new(head: T) -> Self {
        Self {
            head,
            history: Vec::new(),
        }
    }

    pub fn version(&self) -> VersionTag {
        self.head.doc().version
    }

    pub fn status(&self) -> PageStatus {
        self.head.doc().status
    }

    /// Rejects with [`CmsError::Conflict`] if the head moved past `expected`
    pub fn check_version(&self, expected: VersionTag) -> CmsResult<()> {
        let actual = self.version();
        if actual != expected {
            return Err(CmsError::Conflict {
                key: self.head.record_key(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Moves the head into draft state; returns true if a new version was cut
    pub fn begin_edit(&mut self) -> CmsResult<bool> {
        if self.head.doc().status.is_draft() {
            return Ok(false);
        }
        let draft = begin_edit(&self.head)?;
        self.replace_head(draft);
        Ok(true)
    }

    /// Installs a new head; a Published head moves to history first
    pub fn replace_head(&mut self, head: T) {
        let previous = std::mem::replace(&mut self.head, head);
        if previous.doc().status.is_published() {
            self.history.push(previous);
        }
    }

    /// Publishes the head; returns false if it was already Published
    pub fn publish(&mut self) -> CmsResult<bool> {
        if self.head.doc().status.is_published() {
            return Ok(false);
        }
        self.head = publish(&self.head)?;
        Ok(true)
    }

    /// The newest Published revision, head included
    pub fn latest_published(&self) -> Option<&T> {
        if self.head.doc().status.is_published() {
            return Some(&self.head);
        }
        self.history
            .iter()
            .rev()
            .find(|rev| rev.doc().status.is_published())
    }

    /// Version that dependants compare against: the latest published
    /// version, or the head version if nothing was ever published
    pub fn effective_version(&self) -> VersionTag {
        self.latest_published()
            .map(|rev| rev.doc().version)
            .unwrap_or_else(|| self.version())
    }

    /// All revisions oldest first, head last
    pub fn revisions(&self) -> impl Iterator<Item = &T> {
        self.history.iter().chain(std::iter::once(&self.head))
    }

    /// Finds a revision by version
    pub fn revision(&self, version: VersionTag) -> Option<&T> {
        self.revisions().find(|rev| rev.doc().version == version)
    }
}
