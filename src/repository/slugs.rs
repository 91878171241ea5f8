//! Slug uniqueness index
//!
//! Global slugs are unique among Global pages; each locale's slugs are
//! unique within that locale. The repository checks and reserves in the
//! same `&mut` call that writes the record, so no two active records can
//! ever hold the same slug in one scope.

use std::collections::HashMap;

use crate::domain::{RecordKey, Slug, SlugScope};
use crate::error::{CmsError, CmsResult};

#[derive(Debug, Default, Clone)]
pub struct SlugIndex {
    entries: HashMap<(SlugScope, Slug), RecordKey>,
}

impl SlugIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record holding a slug, if any
    pub fn holder(&self, scope: &SlugScope, slug: &Slug) -> Option<&RecordKey> {
        self.entries.get(&(scope.clone(), slug.clone()))
    }

    /// Fails with [`CmsError::DuplicateSlug`] unless the slug is free or
    /// already held by `owner`
    pub fn check(&self, scope: &SlugScope, slug: &Slug, owner: &RecordKey) -> CmsResult<()> {
        match self.holder(scope, slug) {
            Some(holder) if holder != owner => Err(CmsError::DuplicateSlug {
                scope: scope.clone(),
                slug: slug.clone(),
                holder: holder.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Checks and reserves a slug for `owner`
    pub fn reserve(&mut self, scope: SlugScope, slug: Slug, owner: RecordKey) -> CmsResult<()> {
        self.check(&scope, &slug, &owner)?;
        tracing::debug!(%scope, %slug, %owner, "Reserved slug");
        self.entries.insert((scope, slug), owner);
        Ok(())
    }

    /// Releases a slug if `owner` holds it
    pub fn release(&mut self, scope: &SlugScope, slug: &Slug, owner: &RecordKey) -> bool {
        let key = (scope.clone(), slug.clone());
        if self.entries.get(&key) == Some(owner) {
            self.entries.remove(&key);
            tracing::debug!(%scope, %slug, %owner, "Released slug");
            true
        } else {
            false
        }
    }

    /// Moves `owner` from one slug to another in the same scope
    pub fn rename(&mut self, scope: &SlugScope, from: &Slug, to: Slug, owner: &RecordKey) -> CmsResult<()> {
        if from == &to {
            return Ok(());
        }
        self.reserve(scope.clone(), to, owner.clone())?;
        self.release(scope, from, owner);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
