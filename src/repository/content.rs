//! Page and translation editing
//!
//! Every edit is staged on a copy of the head: the lifecycle step, the
//! field changes, sanitization and the slug move all have to succeed
//! before the staged head replaces the stored one. A failed save leaves
//! the stored record exactly as it was.

use serde::Serialize;

use super::regions::PropagationReport;
use super::{commit, ContentRepository};
use crate::domain::{
    lifecycle, Document, Locale, Page, PageId, Placement, RecordKey, Resource, Revisioned,
    SeoSettings, Slug, SlugScope, Translation, TranslationKey, VersionTag, Versioned,
};
use crate::error::{CmsError, CmsResult};
use crate::translator::Translator;

/// A set of field changes for a page or translation
#[derive(Debug, Clone, Default)]
pub struct Edit {
    pub title: Option<String>,
    pub slug: Option<Slug>,
    pub content: Option<String>,
    pub seo: Option<SeoSettings>,

    /// Resources to attach, in order
    pub attach: Vec<(Resource, Placement)>,

    /// Resource hrefs to detach
    pub detach: Vec<String>,
}

impl Edit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn slug(mut self, slug: Slug) -> Self {
        self.slug = Some(slug);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.content.is_none()
            && self.seo.is_none()
            && self.attach.is_empty()
            && self.detach.is_empty()
    }

    fn apply(&self, doc: &mut Document) -> CmsResult<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(CmsError::InvalidContent("title cannot be empty".to_string()));
            }
            doc.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            doc.slug = slug.clone();
        }
        if let Some(content) = &self.content {
            doc.content = content.clone();
        }
        if let Some(seo) = &self.seo {
            validate_seo(seo)?;
            doc.seo = seo.clone();
        }

        for href in &self.detach {
            if !doc.resources.detach(href) {
                return Err(CmsError::InvalidContent(format!(
                    "resource '{}' is not attached",
                    href
                )));
            }
        }
        for (resource, placement) in &self.attach {
            if !doc.resources.attach(resource.clone(), *placement) {
                return Err(CmsError::InvalidContent(format!(
                    "resource '{}' is already attached",
                    resource.href
                )));
            }
        }

        Ok(())
    }
}

fn validate_seo(seo: &SeoSettings) -> CmsResult<()> {
    if let Some(url) = &seo.canonical_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(CmsError::InvalidContent(format!(
                "canonical URL must be absolute http(s): {}",
                url
            )));
        }
    }
    if let Some(data) = &seo.structured_data {
        if !(data.is_object() || data.is_array()) {
            return Err(CmsError::InvalidContent(
                "structured data must be a JSON object or array".to_string(),
            ));
        }
    }
    Ok(())
}

/// Parses JSON-LD structured data
pub fn parse_structured_data(raw: &str) -> CmsResult<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CmsError::InvalidContent(format!("structured data is not valid JSON: {}", e)))?;
    if !(value.is_object() || value.is_array()) {
        return Err(CmsError::InvalidContent(
            "structured data must be a JSON object or array".to_string(),
        ));
    }
    Ok(value)
}

/// Result of publishing a Global page
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub page_id: PageId,
    pub version: VersionTag,

    /// False if the head was already Published
    pub published: bool,

    pub propagation: PropagationReport,
}

/// Copies a draft of `record`'s head, lets `change` modify it and checks
/// the result, without touching the record
fn stage<T: Revisioned>(
    record: &Versioned<T>,
    expected: VersionTag,
    author: &str,
    change: impl FnOnce(&mut T) -> CmsResult<()>,
) -> CmsResult<T> {
    record.check_version(expected)?;
    let mut draft = lifecycle::begin_edit(&record.head)?;
    change(&mut draft)?;
    draft.doc_mut().touch(author);
    lifecycle::validate(draft.doc())?;
    Ok(draft)
}

/// Copies the editable fields of a historical revision
fn restore_fields(doc: &mut Document, from: &Document) {
    doc.title = from.title.clone();
    doc.slug = from.slug.clone();
    doc.content = from.content.clone();
    doc.resources = from.resources.clone();
    doc.seo = from.seo.clone();
}

impl ContentRepository {
    /// Creates a Global page as Draft v1
    pub fn create_page(
        &mut self,
        title: &str,
        slug: Slug,
        content: &str,
        author: &str,
    ) -> CmsResult<&Page> {
        if title.trim().is_empty() {
            return Err(CmsError::InvalidContent("title cannot be empty".to_string()));
        }

        let id = self.fresh_page_id(title);
        let page = Page::new(id.clone(), Document::new(title, slug, content, author));
        lifecycle::validate(&page.doc)?;

        self.slugs.reserve(
            SlugScope::Global,
            page.doc.slug.clone(),
            RecordKey::Page(id.clone()),
        )?;
        tracing::info!(page = %id, slug = %page.doc.slug, author, "Created page");

        let record = self.pages.entry(id).or_insert(Versioned::new(page));
        Ok(&record.head)
    }

    /// Applies an edit to a Global page
    ///
    /// `expected` is the version the editor loaded. A Published head is
    /// kept in history and the edit lands on a new Draft version.
    pub fn update_page(
        &mut self,
        id: &PageId,
        expected: VersionTag,
        edit: &Edit,
        author: &str,
    ) -> CmsResult<&Page> {
        self.apply_page(id, expected, author, |page| edit.apply(&mut page.doc))
    }

    /// Applies an edit to a translation
    ///
    /// Local edits never touch the sync baseline, so editing the content
    /// of a derived translation makes it Overridden.
    pub fn update_translation(
        &mut self,
        key: &TranslationKey,
        expected: VersionTag,
        edit: &Edit,
        author: &str,
    ) -> CmsResult<&Translation> {
        self.apply_translation(key, expected, author, |t| edit.apply(&mut t.doc))
    }

    /// Starts an edit without changing fields
    ///
    /// Returns the draft version the editor should continue from.
    pub fn begin_edit(&mut self, key: &RecordKey, expected: VersionTag, author: &str) -> CmsResult<VersionTag> {
        let version = match key {
            RecordKey::Page(id) => self.apply_page(id, expected, author, |_| Ok(()))?.doc.version,
            RecordKey::Translation(tkey) => {
                self.apply_translation(tkey, expected, author, |_| Ok(()))?.doc.version
            }
        };
        Ok(version)
    }

    /// Copies a historical revision into a new draft
    ///
    /// History is never rewritten: the revision's fields land on the
    /// current draft, or on a fresh one if the head is Published.
    pub fn revert(
        &mut self,
        key: &RecordKey,
        version: VersionTag,
        expected: VersionTag,
        author: &str,
    ) -> CmsResult<VersionTag> {
        let snapshot = self
            .revision_doc(key, version)?
            .ok_or_else(|| CmsError::UnknownRevision {
                key: key.clone(),
                version,
            })?;

        let head = match key {
            RecordKey::Page(id) => {
                self.apply_page(id, expected, author, |page| {
                    restore_fields(&mut page.doc, &snapshot);
                    Ok(())
                })?
                .doc
                .version
            }
            RecordKey::Translation(tkey) => {
                self.apply_translation(tkey, expected, author, |t| {
                    restore_fields(&mut t.doc, &snapshot);
                    Ok(())
                })?
                .doc
                .version
            }
        };

        tracing::info!(%key, from = %version, to = %head, "Reverted to revision");
        Ok(head)
    }

    /// Every revision of a record, oldest first, head last
    pub fn history(&self, key: &RecordKey) -> CmsResult<Vec<&Document>> {
        let docs = match key {
            RecordKey::Page(id) => self
                .page_record(id)?
                .revisions()
                .map(|page| &page.doc)
                .collect(),
            RecordKey::Translation(tkey) => self
                .translation_record(tkey)?
                .revisions()
                .map(|t| &t.doc)
                .collect(),
        };
        Ok(docs)
    }

    /// Publishes a Global page and propagates it to its translations
    ///
    /// Publishing an already Published head changes nothing on the page,
    /// but still runs propagation so translations that failed to
    /// regenerate earlier get another attempt.
    pub fn publish_page(
        &mut self,
        id: &PageId,
        expected: VersionTag,
        translator: &dyn Translator,
        author: &str,
    ) -> CmsResult<PublishReport> {
        let record = self.page_mut(id)?;
        record.check_version(expected)?;

        let published = record.publish()?;
        if published {
            record.head.doc.touch(author);
            tracing::info!(page = %id, version = %record.version(), author, "Published page");
        }
        let version = record.version();

        let propagation = self.propagate(id, translator, author)?;

        Ok(PublishReport {
            page_id: id.clone(),
            version,
            published,
            propagation,
        })
    }

    /// Publishes a translation; returns false if it was already Published
    pub fn publish_translation(
        &mut self,
        key: &TranslationKey,
        expected: VersionTag,
        author: &str,
    ) -> CmsResult<bool> {
        let record = self.translation_mut(key)?;
        record.check_version(expected)?;

        let published = record.publish()?;
        if published {
            record.head.doc.touch(author);
            tracing::info!(translation = %key, version = %record.version(), author, "Published translation");
        }
        Ok(published)
    }

    /// Allows or forbids new translations of a page
    pub fn set_allow_local_translation(&mut self, id: &PageId, allow: bool) -> CmsResult<()> {
        let record = self.page_mut(id)?;
        record.head.allow_local_translation = allow;
        Ok(())
    }

    fn revision_doc(&self, key: &RecordKey, version: VersionTag) -> CmsResult<Option<Document>> {
        let doc = match key {
            RecordKey::Page(id) => self
                .page_record(id)?
                .revision(version)
                .map(|page| page.doc.clone()),
            RecordKey::Translation(tkey) => self
                .translation_record(tkey)?
                .revision(version)
                .map(|t| t.doc.clone()),
        };
        Ok(doc)
    }

    fn apply_page(
        &mut self,
        id: &PageId,
        expected: VersionTag,
        author: &str,
        change: impl FnOnce(&mut Page) -> CmsResult<()>,
    ) -> CmsResult<&Page> {
        let record = self.page_record(id)?;
        let old_slug = record.head.doc.slug.clone();
        let draft = stage(record, expected, author, change)?;

        self.slugs.rename(
            &SlugScope::Global,
            &old_slug,
            draft.doc.slug.clone(),
            &RecordKey::Page(id.clone()),
        )?;

        let record = self.page_mut(id)?;
        commit(record, draft);
        tracing::debug!(page = %id, version = %record.version(), author, "Saved page");
        Ok(&record.head)
    }

    fn apply_translation(
        &mut self,
        key: &TranslationKey,
        expected: VersionTag,
        author: &str,
        change: impl FnOnce(&mut Translation) -> CmsResult<()>,
    ) -> CmsResult<&Translation> {
        let record = self.translation_record(key)?;
        let old_slug = record.head.doc.slug.clone();
        let draft = stage(record, expected, author, change)?;

        self.slugs.rename(
            &locale_scope(&key.locale),
            &old_slug,
            draft.doc.slug.clone(),
            &RecordKey::Translation(key.clone()),
        )?;

        let record = self.translation_mut(key)?;
        commit(record, draft);
        tracing::debug!(translation = %key, version = %record.version(), author, "Saved translation");
        Ok(&record.head)
    }
}

pub(super) fn locale_scope(locale: &Locale) -> SlugScope {
    SlugScope::Locale(locale.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PageStatus, ResourceKind};
    use crate::translator::CopyTranslator;

    fn setup() -> (ContentRepository, PageId) {
        let mut repo = ContentRepository::new();
        let id = repo
            .create_page("Company History", "/about/history".parse().unwrap(), "<p>Founded</p>", "Alex M.")
            .unwrap()
            .id
            .clone();
        (repo, id)
    }

    #[test]
    fn create_page_starts_as_draft_v1() {
        let (repo, id) = setup();
        let page = repo.page(&id).unwrap();

        assert_eq!(page.doc.status, PageStatus::Draft);
        assert_eq!(page.doc.version, VersionTag::INITIAL);
        assert!(page.allow_local_translation);
    }

    #[test]
    fn create_page_rejects_duplicate_slug_and_forbidden_content() {
        let (mut repo, _) = setup();

        let err = repo
            .create_page("Clash", "/about/history".parse().unwrap(), "", "Alex M.")
            .unwrap_err();
        assert_eq!(err.code(), "duplicate_slug");

        let err = repo
            .create_page("Styled", "/styled".parse().unwrap(), "<style>p{}</style>", "Alex M.")
            .unwrap_err();
        assert_eq!(err.code(), "forbidden_content");
        assert!(repo.slugs.holder(&SlugScope::Global, &"/styled".parse().unwrap()).is_none());
    }

    #[test]
    fn editing_a_draft_keeps_its_version() {
        let (mut repo, id) = setup();

        let page = repo
            .update_page(&id, VersionTag::INITIAL, &Edit::new().title("Our History"), "Jessica L.")
            .unwrap();

        assert_eq!(page.doc.version, VersionTag::INITIAL);
        assert_eq!(page.doc.title, "Our History");
        assert_eq!(page.doc.author, "Jessica L.");
        assert!(repo.page_record(&id).unwrap().history.is_empty());
    }

    #[test]
    fn stale_version_conflicts() {
        let (mut repo, id) = setup();
        repo.publish_page(&id, VersionTag::INITIAL, &CopyTranslator, "Alex M.").unwrap();
        repo.update_page(&id, VersionTag::INITIAL, &Edit::new().content("<p>v2</p>"), "Alex M.")
            .unwrap();

        let err = repo
            .update_page(&id, VersionTag::INITIAL, &Edit::new().content("<p>late</p>"), "Sarah K.")
            .unwrap_err();

        assert_eq!(err.code(), "conflict");
        assert_eq!(repo.page(&id).unwrap().doc.content, "<p>v2</p>");
    }

    #[test]
    fn forbidden_save_leaves_record_untouched() {
        let (mut repo, id) = setup();
        repo.publish_page(&id, VersionTag::INITIAL, &CopyTranslator, "Alex M.").unwrap();
        let before = repo.page_record(&id).unwrap().clone();

        let err = repo
            .update_page(
                &id,
                VersionTag::INITIAL,
                &Edit::new().content("<style>body{}</style>"),
                "Alex M.",
            )
            .unwrap_err();

        assert!(matches!(err, CmsError::ForbiddenContent(_)));
        assert_eq!(repo.page_record(&id).unwrap(), &before);
    }

    #[test]
    fn slug_change_moves_reservation() {
        let (mut repo, id) = setup();
        repo.create_page("Careers", "/careers".parse().unwrap(), "", "Alex M.").unwrap();

        let err = repo
            .update_page(&id, VersionTag::INITIAL, &Edit::new().slug("/careers".parse().unwrap()), "Alex M.")
            .unwrap_err();
        assert_eq!(err.code(), "duplicate_slug");

        repo.update_page(&id, VersionTag::INITIAL, &Edit::new().slug("/history".parse().unwrap()), "Alex M.")
            .unwrap();
        assert!(repo
            .create_page("Old slug reuse", "/about/history".parse().unwrap(), "", "Alex M.")
            .is_ok());
    }

    #[test]
    fn resources_attach_and_detach() {
        let (mut repo, id) = setup();
        let mut edit = Edit::new();
        edit.attach.push((Resource::new("/assets/main-theme.css", ResourceKind::Stylesheet), Placement::Head));
        edit.attach.push((Resource::new("/assets/analytics-core.js", ResourceKind::Script), Placement::Body));

        let page = repo.update_page(&id, VersionTag::INITIAL, &edit, "Alex M.").unwrap();
        assert_eq!(page.doc.resources.len(), 2);

        let err = repo.update_page(&id, VersionTag::INITIAL, &edit, "Alex M.").unwrap_err();
        assert_eq!(err.code(), "invalid_content");

        let mut detach = Edit::new();
        detach.detach.push("/assets/main-theme.css".to_string());
        let page = repo.update_page(&id, VersionTag::INITIAL, &detach, "Alex M.").unwrap();
        assert_eq!(page.doc.resources.len(), 1);
    }

    #[test]
    fn seo_is_validated() {
        let (mut repo, id) = setup();
        let mut edit = Edit::new();
        edit.seo = Some(SeoSettings {
            canonical_url: Some("example.com/about".to_string()),
            ..Default::default()
        });

        let err = repo.update_page(&id, VersionTag::INITIAL, &edit, "Alex M.").unwrap_err();
        assert_eq!(err.code(), "invalid_content");

        edit.seo = Some(SeoSettings {
            meta_title: Some("Company History | Acme".to_string()),
            canonical_url: Some("https://example.com/about/history".to_string()),
            structured_data: Some(parse_structured_data(r#"{"@type":"Organization"}"#).unwrap()),
            ..Default::default()
        });
        let page = repo.update_page(&id, VersionTag::INITIAL, &edit, "Alex M.").unwrap();
        assert_eq!(page.doc.seo.meta_title.as_deref(), Some("Company History | Acme"));
    }

    #[test]
    fn structured_data_must_be_json() {
        assert!(parse_structured_data("{not json").is_err());
        assert!(parse_structured_data("42").is_err());
        assert!(parse_structured_data("[]").is_ok());
    }

    #[test]
    fn revert_copies_revision_into_new_draft() {
        let (mut repo, id) = setup();
        repo.publish_page(&id, VersionTag::INITIAL, &CopyTranslator, "Alex M.").unwrap();
        repo.update_page(&id, VersionTag::INITIAL, &Edit::new().content("<p>Rewritten</p>"), "Alex M.")
            .unwrap();
        repo.publish_page(&id, VersionTag::new(2), &CopyTranslator, "Alex M.").unwrap();

        let key = RecordKey::Page(id.clone());
        let head = repo.revert(&key, VersionTag::INITIAL, VersionTag::new(2), "Alex M.").unwrap();

        assert_eq!(head, VersionTag::new(3));
        let page = repo.page(&id).unwrap();
        assert_eq!(page.doc.content, "<p>Founded</p>");
        assert_eq!(page.doc.status, PageStatus::Draft);

        let versions: Vec<_> = repo.history(&key).unwrap().iter().map(|d| d.version.number()).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn revert_unknown_revision() {
        let (mut repo, id) = setup();
        let err = repo
            .revert(&RecordKey::Page(id), VersionTag::new(7), VersionTag::INITIAL, "Alex M.")
            .unwrap_err();
        assert_eq!(err.code(), "unknown_revision");
    }

    #[test]
    fn publish_twice_is_noop() {
        let (mut repo, id) = setup();

        let first = repo.publish_page(&id, VersionTag::INITIAL, &CopyTranslator, "Alex M.").unwrap();
        let second = repo.publish_page(&id, VersionTag::INITIAL, &CopyTranslator, "Alex M.").unwrap();

        assert!(first.published);
        assert!(!second.published);
        assert_eq!(second.version, VersionTag::INITIAL);
    }

    #[test]
    fn begin_edit_cuts_one_version() {
        let (mut repo, id) = setup();
        let key = RecordKey::Page(id.clone());
        repo.publish_page(&id, VersionTag::INITIAL, &CopyTranslator, "Alex M.").unwrap();

        let v2 = repo.begin_edit(&key, VersionTag::INITIAL, "Alex M.").unwrap();
        let again = repo.begin_edit(&key, v2, "Alex M.").unwrap();

        assert_eq!(v2, VersionTag::new(2));
        assert_eq!(again, v2);
    }

    #[test]
    fn disallowing_translation_blocks_add_region() {
        let (mut repo, id) = setup();
        repo.set_allow_local_translation(&id, false).unwrap();

        let err = repo
            .add_region(&id, &"TW".parse().unwrap(), crate::domain::GenerationMethod::Copy, &CopyTranslator, "Alex M.")
            .unwrap_err();
        assert_eq!(err.code(), "translation_not_allowed");
    }
}
