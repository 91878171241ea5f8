//! Regions: translations of Global pages and their synchronization
//!
//! Derived translations are generated from the source's latest published
//! revision. When the source publishes again, [`ContentRepository::propagate`]
//! regenerates the translations nobody edited and flags the edited ones
//! for manual reconciliation. Edited content is never overwritten unless
//! an editor accepts the source.

use serde::Serialize;

use super::content::locale_scope;
use super::{commit, ContentRepository};
use crate::domain::sync::{self, SyncAction};
use crate::domain::{
    compare, lifecycle, Comparison, Document, GenerationMethod, Locale, Page, PageId, RecordKey,
    Slug, Translation, TranslationKey, VersionTag, Versioned,
};
use crate::error::{CmsError, CmsResult};
use crate::translator::Translator;

/// What propagation did for one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Content regenerated from the new source version
    Regenerated { republished: bool },
    /// Edited locally; marked for manual reconciliation
    MarkedPending,
    /// Already synced, marked or dismissed for this version
    UpToDate,
    /// Not derived from this page
    Skipped,
    /// Regeneration failed; the translation is unchanged
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleOutcome {
    pub locale: Locale,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Per-locale results of one propagation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub source_version: VersionTag,
    pub outcomes: Vec<LocaleOutcome>,
}

impl PropagationReport {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    pub fn regenerated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Regenerated { .. }))
    }

    pub fn marked_pending(&self) -> usize {
        self.count(|o| matches!(o, Outcome::MarkedPending))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn outcome(&self, locale: &Locale) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| &o.locale == locale)
            .map(|o| &o.outcome)
    }
}

/// The revision translations are generated from
struct Source {
    page: Page,
    version: VersionTag,
}

impl Source {
    fn of(record: &Versioned<Page>) -> Self {
        Self {
            page: record.latest_published().unwrap_or(&record.head).clone(),
            version: record.effective_version(),
        }
    }
}

impl ContentRepository {
    /// Creates a translation of a Global page as Draft v1, Synced
    ///
    /// The slug is the page's slug under the locale prefix and the page's
    /// resources are carried over.
    pub fn add_region(
        &mut self,
        id: &PageId,
        locale: &Locale,
        method: GenerationMethod,
        translator: &dyn Translator,
        author: &str,
    ) -> CmsResult<&Translation> {
        let record = self.page_record(id)?;
        if !record.head.allow_local_translation {
            return Err(CmsError::TranslationNotAllowed(id.clone()));
        }

        let key = TranslationKey::new(id.clone(), locale.clone());
        if self.translations.contains_key(&key) {
            return Err(CmsError::DuplicateRegion {
                page: id.clone(),
                locale: locale.clone(),
            });
        }

        let source = Source::of(record);
        let slug = record.head.doc.slug.localized(locale);
        let owner = RecordKey::Translation(key.clone());
        self.slugs.check(&locale_scope(locale), &slug, &owner)?;

        let generated = translator.generate(&source.page, locale, method)?;
        let mut doc = Document::new(generated.title, slug, generated.content, author);
        doc.resources = source.page.doc.resources.clone();
        lifecycle::validate(&doc)?;

        let baseline = sync::baseline_for(&doc.content, source.version);
        let translation = Translation::derived(id.clone(), locale.clone(), method, doc, baseline);

        self.slugs
            .reserve(locale_scope(locale), translation.doc.slug.clone(), owner)?;
        tracing::info!(translation = %key, %method, source_version = %source.version, author, "Added region");

        let record = self
            .translations
            .entry(key)
            .or_insert(Versioned::new(translation));
        Ok(&record.head)
    }

    /// Creates a locally originated page in a locale
    pub fn create_local(
        &mut self,
        locale: &Locale,
        title: &str,
        slug: Slug,
        content: &str,
        author: &str,
    ) -> CmsResult<&Translation> {
        if title.trim().is_empty() {
            return Err(CmsError::InvalidContent("title cannot be empty".to_string()));
        }

        let id = self.fresh_page_id(title);
        let translation = Translation::local(id, locale.clone(), Document::new(title, slug, content, author));
        lifecycle::validate(&translation.doc)?;

        let key = translation.key();
        self.slugs.reserve(
            locale_scope(locale),
            translation.doc.slug.clone(),
            RecordKey::Translation(key.clone()),
        )?;
        tracing::info!(translation = %key, author, "Created local page");

        let record = self
            .translations
            .entry(key)
            .or_insert(Versioned::new(translation));
        Ok(&record.head)
    }

    /// Pushes a Global page's latest published revision to its translations
    ///
    /// A failed regeneration is reported for its locale and leaves that
    /// translation unchanged; the remaining locales are still processed.
    /// Running it twice for the same source version changes nothing.
    pub fn propagate(
        &mut self,
        id: &PageId,
        translator: &dyn Translator,
        author: &str,
    ) -> CmsResult<PropagationReport> {
        let source = Source::of(self.page_record(id)?);
        let keys: Vec<TranslationKey> = self
            .translations
            .iter()
            .filter(|(_, record)| record.head.source_page_id.as_ref() == Some(id))
            .map(|(key, _)| key.clone())
            .collect();

        let mut report = PropagationReport {
            source_version: source.version,
            outcomes: Vec::with_capacity(keys.len()),
        };

        for key in keys {
            let outcome = match self.sync_one(&key, &source, translator, author) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(translation = %key, error = %err, "Propagation failed");
                    Outcome::Failed {
                        error: err.to_string(),
                    }
                }
            };
            report.outcomes.push(LocaleOutcome {
                locale: key.locale,
                outcome,
            });
        }

        tracing::info!(
            page = %id,
            version = %source.version,
            regenerated = report.regenerated(),
            pending = report.marked_pending(),
            failed = report.failed(),
            "Propagated page"
        );
        Ok(report)
    }

    /// Replaces a translation's document with freshly generated source content
    ///
    /// The translation becomes Synced and loses any pending or dismissed
    /// marker. A Published translation gets a new Draft for review.
    pub fn accept_source(
        &mut self,
        key: &TranslationKey,
        expected: VersionTag,
        translator: &dyn Translator,
        author: &str,
    ) -> CmsResult<&Translation> {
        let record = self.translation_record(key)?;
        record.check_version(expected)?;

        let source_id = self.source_id(&record.head)?;
        let method = record.head.origin.method().unwrap_or_default();
        let source = Source::of(self.page_record(&source_id)?);

        self.regenerate(key, &source, method, translator, author, false)?;
        tracing::info!(translation = %key, source_version = %source.version, author, "Accepted source");
        self.translation(key)
    }

    /// Keeps local content against the pending source version
    ///
    /// The translation stays Overridden, and propagation will not mark it
    /// again until the source publishes a newer version.
    pub fn keep_local(
        &mut self,
        key: &TranslationKey,
        expected: VersionTag,
        author: &str,
    ) -> CmsResult<&Translation> {
        let record = self.translation_record(key)?;
        record.check_version(expected)?;

        let source_id = self.source_id(&record.head)?;
        let dismissed = match record.head.pending_source {
            Some(version) => version,
            None => self.page_record(&source_id)?.effective_version(),
        };

        let record = self.translation_mut(key)?;
        record.head.pending_source = None;
        record.head.dismissed_source = Some(dismissed);
        record.head.doc.touch(author);
        tracing::info!(translation = %key, dismissed = %dismissed, author, "Kept local content");
        Ok(&record.head)
    }

    /// Line diff between regenerated source content and the local content
    pub fn compare(&self, key: &TranslationKey, translator: &dyn Translator) -> CmsResult<Comparison> {
        let translation = self.translation(key)?;
        let source_id = self.source_id(translation)?;
        let source = Source::of(self.page_record(&source_id)?);
        let method = translation.origin.method().unwrap_or_default();

        let generated = translator.generate(&source.page, &key.locale, method)?;
        Ok(compare::compare(&generated.content, &translation.doc.content))
    }

    fn source_id(&self, translation: &Translation) -> CmsResult<PageId> {
        translation
            .source_page_id
            .clone()
            .ok_or_else(|| CmsError::NoSource(RecordKey::Translation(translation.key())))
    }

    fn sync_one(
        &mut self,
        key: &TranslationKey,
        source: &Source,
        translator: &dyn Translator,
        author: &str,
    ) -> CmsResult<Outcome> {
        let action = sync::plan(self.translation(key)?, source.version);

        let outcome = match action {
            SyncAction::Skip => Outcome::Skipped,
            SyncAction::UpToDate => Outcome::UpToDate,
            SyncAction::MarkPending => {
                self.translation_mut(key)?.head.pending_source = Some(source.version);
                tracing::debug!(translation = %key, version = %source.version, "Marked source pending");
                Outcome::MarkedPending
            }
            SyncAction::Regenerate(method) => {
                let republish = self.policy.republish;
                let republished = self.regenerate(key, source, method, translator, author, republish)?;
                Outcome::Regenerated { republished }
            }
        };
        Ok(outcome)
    }

    /// Regenerates a translation from `source`; returns true if the
    /// result was re-published
    fn regenerate(
        &mut self,
        key: &TranslationKey,
        source: &Source,
        method: GenerationMethod,
        translator: &dyn Translator,
        author: &str,
        republish: bool,
    ) -> CmsResult<bool> {
        let record = self.translation_record(key)?;
        let generated = translator.generate(&source.page, &key.locale, method)?;
        let was_published = record.status().is_published();

        let mut draft = lifecycle::begin_edit(&record.head)?;
        draft.doc.title = generated.title;
        draft.doc.content = generated.content;
        draft.baseline = Some(sync::baseline_for(&draft.doc.content, source.version));
        draft.pending_source = None;
        draft.dismissed_source = None;
        draft.doc.touch(author);
        lifecycle::validate(&draft.doc)?;

        let republished = was_published && republish;
        let head = if republished {
            lifecycle::publish(&draft)?
        } else {
            draft
        };

        commit(self.translation_mut(key)?, head);
        Ok(republished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PageStatus, SyncStatus};
    use crate::repository::Edit;
    use crate::translator::{CopyTranslator, Generated, TranslateError};

    /// Prefixes content with the locale, standing in for machine translation
    struct Tagging;

    impl Translator for Tagging {
        fn generate(
            &self,
            source: &Page,
            locale: &Locale,
            method: GenerationMethod,
        ) -> Result<Generated, TranslateError> {
            Ok(Generated {
                title: format!("[{}] {}", locale, source.doc.title),
                content: format!("[{}]\n{}", locale, source.doc.content),
                method,
            })
        }
    }

    struct Broken;

    impl Translator for Broken {
        fn generate(&self, _: &Page, _: &Locale, _: GenerationMethod) -> Result<Generated, TranslateError> {
            Err(TranslateError::Command("quota exceeded".to_string()))
        }
    }

    fn tw() -> Locale {
        "TW".parse().unwrap()
    }

    fn published_page(repo: &mut ContentRepository) -> PageId {
        let id = repo
            .create_page("Mission Statement", "/about/mission".parse().unwrap(), "<p>Our mission</p>", "Alex M.")
            .unwrap()
            .id
            .clone();
        repo.publish_page(&id, VersionTag::INITIAL, &Tagging, "Alex M.").unwrap();
        id
    }

    fn publish_new_version(repo: &mut ContentRepository, id: &PageId, content: &str, translator: &dyn Translator) -> PropagationReport {
        let current = repo.page(id).unwrap().doc.version;
        let page = repo.update_page(id, current, &Edit::new().content(content), "Alex M.").unwrap();
        let next = page.doc.version;
        repo.publish_page(id, next, translator, "Alex M.").unwrap().propagation
    }

    #[test]
    fn add_region_localizes_slug_and_copies_resources() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);

        let t = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap();

        assert_eq!(t.doc.slug.as_str(), "/tw/about/mission");
        assert_eq!(t.doc.status, PageStatus::Draft);
        assert_eq!(t.doc.version, VersionTag::INITIAL);
        assert!(t.doc.content.starts_with("[TW]"));
        let key = t.key();
        assert_eq!(repo.sync_status(&key).unwrap(), SyncStatus::Synced);
    }

    #[test]
    fn add_region_twice_is_duplicate() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap();

        let err = repo
            .add_region(&id, &tw(), GenerationMethod::Copy, &CopyTranslator, "Alex M.")
            .unwrap_err();
        assert!(matches!(err, CmsError::DuplicateRegion { .. }));
    }

    #[test]
    fn add_region_slug_collision_in_locale() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        repo.create_local(&tw(), "台灣使命", "/tw/about/mission".parse().unwrap(), "", "Wei-Ling C.")
            .unwrap();

        let err = repo
            .add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.")
            .unwrap_err();
        assert_eq!(err.code(), "duplicate_slug");
    }

    #[test]
    fn add_region_translator_failure_leaves_nothing_behind() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);

        let err = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Broken, "Alex M.").unwrap_err();

        assert_eq!(err.code(), "translation_failed");
        assert!(repo.translations_of(&id).next().is_none());
        assert!(repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").is_ok());
    }

    #[test]
    fn draft_source_edit_keeps_translations_synced() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        let key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();

        repo.update_page(&id, VersionTag::INITIAL, &Edit::new().content("<p>Work in progress</p>"), "Alex M.")
            .unwrap();

        assert_eq!(repo.sync_status(&key).unwrap(), SyncStatus::Synced);
    }

    #[test]
    fn propagation_republishes_published_translations() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        let key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();
        repo.publish_translation(&key, VersionTag::INITIAL, "Alex M.").unwrap();

        let report = publish_new_version(&mut repo, &id, "<p>New mission</p>", &Tagging);

        assert_eq!(report.outcome(&tw()), Some(&Outcome::Regenerated { republished: true }));
        let record = repo.translation_record(&key).unwrap();
        assert_eq!(record.head.doc.status, PageStatus::Published);
        assert_eq!(record.head.doc.version, VersionTag::new(2));
        assert_eq!(record.history.len(), 1);
        assert!(record.head.doc.content.contains("New mission"));
        assert_eq!(repo.sync_status(&key).unwrap(), SyncStatus::Synced);
    }

    #[test]
    fn propagation_without_republish_leaves_draft() {
        let mut repo = ContentRepository::new().with_policy(crate::repository::SyncPolicy { republish: false });
        let id = published_page(&mut repo);
        let key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();
        repo.publish_translation(&key, VersionTag::INITIAL, "Alex M.").unwrap();

        let report = publish_new_version(&mut repo, &id, "<p>New mission</p>", &Tagging);

        assert_eq!(report.outcome(&tw()), Some(&Outcome::Regenerated { republished: false }));
        assert_eq!(repo.translation(&key).unwrap().doc.status, PageStatus::Draft);
        assert_eq!(repo.sync_status(&key).unwrap(), SyncStatus::Synced);
    }

    #[test]
    fn propagation_is_idempotent() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        let key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();
        publish_new_version(&mut repo, &id, "<p>v2</p>", &Tagging);
        let after_first = repo.translation_record(&key).unwrap().clone();

        let report = repo.propagate(&id, &Tagging, "Alex M.").unwrap();

        assert_eq!(report.outcome(&tw()), Some(&Outcome::UpToDate));
        assert_eq!(repo.translation_record(&key).unwrap(), &after_first);
    }

    #[test]
    fn edited_translation_marked_once() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        let key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();
        repo.update_translation(&key, VersionTag::INITIAL, &Edit::new().content("<p>本地版本</p>"), "Wei-Ling C.")
            .unwrap();

        let report = publish_new_version(&mut repo, &id, "<p>v2</p>", &Tagging);
        assert_eq!(report.outcome(&tw()), Some(&Outcome::MarkedPending));

        let t = repo.translation(&key).unwrap();
        assert_eq!(t.pending_source, Some(VersionTag::new(2)));
        assert_eq!(t.doc.content, "<p>本地版本</p>");

        let again = repo.propagate(&id, &Tagging, "Alex M.").unwrap();
        assert_eq!(again.outcome(&tw()), Some(&Outcome::UpToDate));
    }

    #[test]
    fn failures_are_per_locale() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        let tw_key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();
        let de_key = repo
            .add_region(&id, &"DE".parse().unwrap(), GenerationMethod::Ai, &Tagging, "Alex M.")
            .unwrap()
            .key();
        repo.update_translation(&de_key, VersionTag::INITIAL, &Edit::new().content("<p>Lokal</p>"), "Lena S.")
            .unwrap();
        let tw_before = repo.translation_record(&tw_key).unwrap().clone();

        let report = publish_new_version(&mut repo, &id, "<p>v2</p>", &Broken);

        assert_eq!(report.failed(), 1);
        assert_eq!(report.marked_pending(), 1);
        assert_eq!(repo.translation_record(&tw_key).unwrap(), &tw_before);

        let retry = repo.propagate(&id, &Tagging, "Alex M.").unwrap();
        assert_eq!(retry.regenerated(), 1);
        assert_eq!(repo.sync_status(&tw_key).unwrap(), SyncStatus::Synced);
    }

    #[test]
    fn accept_source_resyncs() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        let key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();
        repo.update_translation(&key, VersionTag::INITIAL, &Edit::new().content("<p>本地</p>"), "Wei-Ling C.")
            .unwrap();
        publish_new_version(&mut repo, &id, "<p>v2</p>", &Tagging);

        let t = repo.accept_source(&key, VersionTag::INITIAL, &Tagging, "Wei-Ling C.").unwrap();

        assert!(t.pending_source.is_none());
        assert!(t.doc.content.contains("v2"));
        assert_eq!(repo.sync_status(&key).unwrap(), SyncStatus::Synced);
    }

    #[test]
    fn keep_local_dismisses_until_next_version() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        let key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();
        repo.update_translation(&key, VersionTag::INITIAL, &Edit::new().content("<p>本地</p>"), "Wei-Ling C.")
            .unwrap();
        publish_new_version(&mut repo, &id, "<p>v2</p>", &Tagging);

        let t = repo.keep_local(&key, VersionTag::INITIAL, "Wei-Ling C.").unwrap();
        assert_eq!(t.dismissed_source, Some(VersionTag::new(2)));
        assert!(t.pending_source.is_none());
        assert_eq!(repo.sync_status(&key).unwrap(), SyncStatus::Overridden);

        let same = repo.propagate(&id, &Tagging, "Alex M.").unwrap();
        assert_eq!(same.outcome(&tw()), Some(&Outcome::UpToDate));

        let next = publish_new_version(&mut repo, &id, "<p>v3</p>", &Tagging);
        assert_eq!(next.outcome(&tw()), Some(&Outcome::MarkedPending));
    }

    #[test]
    fn reconciliation_needs_a_source() {
        let mut repo = ContentRepository::new();
        let key = repo
            .create_local(&tw(), "台灣團隊", "/tw/about/team".parse().unwrap(), "<p>團隊</p>", "Wei-Ling C.")
            .unwrap()
            .key();

        assert_eq!(repo.sync_status(&key).unwrap(), SyncStatus::Local);
        let err = repo.keep_local(&key, VersionTag::INITIAL, "Wei-Ling C.").unwrap_err();
        assert_eq!(err.code(), "no_source");
        let err = repo.compare(&key, &Tagging).unwrap_err();
        assert_eq!(err.code(), "no_source");
    }

    #[test]
    fn compare_counts_lines() {
        let mut repo = ContentRepository::new();
        let id = published_page(&mut repo);
        let key = repo.add_region(&id, &tw(), GenerationMethod::Ai, &Tagging, "Alex M.").unwrap().key();

        assert!(repo.compare(&key, &Tagging).unwrap().is_identical());

        repo.update_translation(
            &key,
            VersionTag::INITIAL,
            &Edit::new().content("[TW]\n<p>我們的使命</p>\n<p>新增</p>"),
            "Wei-Ling C.",
        )
        .unwrap();

        let diff = repo.compare(&key, &Tagging).unwrap();
        assert_eq!(diff.unchanged, 1);
        assert_eq!(diff.removed, 1);
        assert_eq!(diff.added, 2);
    }
}
