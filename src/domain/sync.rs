//! Sync status between a translation and its Global source
//!
//! A translation is Synced when its content still equals what was
//! generated at the last sync AND that sync was against the source's
//! current published version. Everything here is a pure function of the
//! translation and the source version; the repository applies the results.

use super::translation::{GenerationMethod, SyncBaseline, SyncStatus, Translation};
use super::version::VersionTag;

/// blake3 digest of a content body
pub fn content_digest(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Baseline recorded after generating `content` from `source_version`
pub fn baseline_for(content: &str, source_version: VersionTag) -> SyncBaseline {
    SyncBaseline {
        source_version,
        content_digest: content_digest(content),
    }
}

/// Returns true if the content is unchanged since the last sync
pub fn is_unedited(translation: &Translation) -> bool {
    translation
        .baseline
        .as_ref()
        .is_some_and(|b| b.content_digest == content_digest(&translation.doc.content))
}

/// Computes sync status against the source's current version
///
/// `source_version` is `None` when the source page is no longer active;
/// a derived translation without a live source cannot be Synced.
pub fn compute_sync_status(translation: &Translation, source_version: Option<VersionTag>) -> SyncStatus {
    if translation.source_page_id.is_none() {
        return SyncStatus::Local;
    }

    match (&translation.baseline, source_version) {
        (Some(baseline), Some(version))
            if baseline.source_version == version && is_unedited(translation) =>
        {
            SyncStatus::Synced
        }
        _ => SyncStatus::Overridden,
    }
}

/// What propagation should do with one translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Regenerate content with this method and advance the baseline
    Regenerate(GenerationMethod),
    /// Local edits exist: flag the new source version for manual review
    MarkPending,
    /// Nothing to do for this source version
    UpToDate,
    /// Not derived from a source
    Skip,
}

/// Decides how a newly published source version reaches a translation
///
/// Unedited translations follow the source. Edited ones are never
/// overwritten; they get a pending marker unless one is already set for
/// this version or the editor dismissed it.
pub fn plan(translation: &Translation, source_version: VersionTag) -> SyncAction {
    if translation.source_page_id.is_none() {
        return SyncAction::Skip;
    }

    if is_unedited(translation) {
        let synced_to = translation.baseline.as_ref().map(|b| b.source_version);
        if synced_to == Some(source_version) {
            return SyncAction::UpToDate;
        }
        return match translation.origin.method() {
            Some(method) => SyncAction::Regenerate(method),
            None => SyncAction::Skip,
        };
    }

    if translation.pending_source == Some(source_version)
        || translation.dismissed_source == Some(source_version)
    {
        return SyncAction::UpToDate;
    }

    SyncAction::MarkPending
}
