//! Identifiers for pages, translations and slugs
//!
//! ID Format:
//! - Page IDs: `p-{7-char-hash}` (e.g., `p-7f2b4c1`)
//! - Locales: uppercase region codes (e.g., `TW`, `DE`, `ZH-HANT`)
//! - Translation keys: `{page-id}@{locale}` (e.g., `p-7f2b4c1@TW`)
//! - Deletion IDs: `d-{7-char-hash}` (e.g., `d-03c9e1a`), one per recycle bin entry
//!
//! Hash is derived from title + creation timestamp, so two pages with the
//! same title created at different instants get different IDs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid page ID format: expected 'p-{{7-char-hash}}', got '{0}'")]
    InvalidPageId(String),

    #[error("Invalid locale '{0}': expected a region code like 'TW' or 'ZH-HANT'")]
    InvalidLocale(String),

    #[error("Invalid translation key '{0}': expected '{{page-id}}@{{locale}}'")]
    InvalidTranslationKey(String),

    #[error("Invalid slug '{0}': must start with '/' and contain no whitespace")]
    InvalidSlug(String),

    #[error("Invalid deletion ID format: expected 'd-{{7-char-hash}}', got '{0}'")]
    InvalidDeletionId(String),
}

/// Generates a 7-character hash from title and timestamp
fn generate_hash(title: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", title, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

/// Page ID in the format `p-{7-char-hash}`
///
/// Shared by a Global page and every translation derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageId {
    hash: String,
}

impl PageId {
    /// Creates a new page ID from title and timestamp
    pub fn new(title: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            hash: generate_hash(title, timestamp),
        }
    }

    /// Returns the hash portion of the ID
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p-{}", self.hash)
    }
}

impl FromStr for PageId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hash = s
            .strip_prefix("p-")
            .ok_or_else(|| IdError::InvalidPageId(s.to_string()))?;

        if hash.len() != 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidPageId(s.to_string()));
        }

        Ok(Self {
            hash: hash.to_ascii_lowercase(),
        })
    }
}

impl TryFrom<String> for PageId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PageId> for String {
    fn from(id: PageId) -> Self {
        id.to_string()
    }
}

/// Region code a translation is published under
///
/// Normalized to uppercase. The primary subtag is 2-3 letters, optional
/// further subtags are 2-8 alphanumerics separated by `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Returns the normalized code
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase path prefix used for generated slugs (`TW` -> `/tw`)
    pub fn path_prefix(&self) -> String {
        format!("/{}", self.0.to_ascii_lowercase())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locale {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut parts = s.split('-');

        let primary = parts.next().unwrap_or_default();
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(IdError::InvalidLocale(s.to_string()));
        }

        for part in parts {
            if !(2..=8).contains(&part.len()) || !part.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(IdError::InvalidLocale(s.to_string()));
            }
        }

        Ok(Self(s.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for Locale {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

/// Composite key of a translation: the page ID plus its locale
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TranslationKey {
    pub page: PageId,
    pub locale: Locale,
}

impl TranslationKey {
    pub fn new(page: PageId, locale: Locale) -> Self {
        Self { page, locale }
    }
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.page, self.locale)
    }
}

impl FromStr for TranslationKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (page, locale) = s
            .split_once('@')
            .ok_or_else(|| IdError::InvalidTranslationKey(s.to_string()))?;

        Ok(Self {
            page: page.parse()?,
            locale: locale.parse()?,
        })
    }
}

impl TryFrom<String> for TranslationKey {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TranslationKey> for String {
    fn from(key: TranslationKey) -> Self {
        key.to_string()
    }
}

/// Key of any record held by the repository or the recycle bin
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordKey {
    Page(PageId),
    Translation(TranslationKey),
}

impl RecordKey {
    /// Returns the locale for translations, `None` for Global pages
    pub fn locale(&self) -> Option<&Locale> {
        match self {
            RecordKey::Page(_) => None,
            RecordKey::Translation(key) => Some(&key.locale),
        }
    }
}

impl From<PageId> for RecordKey {
    fn from(id: PageId) -> Self {
        RecordKey::Page(id)
    }
}

impl From<TranslationKey> for RecordKey {
    fn from(key: TranslationKey) -> Self {
        RecordKey::Translation(key)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Page(id) => id.fmt(f),
            RecordKey::Translation(key) => key.fmt(f),
        }
    }
}

impl FromStr for RecordKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('@') {
            Ok(RecordKey::Translation(s.parse()?))
        } else {
            Ok(RecordKey::Page(s.parse()?))
        }
    }
}

impl TryFrom<String> for RecordKey {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> Self {
        key.to_string()
    }
}

/// ID of one recycle bin entry in the format `d-{7-char-hash}`
///
/// A record key can be deleted, re-created and deleted again, so the bin
/// tells its entries apart by this ID rather than by record key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeletionId {
    hash: String,
}

impl DeletionId {
    /// Derives an ID from the deleted record's key, deletion time and a
    /// salt that callers bump on collision
    pub fn new(key: &RecordKey, deleted_at: DateTime<Utc>, salt: u32) -> Self {
        Self {
            hash: generate_hash(&format!("{}#{}", key, salt), deleted_at),
        }
    }
}

impl fmt::Display for DeletionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d-{}", self.hash)
    }
}

impl FromStr for DeletionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hash = s
            .strip_prefix("d-")
            .ok_or_else(|| IdError::InvalidDeletionId(s.to_string()))?;

        if hash.len() != 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidDeletionId(s.to_string()));
        }

        Ok(Self {
            hash: hash.to_ascii_lowercase(),
        })
    }
}

impl TryFrom<String> for DeletionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeletionId> for String {
    fn from(id: DeletionId) -> Self {
        id.to_string()
    }
}

/// URL path of a page (e.g., `/about/history`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefixes this slug with a locale path (`/about` -> `/tw/about`)
    pub fn localized(&self, locale: &Locale) -> Slug {
        let prefix = locale.path_prefix();
        if self.0 == "/" {
            Slug(prefix)
        } else {
            Slug(format!("{}{}", prefix, self.0))
        }
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.starts_with('/') || s.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidSlug(s.to_string()));
        }

        // Trailing slashes are not significant
        let trimmed = s.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(Slug("/".to_string()));
        }

        Ok(Slug(trimmed.to_string()))
    }
}

impl TryFrom<String> for Slug {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

/// Scope in which slugs must be unique
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlugScope {
    Global,
    Locale(Locale),
}

impl fmt::Display for SlugScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlugScope::Global => f.write_str("global"),
            SlugScope::Locale(locale) => write!(f, "locale {}", locale),
        }
    }
}
