//! Verbatim copy of the Global page

use super::{Generated, TranslateError, Translator};
use crate::domain::{GenerationMethod, Locale, Page};

/// Copies title and body unchanged; the locale only affects the slug,
/// which the repository derives
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyTranslator;

impl Translator for CopyTranslator {
    fn generate(
        &self,
        source: &Page,
        _locale: &Locale,
        method: GenerationMethod,
    ) -> Result<Generated, TranslateError> {
        if method != GenerationMethod::Copy {
            return Err(TranslateError::Unsupported(method));
        }

        Ok(Generated {
            title: source.doc.title.clone(),
            content: source.doc.content.clone(),
            method,
        })
    }
}
