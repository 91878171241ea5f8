//! Translation/copy collaborator
//!
//! Given a Global page and a target locale, a [`Translator`] produces the
//! title and body of the localized page. The content model treats it as a
//! black box; it is invoked by `add_region`, by propagation for unedited
//! translations, and when an editor accepts the source.
//!
//! | Method | Implementation |
//! |--------|----------------|
//! | `copy` | [`CopyTranslator`] (in-process, verbatim) |
//! | `ai`   | [`CommandTranslator`] (external command, JSON over stdio) |

mod copy;
mod command;

pub use copy::CopyTranslator;
pub use command::{CommandTranslator, TranslateRequest, TranslateResponse};

use thiserror::Error;

use crate::domain::{GenerationMethod, Locale, Page};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("No translator configured for method '{0}'")]
    Unsupported(GenerationMethod),

    #[error("Translator command failed: {0}")]
    Command(String),

    #[error("Translator returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Translator I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output of a translator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub title: String,
    pub content: String,
    pub method: GenerationMethod,
}

/// Produces localized content from a Global page
pub trait Translator {
    fn generate(
        &self,
        source: &Page,
        locale: &Locale,
        method: GenerationMethod,
    ) -> Result<Generated, TranslateError>;
}

/// Routes each method to its own translator
///
/// `copy` is always available; `ai` needs an external command.
#[derive(Default)]
pub struct Translators {
    copy: CopyTranslator,
    ai: Option<CommandTranslator>,
}

impl Translators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the external machine-translation command
    pub fn with_ai(mut self, ai: CommandTranslator) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }
}

impl Translator for Translators {
    fn generate(
        &self,
        source: &Page,
        locale: &Locale,
        method: GenerationMethod,
    ) -> Result<Generated, TranslateError> {
        match method {
            GenerationMethod::Copy => self.copy.generate(source, locale, method),
            GenerationMethod::Ai => match &self.ai {
                Some(ai) => ai.generate(source, locale, method),
                None => Err(TranslateError::Unsupported(method)),
            },
        }
    }
}
