//! External translator command
//!
//! The command receives one JSON request line on stdin and must answer
//! with one JSON response line on stdout:
//!
//! ```text
//! -> {"page_id":"p-1a2b3c4","locale":"TW","method":"ai","title":"...","slug":"/about","content":"<p>...</p>"}
//! <- {"success":true,"title":"...","content":"<p>...</p>"}
//! <- {"success":false,"error":"quota exceeded"}
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use super::{Generated, TranslateError, Translator};
use crate::domain::{GenerationMethod, Locale, Page};

/// A message sent to the translator command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub page_id: String,
    pub locale: String,
    pub method: GenerationMethod,
    pub title: String,
    pub slug: String,
    pub content: String,
}

impl TranslateRequest {
    pub fn new(source: &Page, locale: &Locale, method: GenerationMethod) -> Self {
        Self {
            page_id: source.id.to_string(),
            locale: locale.to_string(),
            method,
            title: source.doc.title.clone(),
            slug: source.doc.slug.to_string(),
            content: source.doc.content.clone(),
        }
    }
}

/// A response from the translator command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslateResponse {
    pub fn success(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            success: true,
            title: Some(title.into()),
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            title: None,
            content: None,
            error: Some(message.into()),
        }
    }
}

/// Runs an external program per translation
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTranslator {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Sends one request and reads one response line
    ///
    /// Stdout and stderr are drained together while the command runs, and
    /// the command is always waited on. Stderr text is attached to errors.
    pub fn execute(&self, request: &TranslateRequest) -> Result<TranslateResponse, TranslateError> {
        let line = serde_json::to_string(request)
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TranslateError::Command(format!("failed to spawn {}: {}", self.program.display(), e))
            })?;

        // A command may answer without reading its input, so a failed write
        // only matters when no response arrives
        let written = child.stdin.take().map(|mut stdin| writeln!(stdin, "{}", line));

        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout);

        match stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(response) => serde_json::from_str(response)
                .map_err(|e| TranslateError::InvalidResponse(with_stderr(e.to_string(), &stderr))),
            None if !output.status.success() => Err(TranslateError::Command(with_stderr(
                format!("{} exited with {}", self.program.display(), output.status),
                &stderr,
            ))),
            None => match written {
                Some(Err(e)) => Err(e.into()),
                _ => Err(TranslateError::InvalidResponse(with_stderr(
                    "empty output".to_string(),
                    &stderr,
                ))),
            },
        }
    }
}

fn with_stderr(message: String, stderr: &str) -> String {
    if stderr.is_empty() {
        message
    } else {
        format!("{} (stderr: {})", message, stderr)
    }
}

impl Translator for CommandTranslator {
    fn generate(
        &self,
        source: &Page,
        locale: &Locale,
        method: GenerationMethod,
    ) -> Result<Generated, TranslateError> {
        let request = TranslateRequest::new(source, locale, method);
        let response = self.execute(&request)?;

        if !response.success {
            return Err(TranslateError::Command(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let content = response
            .content
            .ok_or_else(|| TranslateError::InvalidResponse("missing content".to_string()))?;

        Ok(Generated {
            title: response.title.unwrap_or_else(|| source.doc.title.clone()),
            content,
            method,
        })
    }
}
