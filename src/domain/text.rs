//! Validation of user-submitted post and comment text.

use super::error::DomainError;

/// Character limit the backend enforces on post text.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 280;

/// Trimmed, non-empty text within the configured character limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedText(String);

impl SubmittedText {
    pub fn parse(raw: &str, max_chars: usize) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("text must not be empty"));
        }

        let chars = trimmed.chars().count();
        if chars > max_chars {
            return Err(DomainError::validation(format!(
                "text must be at most {max_chars} characters long (got {chars})"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
