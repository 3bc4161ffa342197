//! Input validation applied at the store boundary, before anything can reach
//! the server.

use crate::error::ErrorCode;

pub const MAX_TITLE_LEN: usize = 200;

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title must be <= {max} characters (got {len})")]
    TitleTooLong { len: usize, max: usize },

    #[error("title must not contain control characters")]
    ControlCharacter,

    #[error("position {axis} must be a finite number")]
    NonFinitePosition { axis: &'static str },
}

impl ValidationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyTitle | Self::TitleTooLong { .. } | Self::ControlCharacter => {
                ErrorCode::InvalidTitle
            }
            Self::NonFinitePosition { .. } => ErrorCode::InvalidPosition,
        }
    }
}

/// Trim a title and check it. Returns the trimmed title.
pub fn normalize_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong {
            len,
            max: MAX_TITLE_LEN,
        });
    }
    if title.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter);
    }
    Ok(title.to_string())
}

pub fn check_position(axis: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinitePosition { axis })
    }
}
