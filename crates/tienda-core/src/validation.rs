//! Structural checks on shopper-entered identity fields.
//!
//! These run before any network call; a failure here is a field-level
//! message for the shopper, never a logged error.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please fill in every required field")]
    MissingFields,

    #[error("please enter a valid email address")]
    InvalidEmail,

    #[error("please enter a valid RUT")]
    InvalidTaxId,
}

/// Strips the `.` and `-` separators from a RUT (`12.345.678-9` → `123456789`).
#[must_use]
pub fn normalize_tax_id(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '.' && *c != '-').collect()
}

/// Accepts 8 or 9 characters after stripping separators: digits, with an
/// optional trailing `K` check character.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTaxId`] when the shape does not match.
pub fn validate_tax_id(raw: &str) -> Result<(), ValidationError> {
    let cleaned = normalize_tax_id(raw);
    let len = cleaned.chars().count();
    if !(8..=9).contains(&len) {
        return Err(ValidationError::InvalidTaxId);
    }
    let body_ok = cleaned
        .char_indices()
        .all(|(i, c)| c.is_ascii_digit() || (i == len - 1 && c.eq_ignore_ascii_case(&'k')));
    if body_ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidTaxId)
    }
}

/// Matches the basic `local@domain.tld` shape.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`] when the shape does not match.
pub fn validate_email(raw: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(raw.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}
