//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! SQLite TEXT has no built-in length enforcement, so limits are applied at
//! the handler layer before any row is written.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Display names, department names, task titles
pub const MAX_NAME_LEN: usize = 200;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Passwords (before hashing)
pub const MAX_PASSWORD_LEN: usize = 128;

/// Extension reasons, review comments, task descriptions
pub const MAX_NOTE_LEN: usize = 500;

/// Report body text
pub const MAX_CONTENT_LEN: usize = 20_000;

/// Signature artifact references (可能是 data-URI 缩略图)
pub const MAX_SIGNATURE_LEN: usize = 16_384;

// ── Validation helpers (CRUD handlers) ──────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_empty_and_oversized() {
        assert!(validate_required_text("ok", "field", 10).is_ok());
        assert!(validate_required_text("   ", "field", 10).is_err());
        assert!(validate_required_text("aaaaaaaaaaaa", "field", 10).is_err());
    }

    #[test]
    fn optional_text_allows_none() {
        assert!(validate_optional_text(&None, "field", 5).is_ok());
        assert!(validate_optional_text(&Some("hi".into()), "field", 5).is_ok());
        assert!(validate_optional_text(&Some("toolong".into()), "field", 5).is_err());
    }
}
