//! Client-side input validation.
//!
//! Mirrors the checks the backend applies to registration and account
//! forms, so obviously bad input is rejected before a round trip.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DomainError, DomainResult};
use crate::id::WorkId;

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 16;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,63}$").expect("email pattern compiles")
});

// English letters, digits and common ASCII symbols only.
static PASSWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9!@#$%^&*()_+\-=\[\]{}|;:',.<>?/]+$").expect("password pattern compiles")
});

/// Validate an email address; surrounding whitespace is ignored.
pub fn validate_email(email: &str) -> DomainResult<()> {
    if email.is_empty() {
        return Err(DomainError::validation("email must not be empty"));
    }
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("email must not be only whitespace"));
    }
    if !EMAIL_PATTERN.is_match(trimmed) {
        return Err(DomainError::validation("email format is invalid"));
    }
    Ok(())
}

/// Validate a password against the backend's format rules.
pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.is_empty() {
        return Err(DomainError::validation("password must not be empty"));
    }
    if password.contains(' ') {
        return Err(DomainError::validation("password must not contain spaces"));
    }
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(DomainError::validation(format!(
            "password length must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN}"
        )));
    }
    if !PASSWORD_PATTERN.is_match(password) {
        return Err(DomainError::validation(
            "password may only contain letters, digits and common symbols",
        ));
    }
    Ok(())
}

/// Reject blank free-text fields (names, codes, reasons).
pub fn validate_required(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Validate and normalize a work id.
pub fn validate_work_id(id: &str) -> DomainResult<WorkId> {
    WorkId::new(id)
}
