//! Input validation shared by request types.

use validator::ValidationError;

lazy_static::lazy_static! {
    /// 3 to 30 characters of letters, digits, underscore and dot.
    pub static ref USERNAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9_.]{3,30}$").unwrap();
}

/// Validates a username against [`USERNAME_REGEX`].
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_format");
        err.message =
            Some("Username must be 3-30 characters of letters, digits, '_' or '.'".into());
        Err(err)
    }
}

/// Rejects blank or whitespace-only strings.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Lowercases and trims an email for lookups and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
