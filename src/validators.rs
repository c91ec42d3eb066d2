/// Field validators shared by request schemas.
///
/// Each function has the signature `validator` expects for
/// `#[validate(custom(function = "..."))]`.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use validator::ValidationError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 50;

lazy_static! {
    static ref PASSWORD_SYMBOL: Regex = Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).unwrap();
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Password rules:
/// - 8 to 50 characters
/// - at least one digit
/// - at least one symbol
pub fn validate_password_complexity(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(violation("too_short", "must be at least 8 characters"));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(violation("too_long", "must be at most 50 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(violation("missing_digit", "must contain at least one number"));
    }
    if !PASSWORD_SYMBOL.is_match(password) {
        return Err(violation("missing_symbol", "must contain at least one symbol"));
    }
    Ok(())
}

/// Display names must not contain control characters (including NUL).
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().any(|c| c.is_control()) {
        return Err(violation("suspicious_content", "must not contain control characters"));
    }
    Ok(())
}

/// Trim and lower-case an email address.
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}
