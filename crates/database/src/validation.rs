//! Field validation shared by the request types.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{DatabaseError, DatabaseResult};

static EMAIL_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$"));

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .map(|pattern| pattern.is_match(email))
        .unwrap_or(false)
}

pub fn require(value: &str, message: &str) -> DatabaseResult<()> {
    if value.trim().is_empty() {
        return Err(DatabaseError::validation(message));
    }
    Ok(())
}

pub fn max_chars(value: &str, max: usize, message: &str) -> DatabaseResult<()> {
    if value.chars().count() > max {
        return Err(DatabaseError::validation(message));
    }
    Ok(())
}

pub fn email(value: &str) -> DatabaseResult<()> {
    require(value, "Please add an email")?;
    if !is_valid_email(value) {
        return Err(DatabaseError::validation("Please add a valid email"));
    }
    Ok(())
}

pub fn password(value: &str) -> DatabaseResult<()> {
    require(value, "Please add a password")?;
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DatabaseError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn phone_number(value: Option<&str>, max: usize) -> DatabaseResult<()> {
    if let Some(phone) = value {
        max_chars(
            phone,
            max,
            &format!("Phone number cannot be longer than {max} characters"),
        )?;
    }
    Ok(())
}
