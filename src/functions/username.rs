use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]{3,30}$").unwrap());

/// Lowercase and validate a requested username.
pub fn normalize_username(raw: &str) -> AppResult<String> {
    let candidate = raw.trim().to_lowercase();
    if USERNAME.is_match(&candidate) {
        Ok(candidate)
    } else {
        Err(AppError::user(
            "invalid_username",
            format!("username must be 3-30 characters of a-z, 0-9 or _ (got {:?})", raw),
        ))
    }
}
