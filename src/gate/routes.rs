//! Static route classification tables.
//!
//! Classification depends only on the path string. Paths are normalized first:
//! a missing leading slash is added and trailing slashes are dropped (`/login/`
//! is `/login`). Protected prefixes match whole segments, so `/admin/users` is
//! protected and `/administrators` is not.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const PENDING_APPROVAL_PATH: &str = "/pending-approval";
pub const REJECTED_PATH: &str = "/rejected";

const PROTECTED_PREFIXES: &[&str] = &["/settings", "/dashboard", "/upload", "/favorites", "/admin"];
const PUBLIC_ONLY: &[&str] = &[LOGIN_PATH, REGISTER_PATH];
const SPECIAL_ACCESS: &[&str] = &[PENDING_APPROVAL_PATH, REJECTED_PATH];

static FILM_EDIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/film/[^/]+/edit(?:/.*)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Requires a signed-in session.
    Protected,
    /// Login/register; only meaningful for anonymous visitors.
    PublicOnly,
    /// Status pages reachable only in the matching account status.
    SpecialAccess,
    Open,
}

pub fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        return HOME_PATH.to_string();
    }
    if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{}", trimmed) }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn is_protected(path: &str) -> bool {
    let p = normalize(path);
    PROTECTED_PREFIXES.iter().any(|pre| matches_prefix(&p, pre)) || FILM_EDIT.is_match(&p)
}

pub fn is_public_only(path: &str) -> bool {
    let p = normalize(path);
    PUBLIC_ONLY.contains(&p.as_str())
}

pub fn is_special_access(path: &str) -> bool {
    let p = normalize(path);
    SPECIAL_ACCESS.contains(&p.as_str())
}

pub fn classify(path: &str) -> RouteClass {
    if is_protected(path) {
        RouteClass::Protected
    } else if is_public_only(path) {
        RouteClass::PublicOnly
    } else if is_special_access(path) {
        RouteClass::SpecialAccess
    } else {
        RouteClass::Open
    }
}

/// `/login?redirectTo=<path>`; slashes stay literal, everything else is percent-encoded.
pub fn login_redirect(path: &str) -> String {
    let encoded = urlencoding::encode(path).replace("%2F", "/");
    format!("{}?redirectTo={}", LOGIN_PATH, encoded)
}
