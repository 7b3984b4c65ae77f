use serde::Serialize;

use super::{Profile, ProfileFailure, Session};

/// Immutable snapshot of the session handed to the rest of the application.
/// Built fresh after every gate transition; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub session: Option<Session>,
    pub identity: Option<String>,
    pub profile: Option<Profile>,
    pub is_loading: bool,
    pub error: Option<ProfileFailure>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self { session: None, identity: None, profile: None, is_loading: true, error: None }
    }
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self { is_loading: false, ..Self::default() }
    }
}
