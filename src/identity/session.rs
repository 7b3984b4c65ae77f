use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SessionToken = String;

/// Read-only copy of the identity provider's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: SessionToken,
    pub identity_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(identity_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), identity_id: identity_id.into(), email: None, expires_at: None }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Notification pushed by the identity provider on every session change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    #[serde(default)]
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self { Self { kind: AuthEventKind::SignedIn, session: Some(session) } }
    pub fn signed_out() -> Self { Self { kind: AuthEventKind::SignedOut, session: None } }
    pub fn token_refreshed(session: Session) -> Self { Self { kind: AuthEventKind::TokenRefreshed, session: Some(session) } }
    pub fn user_updated(session: Session) -> Self { Self { kind: AuthEventKind::UserUpdated, session: Some(session) } }
    pub fn initial(session: Option<Session>) -> Self { Self { kind: AuthEventKind::InitialSession, session } }
}

/// Random 256-bit token, base64url without padding.
pub fn issue_token() -> SessionToken {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}
