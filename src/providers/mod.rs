//! Collaborator interfaces consumed by the session gate.
//!
//! The identity provider, profile store and router are all owned elsewhere
//! (the hosted platform and the frontend router); the gate only talks to them
//! through these traits. `memory` holds in-process implementations for tests
//! and local runs.

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::gate::Location;
use crate::identity::{AuthEvent, Profile, Session};

pub mod memory;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// One-shot lookup of the currently stored session.
    async fn current_session(&self) -> anyhow::Result<Option<Session>>;

    /// Sign-in/sign-out/refresh notifications from now on.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Point lookup by identity. `Ok(None)` means the identity never registered.
    async fn get_profile(&self, identity_id: &str) -> anyhow::Result<Option<Profile>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigateOptions {
    pub replace: bool,
}

pub trait Navigator: Send + Sync {
    fn location(&self) -> Location;

    /// Fires on every route change, including those caused by `navigate`.
    fn subscribe(&self) -> watch::Receiver<Location>;

    fn navigate(&self, to: &str, options: NavigateOptions);
}
