//! In-process collaborators backed by `parking_lot` locks and tokio channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use anyhow::anyhow;

use super::{AuthProvider, NavigateOptions, Navigator, ProfileStore};
use crate::gate::{AdminChoiceSink, Location, Navigation};
use crate::identity::{issue_token, AuthEvent, Profile, Role, Session};
use crate::tprintln;

const AUTH_EVENT_CAPACITY: usize = 64;

pub struct MemoryAuthProvider {
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    fail_lookup: AtomicBool,
    lookups: AtomicUsize,
}

impl Default for MemoryAuthProvider {
    fn default() -> Self { Self::new(None) }
}

impl MemoryAuthProvider {
    pub fn new(initial: Option<Session>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { current: RwLock::new(initial), events, fail_lookup: AtomicBool::new(false), lookups: AtomicUsize::new(0) }
    }

    /// Start a session for `identity_id` and announce it.
    pub fn sign_in(&self, identity_id: &str) -> Session {
        let session = Session::new(identity_id, issue_token());
        *self.current.write() = Some(session.clone());
        tprintln!("auth.sign_in identity={}", identity_id);
        let _ = self.events.send(AuthEvent::signed_in(session.clone()));
        session
    }

    pub fn sign_out(&self) {
        *self.current.write() = None;
        let _ = self.events.send(AuthEvent::signed_out());
    }

    /// Swap the token of the current session, keeping the identity.
    pub fn refresh(&self) -> Option<Session> {
        let refreshed = {
            let mut cur = self.current.write();
            let next = cur.as_ref().map(|s| Session { access_token: issue_token(), ..s.clone() });
            *cur = next.clone();
            next
        };
        if let Some(s) = &refreshed {
            let _ = self.events.send(AuthEvent::token_refreshed(s.clone()));
        }
        refreshed
    }

    /// Change the signed-in user's email and announce `USER_UPDATED`.
    pub fn update_email(&self, email: &str) -> Option<Session> {
        let updated = {
            let mut cur = self.current.write();
            let next = cur.as_ref().map(|s| Session { email: Some(email.to_string()), ..s.clone() });
            *cur = next.clone();
            next
        };
        if let Some(s) = &updated {
            let _ = self.events.send(AuthEvent::user_updated(s.clone()));
        }
        updated
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }

    /// Number of `current_session` calls served so far.
    pub fn lookups(&self) -> usize { self.lookups.load(Ordering::SeqCst) }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn current_session(&self) -> anyhow::Result<Option<Session>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(anyhow!("session lookup unavailable"));
        }
        Ok(self.current.read().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
    failures_left: AtomicU32,
    calls: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self { Self::default() }

    pub fn upsert(&self, profile: Profile) {
        self.profiles.write().insert(profile.identity_id.clone(), profile);
    }

    /// Make the next `n` lookups fail with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, identity_id: &str) -> anyhow::Result<Option<Profile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("profile store unreachable"));
        }
        Ok(self.profiles.read().get(identity_id).cloned())
    }
}

/// Router double. `navigate` records the call and moves the location unless frozen.
pub struct MemoryRouter {
    location: watch::Sender<Location>,
    navigations: Mutex<Vec<(String, NavigateOptions)>>,
    frozen: AtomicBool,
}

impl MemoryRouter {
    pub fn new(start: &str) -> Self {
        let (location, _) = watch::channel(Location::parse(start));
        Self { location, navigations: Mutex::new(Vec::new()), frozen: AtomicBool::new(false) }
    }

    /// User-initiated route change (link click, address bar).
    pub fn visit(&self, target: &str) {
        self.location.send_replace(Location::parse(target));
    }

    /// Stop `navigate` from moving the location.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    /// Targets passed to `navigate`, in call order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().iter().map(|(to, _)| to.clone()).collect()
    }

    pub fn navigations_with_options(&self) -> Vec<(String, NavigateOptions)> {
        self.navigations.lock().clone()
    }
}

impl Navigator for MemoryRouter {
    fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Location> {
        self.location.subscribe()
    }

    fn navigate(&self, to: &str, options: NavigateOptions) {
        self.navigations.lock().push((to.to_string(), options));
        if !self.frozen.load(Ordering::SeqCst) {
            self.location.send_replace(Location::parse(to));
        }
    }
}

#[derive(Default)]
pub struct RecordingPrompt {
    offers: Mutex<Vec<(Role, String)>>,
}

impl RecordingPrompt {
    pub fn offers(&self) -> Vec<(Role, String)> {
        self.offers.lock().clone()
    }
}

impl AdminChoiceSink for RecordingPrompt {
    fn offer(&self, role: Role, then: &Navigation) {
        self.offers.lock().push((role, then.to.clone()));
    }
}
