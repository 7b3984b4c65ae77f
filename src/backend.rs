//! Platform tables as seen by the function handlers.
//!
//! The hosted platform owns persistence; `Backend` is the narrow slice the
//! functions call into. `MemoryBackend` keeps everything in process for local
//! runs and tests, and also serves as the gate's `ProfileStore` so signups are
//! visible to route evaluation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::functions::comments::Comment;
use crate::functions::device::DeviceInfo;
use crate::identity::Profile;
use crate::providers::ProfileStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Film {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub id: Uuid,
    pub user_id: String,
    #[serde(default)]
    pub ip: Option<String>,
    pub user_agent: String,
    pub device: DeviceInfo,
    pub logged_at: DateTime<Utc>,
}

/// Result of inserting a profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Created,
    IdentityExists,
    UsernameTaken,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn username_taken(&self, username: &str) -> anyhow::Result<bool>;
    async fn insert_profile(&self, profile: Profile) -> anyhow::Result<Inserted>;
    /// `None` when the film does not exist.
    async fn toggle_like(&self, film_id: &str, user_id: &str) -> anyhow::Result<Option<LikeState>>;
    async fn increment_views(&self, film_id: &str) -> anyhow::Result<Option<u64>>;
    async fn record_session(&self, entry: SessionLogEntry) -> anyhow::Result<()>;
    async fn comments_for(&self, film_id: &str) -> anyhow::Result<Option<Vec<Comment>>>;
    /// Films newest first, plus the total count.
    async fn list_films(&self, offset: usize, limit: usize) -> anyhow::Result<(Vec<Film>, usize)>;
}

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    films: HashMap<String, Film>,
    likes: HashSet<(String, String)>,
    comments: Vec<Comment>,
    sessions: Vec<SessionLogEntry>,
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }

    pub fn insert_film(&self, film: Film) {
        self.tables.write().films.insert(film.id.clone(), film);
    }

    pub fn insert_comment(&self, comment: Comment) {
        self.tables.write().comments.push(comment);
    }

    pub fn upsert_profile(&self, profile: Profile) {
        self.tables.write().profiles.insert(profile.identity_id.clone(), profile);
    }

    pub fn film(&self, id: &str) -> Option<Film> {
        self.tables.read().films.get(id).cloned()
    }

    pub fn session_logs(&self) -> Vec<SessionLogEntry> {
        self.tables.read().sessions.clone()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn username_taken(&self, username: &str) -> anyhow::Result<bool> {
        let t = self.tables.read();
        Ok(t.profiles.values().any(|p| p.username.as_deref() == Some(username)))
    }

    async fn insert_profile(&self, profile: Profile) -> anyhow::Result<Inserted> {
        let mut t = self.tables.write();
        if t.profiles.contains_key(&profile.identity_id) {
            return Ok(Inserted::IdentityExists);
        }
        if profile.username.is_some() && t.profiles.values().any(|p| p.username == profile.username) {
            return Ok(Inserted::UsernameTaken);
        }
        t.profiles.insert(profile.identity_id.clone(), profile);
        Ok(Inserted::Created)
    }

    async fn toggle_like(&self, film_id: &str, user_id: &str) -> anyhow::Result<Option<LikeState>> {
        let mut guard = self.tables.write();
        let t = &mut *guard;
        let Some(film) = t.films.get_mut(film_id) else { return Ok(None); };
        let key = (film_id.to_string(), user_id.to_string());
        let liked = if t.likes.remove(&key) {
            film.like_count = film.like_count.saturating_sub(1);
            false
        } else {
            t.likes.insert(key);
            film.like_count += 1;
            true
        };
        Ok(Some(LikeState { liked, like_count: film.like_count }))
    }

    async fn increment_views(&self, film_id: &str) -> anyhow::Result<Option<u64>> {
        let mut t = self.tables.write();
        Ok(t.films.get_mut(film_id).map(|f| {
            f.view_count += 1;
            f.view_count
        }))
    }

    async fn record_session(&self, entry: SessionLogEntry) -> anyhow::Result<()> {
        self.tables.write().sessions.push(entry);
        Ok(())
    }

    async fn comments_for(&self, film_id: &str) -> anyhow::Result<Option<Vec<Comment>>> {
        let t = self.tables.read();
        if !t.films.contains_key(film_id) {
            return Ok(None);
        }
        Ok(Some(t.comments.iter().filter(|c| c.film_id == film_id).cloned().collect()))
    }

    async fn list_films(&self, offset: usize, limit: usize) -> anyhow::Result<(Vec<Film>, usize)> {
        let t = self.tables.read();
        let mut films: Vec<&Film> = t.films.values().collect();
        films.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let total = films.len();
        Ok((films.into_iter().skip(offset).take(limit).cloned().collect(), total))
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn get_profile(&self, identity_id: &str) -> anyhow::Result<Option<Profile>> {
        Ok(self.tables.read().profiles.get(identity_id).cloned())
    }
}
