//! Stateless RPC handlers ("edge functions").
//!
//! Each handler validates its request, makes one or two backend calls and
//! maps failures onto `AppError`. None of them keep state between calls.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::backend::{Backend, Film, Inserted, LikeState, SessionLogEntry};
use crate::error::{AppError, AppResult};
use crate::identity::{AccountStatus, Profile, Role};

pub mod comments;
pub mod device;
pub mod email;
pub mod pagination;
pub mod username;

use comments::CommentNode;
use email::{EmailTemplate, RenderedEmail};
use pagination::{Page, PageInfo, PageRequest};

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameCheck {
    pub username: String,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub identity_id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub film_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub film_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCount {
    pub view_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct SessionLogRequest {
    pub user_id: String,
    pub user_agent: String,
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub template: EmailTemplate,
    pub to: String,
    #[serde(default)]
    pub vars: HashMap<String, String>,
}

fn required<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    let v = value.trim();
    if v.is_empty() {
        Err(AppError::user("missing_field", format!("{} is required", field)))
    } else {
        Ok(v)
    }
}

pub async fn check_username(backend: &dyn Backend, req: UsernameRequest) -> AppResult<UsernameCheck> {
    let username = username::normalize_username(&req.username)?;
    let taken = backend.username_taken(&username).await?;
    Ok(UsernameCheck { username, available: !taken })
}

/// Create the profile row for a freshly registered identity.
/// New accounts start unverified with the plain `user` role.
pub async fn signup(backend: &dyn Backend, req: SignupRequest) -> AppResult<Profile> {
    let identity_id = required("identity_id", &req.identity_id)?;
    let email = required("email", &req.email)?;
    if !email.contains('@') {
        return Err(AppError::user("invalid_email", format!("not an email address: {:?}", email)));
    }
    let username = username::normalize_username(&req.username)?;
    let profile = Profile::new(identity_id, Role::User, AccountStatus::PendingEmailVerification).with_username(username.clone());
    match backend.insert_profile(profile.clone()).await? {
        Inserted::Created => {
            info!(target: "unishorts::functions", identity = %identity_id, username = %username, "profile created");
            Ok(profile)
        }
        Inserted::IdentityExists => Err(AppError::conflict("already_registered", format!("identity {} already has a profile", identity_id))),
        Inserted::UsernameTaken => Err(AppError::conflict("username_taken", format!("username {} is taken", username))),
    }
}

pub async fn toggle_like(backend: &dyn Backend, req: LikeRequest) -> AppResult<LikeState> {
    let film_id = required("film_id", &req.film_id)?;
    let user_id = required("user_id", &req.user_id)?;
    backend
        .toggle_like(film_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("film_not_found", format!("no film {}", film_id)))
}

pub async fn increment_view(backend: &dyn Backend, req: ViewRequest) -> AppResult<ViewCount> {
    let film_id = required("film_id", &req.film_id)?;
    let view_count = backend
        .increment_views(film_id)
        .await?
        .ok_or_else(|| AppError::not_found("film_not_found", format!("no film {}", film_id)))?;
    Ok(ViewCount { view_count })
}

pub async fn log_session(backend: &dyn Backend, req: SessionLogRequest) -> AppResult<SessionLogEntry> {
    let user_id = required("user_id", &req.user_id)?;
    let entry = SessionLogEntry {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        ip: req.ip.filter(|ip| !ip.trim().is_empty()),
        device: device::parse_user_agent(&req.user_agent),
        user_agent: req.user_agent,
        logged_at: Utc::now(),
    };
    backend.record_session(entry.clone()).await?;
    info!(
        target: "unishorts::functions",
        user = %entry.user_id, device = ?entry.device.device_type, os = %entry.device.os, browser = %entry.device.browser,
        "session logged"
    );
    Ok(entry)
}

pub fn send_email(req: EmailRequest) -> AppResult<RenderedEmail> {
    let rendered = email::render(req.template, &req.to, &req.vars)?;
    info!(target: "unishorts::functions", template = ?req.template, to = %rendered.to, "email rendered");
    Ok(rendered)
}

pub async fn film_comments(backend: &dyn Backend, film_id: &str) -> AppResult<Vec<CommentNode>> {
    let flat = backend
        .comments_for(film_id)
        .await?
        .ok_or_else(|| AppError::not_found("film_not_found", format!("no film {}", film_id)))?;
    Ok(comments::build_tree(flat))
}

pub async fn list_films(backend: &dyn Backend, req: PageRequest) -> AppResult<Page<Film>> {
    let req = req.clamped();
    let (items, total) = backend.list_films(req.offset(), req.per_page).await?;
    Ok(Page { items, info: PageInfo::new(req, total) })
}
