//!
//! UniShorts HTTP gateway
//! ----------------------
//! Axum router exposing the stateless function handlers plus a gate-evaluation
//! endpoint so server-rendered pages can apply the same redirect rules as the
//! client.
//!
//! Responsibilities:
//! - JSON request/response for every function, errors in the shared envelope.
//! - `POST /gate/evaluate`: rebuild a `GateState` from the caller's session and
//!   profile (looked up when omitted) and return the decision.
//! - Graceful shutdown on Ctrl+C / SIGTERM.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use anyhow::Context;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use crate::backend::{Backend, Film, LikeState, MemoryBackend, SessionLogEntry};
use crate::config::Config;
use crate::error::AppResult;
use crate::functions::{self, comments::CommentNode, email::RenderedEmail, pagination::{Page, PageRequest}};
use crate::gate::{decide, Decision, GateEvent, GateState, Location, ProfileOutcome};
use crate::identity::{Profile, Session, SessionContext};
use crate::providers::ProfileStore;

/// Shared state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { backend, profiles }
    }

    /// In-process backend serving both the functions and profile lookups.
    pub fn in_memory(backend: Arc<MemoryBackend>) -> Self {
        Self { backend: backend.clone(), profiles: backend }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "unishorts ok" }))
        .route("/gate/evaluate", post(evaluate_gate))
        .route("/functions/check-username", post(check_username))
        .route("/functions/signup", post(signup))
        .route("/functions/toggle-like", post(toggle_like))
        .route("/functions/increment-view", post(increment_view))
        .route("/functions/log-session", post(log_session))
        .route("/functions/send-email", post(send_email))
        .route("/films", get(list_films))
        .route("/films/{film_id}/comments", get(film_comments))
        .with_state(state)
}

/// Serve on an already-bound listener until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(target: "unishorts::server", "listening on {}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(target: "unishorts::server", "server shut down");
    Ok(())
}

/// Bind per `config` and serve with an in-memory backend.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {}", addr))?;
    serve(listener, AppState::in_memory(Arc::new(MemoryBackend::new()))).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "unishorts::server", "failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!(target: "unishorts::server", "received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                info!(target: "unishorts::server", "received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(target: "unishorts::server", "failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub path: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub decision: Decision,
    pub context: SessionContext,
}

async fn evaluate_gate(State(state): State<AppState>, Json(req): Json<EvaluateRequest>) -> AppResult<Json<EvaluateResponse>> {
    let mut gate = GateState::new().reduce(GateEvent::SessionResolved(req.session.clone()));
    let pending = gate.pending_fetch().map(|(ticket, id)| (ticket, id.to_string()));
    if let Some((ticket, identity_id)) = pending {
        let outcome = match req.profile {
            Some(p) => ProfileOutcome::Loaded(p),
            None => match state.profiles.get_profile(&identity_id).await? {
                Some(p) => ProfileOutcome::Loaded(p),
                None => ProfileOutcome::Missing,
            },
        };
        gate = gate.reduce(GateEvent::ProfileFetched { ticket, identity_id, outcome });
    }
    let location = Location::new(req.path, req.query);
    let decision = decide(&gate, &location);
    Ok(Json(EvaluateResponse { decision, context: gate.context() }))
}

async fn check_username(State(state): State<AppState>, Json(req): Json<functions::UsernameRequest>) -> AppResult<Json<functions::UsernameCheck>> {
    Ok(Json(functions::check_username(state.backend.as_ref(), req).await?))
}

async fn signup(State(state): State<AppState>, Json(req): Json<functions::SignupRequest>) -> AppResult<Json<Profile>> {
    Ok(Json(functions::signup(state.backend.as_ref(), req).await?))
}

async fn toggle_like(State(state): State<AppState>, Json(req): Json<functions::LikeRequest>) -> AppResult<Json<LikeState>> {
    Ok(Json(functions::toggle_like(state.backend.as_ref(), req).await?))
}

async fn increment_view(State(state): State<AppState>, Json(req): Json<functions::ViewRequest>) -> AppResult<Json<functions::ViewCount>> {
    Ok(Json(functions::increment_view(state.backend.as_ref(), req).await?))
}

async fn log_session(State(state): State<AppState>, Json(req): Json<functions::SessionLogRequest>) -> AppResult<Json<SessionLogEntry>> {
    Ok(Json(functions::log_session(state.backend.as_ref(), req).await?))
}

async fn send_email(Json(req): Json<functions::EmailRequest>) -> AppResult<Json<RenderedEmail>> {
    Ok(Json(functions::send_email(req)?))
}

async fn list_films(State(state): State<AppState>, Query(page): Query<PageRequest>) -> AppResult<Json<Page<Film>>> {
    Ok(Json(functions::list_films(state.backend.as_ref(), page).await?))
}

async fn film_comments(State(state): State<AppState>, Path(film_id): Path<String>) -> AppResult<Json<Vec<CommentNode>>> {
    Ok(Json(functions::film_comments(state.backend.as_ref(), &film_id).await?))
}
