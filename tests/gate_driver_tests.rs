//! Session gate driver over in-memory collaborators.
//! Exercises the async wiring: startup lookup, auth events, route changes,
//! profile retry and the published SessionContext.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};

use unishorts::gate::{Decision, GateHandle, RetryPolicy, SessionGate};
use unishorts::identity::{AccountStatus, Profile, ProfileFailure, Role, Session};
use unishorts::providers::memory::{MemoryAuthProvider, MemoryProfileStore, MemoryRouter, RecordingPrompt};
use unishorts::providers::Navigator;

struct Harness {
    auth: Arc<MemoryAuthProvider>,
    profiles: Arc<MemoryProfileStore>,
    router: Arc<MemoryRouter>,
    prompt: Arc<RecordingPrompt>,
    gate: GateHandle,
}

fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(2), Duration::from_millis(5))
}

fn start(initial: Option<Session>, path: &str, profiles: MemoryProfileStore, retry: RetryPolicy) -> Harness {
    let auth = Arc::new(MemoryAuthProvider::new(initial));
    let profiles = Arc::new(profiles);
    let router = Arc::new(MemoryRouter::new(path));
    let prompt = Arc::new(RecordingPrompt::default());
    let gate = SessionGate::new(auth.clone(), profiles.clone(), router.clone(), prompt.clone())
        .with_retry(retry)
        .spawn();
    Harness { auth, profiles, router, prompt, gate }
}

async fn wait_for<F: Fn() -> bool>(what: &str, cond: F) -> Result<()> {
    for _ in 0..400 {
        if cond() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    bail!("timed out waiting for {}", what)
}

#[tokio::test]
async fn anonymous_visitor_on_protected_route_is_sent_to_login() -> Result<()> {
    let h = start(None, "/upload", MemoryProfileStore::new(), fast_retry(1));
    wait_for("login redirect", || h.router.location().path == "/login").await?;
    assert_eq!(h.router.navigations(), vec!["/login?redirectTo=/upload".to_string()]);
    assert!(h.router.navigations_with_options()[0].1.replace);
    assert!(!h.gate.context().is_loading);
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn sign_out_on_dashboard_redirects_immediately() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("u1", Role::User, AccountStatus::Active));
    let h = start(Some(Session::new("u1", "tok")), "/dashboard", store, fast_retry(1));
    wait_for("profile loaded", || h.gate.context().profile.is_some()).await?;
    assert!(h.router.navigations().is_empty());

    h.auth.sign_out();
    wait_for("login redirect", || h.router.location().path == "/login").await?;
    assert_eq!(h.router.navigations(), vec!["/login?redirectTo=/dashboard".to_string()]);
    assert!(h.gate.context().session.is_none());
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn pending_user_lands_on_pending_page_and_stays() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("u1", Role::User, AccountStatus::PendingAdminApproval));
    let h = start(None, "/", store, fast_retry(1));
    h.auth.sign_in("u1");
    wait_for("pending redirect", || h.router.location().path == "/pending-approval").await?;
    // user tries to wander off; gate pulls them back
    h.router.visit("/favorites");
    wait_for("second pending redirect", || h.router.navigations().len() == 2).await?;
    wait_for("back on pending page", || h.router.location().path == "/pending-approval").await?;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.router.navigations(), vec!["/pending-approval".to_string(), "/pending-approval".to_string()]);
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn admin_signing_in_from_login_is_offered_the_choice() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("boss", Role::Admin, AccountStatus::Active));
    let h = start(None, "/login", store, fast_retry(1));
    h.auth.sign_in("boss");
    wait_for("admin prompt", || !h.prompt.offers().is_empty()).await?;
    assert_eq!(h.prompt.offers(), vec![(Role::Admin, "/".to_string())]);
    wait_for("home", || h.router.location().path == "/").await?;
    assert_eq!(h.router.navigations(), vec!["/".to_string()]);
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn transient_profile_failures_are_retried() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("u1", Role::User, AccountStatus::Active));
    store.fail_next(2);
    let h = start(Some(Session::new("u1", "tok")), "/settings", store, fast_retry(3));
    wait_for("profile loaded", || h.gate.context().profile.is_some()).await?;
    assert_eq!(h.profiles.calls(), 3);
    assert_eq!(h.gate.decision(), Decision::Stay);
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn exhausted_retries_surface_an_error_and_can_be_retried() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("u1", Role::User, AccountStatus::Active));
    store.fail_next(2);
    let h = start(Some(Session::new("u1", "tok")), "/dashboard", store, fast_retry(2));
    wait_for("error state", || h.gate.context().error.is_some()).await?;
    let ctx = h.gate.context();
    assert!(!ctx.is_loading);
    assert!(matches!(ctx.error, Some(ProfileFailure::FetchFailed { attempts: 2, .. })));
    assert!(h.router.navigations().is_empty(), "no redirect while the profile is unavailable");

    h.gate.retry_profile();
    wait_for("profile after manual retry", || h.gate.context().profile.is_some()).await?;
    assert!(h.gate.context().error.is_none());
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn missing_profile_is_reported_without_retrying() -> Result<()> {
    let h = start(Some(Session::new("ghost", "tok")), "/", MemoryProfileStore::new(), fast_retry(3));
    wait_for("missing profile", || h.gate.context().error.is_some()).await?;
    assert_eq!(h.gate.context().error, Some(ProfileFailure::ProfileMissing));
    assert_eq!(h.profiles.calls(), 1);
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn token_refresh_does_not_refetch_profile() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("u1", Role::User, AccountStatus::Active));
    let h = start(None, "/", store, fast_retry(1));
    let first = h.auth.sign_in("u1");
    wait_for("profile loaded", || h.gate.context().profile.is_some()).await?;
    let refreshed = h.auth.refresh().expect("signed in");
    wait_for("new token published", || {
        h.gate.context().session.map(|s| s.access_token) == Some(refreshed.access_token.clone())
    }).await?;
    assert_ne!(first.access_token, refreshed.access_token);
    assert_eq!(h.profiles.calls(), 1);
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn failed_session_lookup_falls_back_to_anonymous() -> Result<()> {
    let auth = Arc::new(MemoryAuthProvider::new(None));
    auth.fail_lookups(true);
    let router = Arc::new(MemoryRouter::new("/admin"));
    let gate = SessionGate::new(auth, Arc::new(MemoryProfileStore::new()), router.clone(), Arc::new(RecordingPrompt::default())).spawn();
    wait_for("login redirect", || router.location().path == "/login").await?;
    assert_eq!(router.location().redirect_to().as_deref(), Some("/admin"));
    gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn lagging_behind_auth_events_resyncs_from_the_provider() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("u1", Role::User, AccountStatus::Active));
    store.upsert(Profile::new("u2", Role::User, AccountStatus::Active));
    let h = start(None, "/", store, fast_retry(1));
    wait_for("startup lookup", || !h.gate.context().is_loading).await?;
    assert_eq!(h.auth.lookups(), 1);

    // more events than the broadcast buffer holds, with no await in between
    for i in 0..100 {
        h.auth.sign_in(if i % 2 == 0 { "u1" } else { "u2" });
    }
    wait_for("resync lookup", || h.auth.lookups() == 2).await?;
    wait_for("settled on latest identity", || {
        h.gate.context().profile.map(|p| p.identity_id) == Some("u2".to_string())
    }).await?;
    assert_eq!(h.gate.context().identity.as_deref(), Some("u2"));
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn user_updated_swaps_session_without_refetching() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("u1", Role::User, AccountStatus::Active));
    let h = start(Some(Session::new("u1", "tok")), "/settings", store, fast_retry(1));
    wait_for("profile loaded", || h.gate.context().profile.is_some()).await?;

    h.auth.update_email("ana@uni.edu").expect("signed in");
    wait_for("email published", || {
        h.gate.context().session.and_then(|s| s.email) == Some("ana@uni.edu".to_string())
    }).await?;
    assert_eq!(h.profiles.calls(), 1);
    assert!(h.gate.context().profile.is_some());
    assert!(h.router.navigations().is_empty());
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn slow_profile_for_previous_identity_is_discarded() -> Result<()> {
    let store = MemoryProfileStore::new();
    store.upsert(Profile::new("u1", Role::Admin, AccountStatus::Active));
    store.upsert(Profile::new("u2", Role::User, AccountStatus::PendingAdminApproval));
    store.set_latency(Some(Duration::from_millis(80)));
    let h = start(None, "/", store, fast_retry(1));
    wait_for("startup lookup", || !h.gate.context().is_loading).await?;

    h.auth.sign_in("u1");
    wait_for("u1 fetch started", || h.profiles.calls() == 1).await?;
    h.profiles.set_latency(None);
    h.auth.sign_in("u2");
    wait_for("u2 profile", || h.gate.context().profile.map(|p| p.identity_id) == Some("u2".to_string())).await?;

    // let the slow u1 response land
    tokio::time::sleep(Duration::from_millis(150)).await;
    let ctx = h.gate.context();
    assert_eq!(ctx.identity.as_deref(), Some("u2"));
    assert_eq!(ctx.profile.map(|p| p.role), Some(Role::User));
    assert_eq!(h.profiles.calls(), 2);
    assert_eq!(h.router.location().path, "/pending-approval");
    h.gate.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn returning_to_a_guarded_path_is_redirected_again() -> Result<()> {
    let h = start(None, "/dashboard", MemoryProfileStore::new(), fast_retry(1));
    // the redirect is recorded but the location never moves
    h.router.freeze();
    wait_for("first redirect", || h.router.navigations().len() == 1).await?;

    h.router.visit("/dashboard");
    wait_for("second redirect", || h.router.navigations().len() == 2).await?;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.router.navigations(), vec!["/login?redirectTo=/dashboard".to_string(); 2]);
    h.gate.shutdown().await;
    Ok(())
}
