//! Redirect rule table: pure `decide` over reduced gate states.
//! No tasks, no router; every case builds its state from events.

use unishorts::gate::{decide, Decision, GateEvent, GateState, Location, Navigation, ProfileOutcome};
use unishorts::identity::{AccountStatus, AuthEvent, Profile, Role, Session};

const PROTECTED: &[&str] = &["/settings", "/dashboard", "/upload", "/favorites", "/admin", "/admin/reports", "/film/17/edit"];

fn anonymous() -> GateState {
    GateState::new().reduce(GateEvent::SessionResolved(None))
}

fn with_profile(role: Role, status: AccountStatus) -> GateState {
    let s = GateState::new().reduce(GateEvent::SessionResolved(Some(Session::new("u1", "tok"))));
    let (ticket, id) = s.pending_fetch().expect("profile requested");
    let id = id.to_string();
    s.reduce(GateEvent::ProfileFetched {
        ticket,
        identity_id: id.clone(),
        outcome: ProfileOutcome::Loaded(Profile::new(id, role, status)),
    })
}

fn at(target: &str) -> Location {
    Location::parse(target)
}

#[test]
fn anonymous_on_protected_goes_to_login_with_redirect() {
    let state = anonymous();
    for p in PROTECTED {
        let d = decide(&state, &at(p));
        assert_eq!(d, Decision::Redirect(Navigation::replace(format!("/login?redirectTo={}", p))), "{p}");
    }
}

#[test]
fn anonymous_browsing_elsewhere_is_allowed() {
    let state = anonymous();
    for p in ["/", "/films", "/film/17", "/login", "/register", "/pending-approval", "/rejected"] {
        assert_eq!(decide(&state, &at(p)), Decision::Stay, "{p}");
    }
}

#[test]
fn pending_approval_redirects_once_then_fixed_point() {
    let state = with_profile(Role::User, AccountStatus::PendingAdminApproval);
    for p in ["/", "/dashboard", "/login", "/rejected", "/film/3"] {
        let d = decide(&state, &at(p));
        assert_eq!(d, Decision::Redirect(Navigation::replace("/pending-approval")), "{p}");
        // after following the redirect nothing else happens
        let next = at(&d.navigation().unwrap().to);
        assert_eq!(decide(&state, &next), Decision::Stay);
    }
}

#[test]
fn rejected_takes_precedence_over_public_only() {
    let state = with_profile(Role::Admin, AccountStatus::Rejected);
    assert_eq!(decide(&state, &at("/login")), Decision::Redirect(Navigation::replace("/rejected")));
    assert_eq!(decide(&state, &at("/rejected")), Decision::Stay);

    let disabled = with_profile(Role::User, AccountStatus::Disabled);
    assert_eq!(decide(&disabled, &at("/upload")), Decision::Redirect(Navigation::replace("/rejected")));
    let banned = with_profile(Role::User, AccountStatus::Banned);
    assert_eq!(decide(&banned, &at("/")), Decision::Redirect(Navigation::replace("/rejected")));
}

#[test]
fn active_admin_on_login_gets_choice_then_home() {
    let state = with_profile(Role::Admin, AccountStatus::Active);
    let d = decide(&state, &at("/login"));
    assert_eq!(d, Decision::AdminChoice { role: Role::Admin, then: Navigation::replace("/") });
}

#[test]
fn active_user_on_login_follows_redirect_to() {
    let state = with_profile(Role::User, AccountStatus::Active);
    let d = decide(&state, &at("/login?redirectTo=/film/9/edit"));
    assert_eq!(d, Decision::Redirect(Navigation::replace("/film/9/edit")));
}

#[test]
fn evaluation_is_deterministic() {
    for state in [anonymous(), with_profile(Role::User, AccountStatus::Active), with_profile(Role::Admin, AccountStatus::PendingAdminApproval)] {
        for p in ["/", "/login", "/dashboard", "/pending-approval"] {
            assert_eq!(decide(&state, &at(p)), decide(&state.clone(), &at(p)));
        }
    }
}

#[test]
fn signed_in_without_profile_waits_on_protected_routes() {
    let s = GateState::new().reduce(GateEvent::Auth(AuthEvent::signed_in(Session::new("u1", "t"))));
    assert_eq!(decide(&s, &at("/dashboard")), Decision::Wait);
    assert!(s.context().is_loading);
}

#[test]
fn missing_profile_never_redirects_into_the_app() {
    let s = GateState::new().reduce(GateEvent::SessionResolved(Some(Session::new("u1", "t"))));
    let (ticket, _) = s.pending_fetch().unwrap();
    let s = s.reduce(GateEvent::ProfileFetched { ticket, identity_id: "u1".into(), outcome: ProfileOutcome::Missing });
    for p in ["/login", "/dashboard", "/"] {
        let d = decide(&s, &at(p));
        assert!(matches!(d, Decision::Unavailable { .. }), "{p}: {d:?}");
        assert!(d.navigation().is_none());
    }
}

#[test]
fn sign_out_on_dashboard_redirects_to_login() {
    let active = with_profile(Role::User, AccountStatus::Active);
    assert_eq!(decide(&active, &at("/dashboard")), Decision::Stay);
    let out = active.reduce(GateEvent::Auth(AuthEvent::signed_out()));
    assert_eq!(decide(&out, &at("/dashboard")), Decision::Redirect(Navigation::replace("/login?redirectTo=/dashboard")));
}
