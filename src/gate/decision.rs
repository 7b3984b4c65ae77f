use serde::Serialize;

use super::location::Location;
use super::routes::{self, RouteClass, HOME_PATH, PENDING_APPROVAL_PATH, REJECTED_PATH};
use super::state::{GateState, Phase};
use crate::identity::{ProfileFailure, Role};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Navigation {
    pub to: String,
    pub replace: bool,
}

impl Navigation {
    pub fn replace(to: impl Into<String>) -> Self { Self { to: to.into(), replace: true } }
}

/// Outcome of one gate evaluation. At most one navigation per decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Signals still loading; decide later.
    Wait,
    /// Current route is allowed as is.
    Stay,
    Redirect(Navigation),
    /// Staff landing on login/register: offer the admin area, then navigate.
    AdminChoice { role: Role, then: Navigation },
    /// Signed in without a usable profile. Never redirects into the app.
    Unavailable { failure: ProfileFailure },
}

impl Decision {
    pub fn navigation(&self) -> Option<&Navigation> {
        match self {
            Decision::Redirect(nav) | Decision::AdminChoice { then: nav, .. } => Some(nav),
            _ => None,
        }
    }
}

/// Evaluate the redirect rules for `state` at `location`; first match wins.
pub fn decide(state: &GateState, location: &Location) -> Decision {
    let path = routes::normalize(&location.path);
    let class = routes::classify(&path);
    match state.phase() {
        Phase::Loading | Phase::AwaitingProfile { .. } => Decision::Wait,
        Phase::Anonymous => {
            if class == RouteClass::Protected {
                Decision::Redirect(Navigation::replace(routes::login_redirect(&path)))
            } else {
                Decision::Stay
            }
        }
        Phase::Unavailable { failure, .. } => Decision::Unavailable { failure: failure.clone() },
        Phase::PendingApproval { .. } => redirect_unless_at(&path, PENDING_APPROVAL_PATH),
        Phase::Rejected { .. } => redirect_unless_at(&path, REJECTED_PATH),
        Phase::Active { profile, .. } => match class {
            RouteClass::SpecialAccess => Decision::Redirect(Navigation::replace(HOME_PATH)),
            RouteClass::PublicOnly => {
                let then = Navigation::replace(post_login_target(location));
                if profile.role.is_staff() {
                    Decision::AdminChoice { role: profile.role, then }
                } else {
                    Decision::Redirect(then)
                }
            }
            RouteClass::Protected | RouteClass::Open => Decision::Stay,
        },
    }
}

fn redirect_unless_at(path: &str, target: &str) -> Decision {
    if path == target { Decision::Stay } else { Decision::Redirect(Navigation::replace(target)) }
}

/// Where an active user goes after leaving login/register.
/// Only local absolute targets are honoured, and never another
/// public-only or status page, so the redirect cannot bounce back.
fn post_login_target(location: &Location) -> String {
    let Some(raw) = location.redirect_to() else { return HOME_PATH.to_string(); };
    // browsers drop tab/CR/LF from URLs, so "/\t/host" would turn protocol-relative
    let local = raw.starts_with('/')
        && !raw.starts_with("//")
        && !raw.chars().any(|c| c == '\\' || c.is_control() || c.is_whitespace());
    if !local {
        return HOME_PATH.to_string();
    }
    match routes::classify(&Location::parse(&raw).path) {
        RouteClass::Protected | RouteClass::Open => raw,
        RouteClass::PublicOnly | RouteClass::SpecialAccess => HOME_PATH.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::state::{GateEvent, ProfileOutcome};
    use crate::identity::{AccountStatus, Profile, Session};

    fn active(role: Role) -> GateState {
        let s = GateState::new().reduce(GateEvent::SessionResolved(Some(Session::new("u1", "t"))));
        let (ticket, _) = s.pending_fetch().unwrap();
        s.reduce(GateEvent::ProfileFetched {
            ticket,
            identity_id: "u1".into(),
            outcome: ProfileOutcome::Loaded(Profile::new("u1", role, AccountStatus::Active)),
        })
    }

    #[test]
    fn redirect_to_is_honoured_for_local_targets() {
        let d = decide(&active(Role::User), &Location::parse("/login?redirectTo=%2Fupload"));
        assert_eq!(d, Decision::Redirect(Navigation::replace("/upload")));
    }

    #[test]
    fn foreign_or_looping_redirect_targets_fall_back_home() {
        for q in [
            "redirectTo=https://evil.example", "redirectTo=//evil.example", "redirectTo=/login", "redirectTo=/rejected", "redirectTo=%5Cfoo",
            "redirectTo=%2F%09%2Fevil.example", "redirectTo=/%0A/evil.example", "redirectTo=/%0D/evil.example", "redirectTo=/%20/evil.example",
        ] {
            let d = decide(&active(Role::User), &Location::new("/register", q));
            assert_eq!(d, Decision::Redirect(Navigation::replace("/")), "{q}");
        }
    }

    #[test]
    fn moderators_get_the_choice_too() {
        let d = decide(&active(Role::Moderator), &Location::parse("/register"));
        assert_eq!(d, Decision::AdminChoice { role: Role::Moderator, then: Navigation::replace("/") });
        let d = decide(&active(Role::Reviewer), &Location::parse("/register"));
        assert_eq!(d, Decision::Redirect(Navigation::replace("/")));
    }

    #[test]
    fn active_users_leave_status_pages() {
        let d = decide(&active(Role::User), &Location::parse("/pending-approval"));
        assert_eq!(d, Decision::Redirect(Navigation::replace("/")));
        assert_eq!(decide(&active(Role::User), &Location::parse("/dashboard")), Decision::Stay);
    }

    #[test]
    fn loading_waits_everywhere() {
        assert_eq!(decide(&GateState::new(), &Location::parse("/admin")), Decision::Wait);
    }
}
