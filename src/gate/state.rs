use serde::Serialize;

use crate::identity::{AuthEvent, AuthEventKind, Profile, ProfileFailure, Session, SessionContext};

/// Tag attached to every profile fetch so late responses can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Initial session lookup in flight.
    Loading,
    Anonymous,
    AwaitingProfile { session: Session, ticket: Ticket },
    PendingApproval { session: Session, profile: Profile },
    Rejected { session: Session, profile: Profile },
    Active { session: Session, profile: Profile },
    /// Signed in, but no usable profile. Terminal until retried.
    Unavailable { session: Session, failure: ProfileFailure },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    Loaded(Profile),
    Missing,
    Failed { message: String, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Result of the one-shot `current_session` lookup at startup.
    SessionResolved(Option<Session>),
    SessionLookupFailed(String),
    Auth(AuthEvent),
    ProfileFetched { ticket: Ticket, identity_id: String, outcome: ProfileOutcome },
    /// Profile pushed by another part of the app, e.g. after an approval.
    ProfileChanged(Profile),
    RetryProfile,
}

/// Gate state: current phase plus the last ticket handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateState {
    phase: Phase,
    issued: u64,
}

impl Default for GateState {
    fn default() -> Self { Self::new() }
}

impl GateState {
    pub fn new() -> Self { Self { phase: Phase::Loading, issued: 0 } }

    pub fn phase(&self) -> &Phase { &self.phase }

    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Loading | Phase::Anonymous => None,
            Phase::AwaitingProfile { session, .. }
            | Phase::PendingApproval { session, .. }
            | Phase::Rejected { session, .. }
            | Phase::Active { session, .. }
            | Phase::Unavailable { session, .. } => Some(session),
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.phase {
            Phase::PendingApproval { profile, .. } | Phase::Rejected { profile, .. } | Phase::Active { profile, .. } => Some(profile),
            _ => None,
        }
    }

    /// Ticket and identity of the profile fetch this state is waiting on.
    pub fn pending_fetch(&self) -> Option<(Ticket, &str)> {
        match &self.phase {
            Phase::AwaitingProfile { session, ticket } => Some((*ticket, session.identity_id.as_str())),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading | Phase::AwaitingProfile { .. })
    }

    pub fn context(&self) -> SessionContext {
        let session = self.session().cloned();
        SessionContext {
            identity: session.as_ref().map(|s| s.identity_id.clone()),
            session,
            profile: self.profile().cloned(),
            is_loading: self.is_loading(),
            error: match &self.phase {
                Phase::Unavailable { failure, .. } => Some(failure.clone()),
                _ => None,
            },
        }
    }

    /// Pure transition function. Never performs I/O.
    pub fn reduce(self, event: GateEvent) -> GateState {
        match event {
            GateEvent::SessionResolved(found) => {
                // a provider event may already have superseded the startup lookup
                if !matches!(self.phase, Phase::Loading) { return self; }
                match found {
                    Some(session) => self.await_profile(session),
                    None => self.with_phase(Phase::Anonymous),
                }
            }
            GateEvent::SessionLookupFailed(_) => {
                if matches!(self.phase, Phase::Loading) { self.with_phase(Phase::Anonymous) } else { self }
            }
            GateEvent::Auth(ev) => match (ev.kind, ev.session) {
                (AuthEventKind::SignedOut, _) | (_, None) => self.with_phase(Phase::Anonymous),
                (kind, Some(session)) => self.adopt_session(kind, session),
            },
            GateEvent::ProfileFetched { ticket, identity_id, outcome } => {
                let awaited = match &self.phase {
                    Phase::AwaitingProfile { session, ticket: t } if *t == ticket && session.identity_id == identity_id => Some(session.clone()),
                    _ => None,
                };
                let Some(session) = awaited else { return self; };
                match outcome {
                    ProfileOutcome::Loaded(profile) if profile.identity_id == session.identity_id => self.settle(session, profile),
                    ProfileOutcome::Loaded(_) | ProfileOutcome::Missing => {
                        self.with_phase(Phase::Unavailable { session, failure: ProfileFailure::ProfileMissing })
                    }
                    ProfileOutcome::Failed { message, attempts } => {
                        self.with_phase(Phase::Unavailable { session, failure: ProfileFailure::FetchFailed { message, attempts } })
                    }
                }
            }
            GateEvent::ProfileChanged(profile) => {
                let session = match self.session() {
                    Some(s) if s.identity_id == profile.identity_id => s.clone(),
                    _ => return self,
                };
                self.settle(session, profile)
            }
            GateEvent::RetryProfile => match self.phase {
                Phase::Unavailable { session, .. } => GateState { phase: Phase::Loading, issued: self.issued }.await_profile(session),
                _ => self,
            },
        }
    }

    fn with_phase(self, phase: Phase) -> GateState {
        GateState { phase, issued: self.issued }
    }

    fn await_profile(self, session: Session) -> GateState {
        let ticket = Ticket(self.issued + 1);
        GateState { phase: Phase::AwaitingProfile { session, ticket }, issued: ticket.0 }
    }

    fn adopt_session(self, kind: AuthEventKind, session: Session) -> GateState {
        let same_identity = self.session().map(|s| s.identity_id == session.identity_id).unwrap_or(false);
        if !same_identity {
            return self.await_profile(session);
        }
        let issued = self.issued;
        let phase = match self.phase {
            // a fresh sign-in is the natural retry point after a failed profile load
            Phase::Unavailable { .. } if kind == AuthEventKind::SignedIn => {
                return GateState { phase: Phase::Loading, issued }.await_profile(session);
            }
            Phase::AwaitingProfile { ticket, .. } => Phase::AwaitingProfile { session, ticket },
            Phase::PendingApproval { profile, .. } => Phase::PendingApproval { session, profile },
            Phase::Rejected { profile, .. } => Phase::Rejected { session, profile },
            Phase::Active { profile, .. } => Phase::Active { session, profile },
            Phase::Unavailable { failure, .. } => Phase::Unavailable { session, failure },
            Phase::Loading | Phase::Anonymous => return GateState { phase: Phase::Loading, issued }.await_profile(session),
        };
        GateState { phase, issued }
    }

    fn settle(self, session: Session, profile: Profile) -> GateState {
        let status = profile.account_status;
        let phase = if status.is_blocked() {
            Phase::Rejected { session, profile }
        } else if status.is_pending() {
            Phase::PendingApproval { session, profile }
        } else {
            Phase::Active { session, profile }
        };
        self.with_phase(phase)
    }
}
