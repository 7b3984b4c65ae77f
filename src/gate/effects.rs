use super::decision::{Decision, Navigation};
use super::location::Location;
use crate::identity::Role;
use crate::providers::{NavigateOptions, Navigator};

/// Receives the admin-choice prompt raised for staff on login/register.
pub trait AdminChoiceSink: Send + Sync {
    fn offer(&self, role: Role, then: &Navigation);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Nothing,
    Navigated(Navigation),
    Prompted(Navigation),
    /// Same navigation already issued from this location.
    Suppressed,
}

/// Executes decisions against the router. Remembers the last navigation so a
/// re-evaluation before the router has moved does not navigate twice.
#[derive(Debug, Default)]
pub struct EffectRunner {
    last: Option<(String, Navigation)>,
}

impl EffectRunner {
    pub fn new() -> Self { Self::default() }

    /// Drop the remembered navigation; the next redirect is issued even if it
    /// repeats the previous one. Called whenever the router reports a move.
    pub fn forget(&mut self) {
        self.last = None;
    }

    pub fn apply(&mut self, location: &Location, decision: &Decision, navigator: &dyn Navigator, prompt: &dyn AdminChoiceSink) -> Applied {
        let Some(nav) = decision.navigation() else {
            self.last = None;
            return Applied::Nothing;
        };
        let from = location.target();
        if let Some((prev_from, prev_nav)) = &self.last {
            if *prev_from == from && prev_nav == nav {
                return Applied::Suppressed;
            }
        }
        self.last = Some((from, nav.clone()));
        if let Decision::AdminChoice { role, then } = decision {
            prompt.offer(*role, then);
            navigator.navigate(&then.to, NavigateOptions { replace: then.replace });
            return Applied::Prompted(then.clone());
        }
        navigator.navigate(&nav.to, NavigateOptions { replace: nav.replace });
        Applied::Navigated(nav.clone())
    }
}
