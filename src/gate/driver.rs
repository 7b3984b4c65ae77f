use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::decision::{decide, Decision};
use super::effects::{AdminChoiceSink, Applied, EffectRunner};
use super::retry::RetryPolicy;
use super::state::{GateEvent, GateState, ProfileOutcome, Ticket};
use crate::identity::{AuthEvent, SessionContext};
use crate::providers::{AuthProvider, Navigator, ProfileStore};

enum Command {
    RetryProfile,
    Shutdown,
}

/// Builder for the gate task. Collaborators are injected; nothing is global.
pub struct SessionGate {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    navigator: Arc<dyn Navigator>,
    prompt: Arc<dyn AdminChoiceSink>,
    retry: RetryPolicy,
}

/// Handle to a running gate.
pub struct GateHandle {
    context: watch::Receiver<SessionContext>,
    decision: watch::Receiver<Decision>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl GateHandle {
    /// Latest published snapshot.
    pub fn context(&self) -> SessionContext {
        self.context.borrow().clone()
    }

    /// Decision from the most recent evaluation.
    pub fn decision(&self) -> Decision {
        self.decision.borrow().clone()
    }

    /// Re-run the profile fetch after a terminal failure.
    pub fn retry_profile(&self) {
        let _ = self.commands.send(Command::RetryProfile);
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

impl SessionGate {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        navigator: Arc<dyn Navigator>,
        prompt: Arc<dyn AdminChoiceSink>,
    ) -> Self {
        Self { auth, profiles, navigator, prompt, retry: RetryPolicy::default() }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start the gate on the current tokio runtime.
    pub fn spawn(self) -> GateHandle {
        let (ctx_tx, context) = watch::channel(SessionContext::default());
        let (decision_tx, decision) = watch::channel(Decision::Wait);
        let (commands, cmd_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(ctx_tx, decision_tx, cmd_rx));
        GateHandle { context, decision, commands, task }
    }

    async fn run(
        self,
        ctx_tx: watch::Sender<SessionContext>,
        decision_tx: watch::Sender<Decision>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        // subscribe before the startup lookup so no sign-in can slip between them
        let mut auth_rx = self.auth.subscribe();
        let mut route_rx = self.navigator.subscribe();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<GateEvent>();
        let mut state = GateState::new();
        let mut runner = EffectRunner::new();
        let mut dispatched: Option<Ticket> = None;
        let mut auth_open = true;
        let mut routes_open = true;

        self.lookup_session(event_tx.clone(), false);
        self.evaluate(&state, &mut runner, &ctx_tx, &decision_tx);
        info!(target: "unishorts::gate", "session gate started");

        loop {
            let event = tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::RetryProfile) => GateEvent::RetryProfile,
                    Some(Command::Shutdown) | None => break,
                },
                Some(ev) = event_rx.recv() => ev,
                res = auth_rx.recv(), if auth_open => match res {
                    Ok(ev) => GateEvent::Auth(ev),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(target: "unishorts::gate", "missed {} auth events; resyncing session", missed);
                        self.lookup_session(event_tx.clone(), true);
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        warn!(target: "unishorts::gate", "auth event stream closed");
                        auth_open = false;
                        continue;
                    }
                },
                changed = route_rx.changed(), if routes_open => {
                    if changed.is_err() {
                        routes_open = false;
                        continue;
                    }
                    // the user may have come back to the path we just redirected away from
                    runner.forget();
                    self.evaluate(&state, &mut runner, &ctx_tx, &decision_tx);
                    continue;
                }
            };

            debug!(target: "unishorts::gate", ?event, "gate event");
            state = state.reduce(event);
            if let Some((ticket, identity_id)) = state.pending_fetch() {
                if dispatched != Some(ticket) {
                    dispatched = Some(ticket);
                    self.fetch_profile(ticket, identity_id.to_string(), event_tx.clone());
                }
            }
            self.evaluate(&state, &mut runner, &ctx_tx, &decision_tx);
        }
        info!(target: "unishorts::gate", "session gate stopped");
    }

    fn evaluate(
        &self,
        state: &GateState,
        runner: &mut EffectRunner,
        ctx_tx: &watch::Sender<SessionContext>,
        decision_tx: &watch::Sender<Decision>,
    ) {
        let location = self.navigator.location();
        let decision = decide(state, &location);
        // publish before navigating so observers of the new route see the new context
        decision_tx.send_replace(decision.clone());
        ctx_tx.send_if_modified(|ctx| {
            let next = state.context();
            if *ctx == next { false } else { *ctx = next; true }
        });
        match runner.apply(&location, &decision, self.navigator.as_ref(), self.prompt.as_ref()) {
            Applied::Navigated(nav) => info!(target: "unishorts::gate", from = %location.target(), to = %nav.to, "redirect"),
            Applied::Prompted(nav) => info!(target: "unishorts::gate", from = %location.target(), to = %nav.to, "admin choice offered"),
            Applied::Suppressed => debug!(target: "unishorts::gate", from = %location.target(), "redirect already issued"),
            Applied::Nothing => {}
        }
    }

    fn lookup_session(&self, tx: mpsc::UnboundedSender<GateEvent>, resync: bool) {
        let auth = self.auth.clone();
        tokio::spawn(async move {
            let event = match auth.current_session().await {
                Ok(found) if resync => GateEvent::Auth(AuthEvent::initial(found)),
                Ok(found) => GateEvent::SessionResolved(found),
                Err(e) => {
                    warn!(target: "unishorts::gate", "session lookup failed: {:#}", e);
                    GateEvent::SessionLookupFailed(format!("{:#}", e))
                }
            };
            let _ = tx.send(event);
        });
    }

    fn fetch_profile(&self, ticket: Ticket, identity_id: String, tx: mpsc::UnboundedSender<GateEvent>) {
        let profiles = self.profiles.clone();
        let retry = self.retry;
        debug!(target: "unishorts::gate", ticket = ticket.0, identity = %identity_id, "fetching profile");
        tokio::spawn(async move {
            let result = retry
                .run("profile fetch", |_| {
                    let profiles = profiles.clone();
                    let id = identity_id.clone();
                    async move { profiles.get_profile(&id).await.with_context(|| format!("loading profile {}", id)) }
                })
                .await;
            let outcome = match result {
                Ok(Some(profile)) => ProfileOutcome::Loaded(profile),
                Ok(None) => {
                    warn!(target: "unishorts::gate", identity = %identity_id, "signed-in identity has no profile");
                    ProfileOutcome::Missing
                }
                Err((e, attempts)) => {
                    warn!(target: "unishorts::gate", identity = %identity_id, attempts, "profile fetch gave up: {:#}", e);
                    ProfileOutcome::Failed { message: format!("{:#}", e), attempts }
                }
            };
            let _ = tx.send(GateEvent::ProfileFetched { ticket, identity_id, outcome });
        });
    }
}
