//! Session/authorization gate.
//!
//! The gate reconciles three independent signals (current session, current
//! profile, current route) into a single navigation decision:
//! - `routes` classifies paths (pure, session independent).
//! - `state` holds the tagged-union `GateState` and its pure reducer.
//! - `decision` maps `(state, location)` to a `Decision`.
//! - `effects` turns decisions into navigator/prompt calls, without repeats.
//! - `driver` wires the collaborators together on a tokio task.

pub mod routes;
mod location;
mod state;
mod decision;
mod effects;
mod retry;
mod driver;

pub use location::Location;
pub use state::{GateState, GateEvent, Phase, ProfileOutcome, Ticket};
pub use decision::{decide, Decision, Navigation};
pub use effects::{AdminChoiceSink, Applied, EffectRunner};
pub use retry::RetryPolicy;
pub use driver::{GateHandle, SessionGate};
pub use routes::{classify, RouteClass};
