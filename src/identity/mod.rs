//! Identity types shared by the session gate and the function handlers.
//! Keep the public surface thin and split implementation across sub-modules.

mod session;
mod profile;
mod context;

pub use session::{Session, SessionToken, AuthEvent, AuthEventKind, issue_token};
pub use profile::{Profile, Role, AccountStatus, ProfileFailure};
pub use context::SessionContext;
