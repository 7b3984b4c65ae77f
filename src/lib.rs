//! UniShorts session gate and RPC function gateway.
//!
//! - `gate`: the session/authorization state machine deciding route redirects.
//! - `identity`: sessions, profiles and the immutable `SessionContext`.
//! - `providers`: collaborator traits (identity provider, profile store, router).
//! - `functions` + `backend`: stateless RPC handlers and the platform tables they touch.
//! - `server`: axum gateway exposing the functions over HTTP.

pub mod backend;
pub mod config;
pub mod error;
pub mod functions;
pub mod gate;
pub mod identity;
pub mod providers;
pub mod server;

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
