//! Client-side sign-in throttling.
//!
//! Rejects attempts that follow the previous one too closely and locks
//! sign-in for a cooldown after too many attempts in one window.

mod config;
mod service;

pub use config::SignInPolicy;
pub use service::SignInThrottle;
