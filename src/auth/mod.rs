//! Verification, abuse guarding and request extractors.

pub mod guard;
pub mod middleware;
pub mod verify;

pub use guard::{AbuseGuard, GuardPolicy, Penalty};
pub use middleware::{AppState, ClientKey, ReloadSecret};
pub use verify::{authenticate, constant_time_eq, Rejection};
