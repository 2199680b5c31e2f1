//! Turn dispatch and session tracking for Parley.
//!
//! This crate defines the ports (`SessionStore`, `NluClient`) that the
//! infrastructure layer implements, plus the turn dispatcher and middleware
//! chain. It depends only on `parley-types` -- never on `parley-infra` or any
//! database/IO crate.

pub mod dispatch;
pub mod middleware;
pub mod nlu;
pub mod session;
