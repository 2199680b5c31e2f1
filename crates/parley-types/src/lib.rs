//! Shared domain types for Parley.
//!
//! Sessions, inbound NLU messages, configuration, and the error types shared
//! by every layer.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror, secrecy.

pub mod config;
pub mod error;
pub mod message;
pub mod session;
