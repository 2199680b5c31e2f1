//! HTTP layer for Parley.
//!
//! Axum router under `/api/v1/` with the envelope response format.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
