//! SessionStore trait definition.
//!
//! The four operations the dispatcher needs from a durable session backend.
//! Follows the same RPITIT pattern as the other ports in this crate.

use parley_types::error::StoreError;
use parley_types::session::Session;

/// Port for per-conversation session persistence.
///
/// Implementations live in parley-infra (`SqliteSessionStore`) or in this
/// crate (`InMemorySessionStore`). Uses native async fn in traits (RPITIT,
/// Rust 2024 edition).
pub trait SessionStore: Send + Sync {
    /// Create a fresh session for `conversation_id`.
    ///
    /// Fails with [`StoreError::Conflict`] if a record already exists.
    fn create(
        &self,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<Session, StoreError>> + Send;

    /// Load the session for `conversation_id`, or [`StoreError::NotFound`].
    fn find_by_id(
        &self,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<Session, StoreError>> + Send;

    /// Load the session for `conversation_id`, creating it if absent.
    ///
    /// Must be atomic per id: concurrent first turns for the same
    /// conversation observe one shared record.
    fn find_or_create_by_id(
        &self,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<Session, StoreError>> + Send;

    /// Persist the session's current values and return the refreshed copy
    /// with a new `updated_at`.
    ///
    /// `created_at` is never overwritten. The caller's value is untouched, so
    /// a failed save leaves no partial update behind.
    fn save(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<Session, StoreError>> + Send;
}
