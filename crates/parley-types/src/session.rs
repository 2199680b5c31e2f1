//! Per-conversation session state.
//!
//! A `Session` accumulates the counters Parley tracks across the turns of one
//! conversation. The not-understood counter is clamped on every write, so every
//! code path that touches it (dispatcher, middleware, store) shares the same
//! bound.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Upper bound for [`Session::consecutive_not_understand`].
pub const MAX_CONSECUTIVE_NOT_UNDERSTAND: u8 = 2;

/// Accumulated state for one conversation.
///
/// `conversation_id` is fixed at construction. `consecutive_not_understand`
/// is private so writes always go through the clamping setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    conversation_id: String,
    consecutive_not_understand: u8,
    /// Number of turns processed for this conversation.
    pub message_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A brand-new session: zero counters, both timestamps set to `now`.
    pub fn new(conversation_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            consecutive_not_understand: 0,
            message_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a session from stored values.
    ///
    /// The counter is clamped and `updated_at` is raised to `created_at` if a
    /// backend ever hands back an out-of-order pair.
    pub fn restore(
        conversation_id: impl Into<String>,
        consecutive_not_understand: i64,
        message_count: u64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut session = Self {
            conversation_id: conversation_id.into(),
            consecutive_not_understand: 0,
            message_count,
            created_at,
            updated_at: updated_at.max(created_at),
        };
        session.set_consecutive_not_understand(consecutive_not_understand);
        session
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// How many consecutive turns the bot failed to understand, in `0..=2`.
    pub fn consecutive_not_understand(&self) -> u8 {
        self.consecutive_not_understand
    }

    /// Assign the not-understood counter, clamped into `0..=2`.
    pub fn set_consecutive_not_understand(&mut self, value: i64) {
        self.consecutive_not_understand =
            value.clamp(0, i64::from(MAX_CONSECUTIVE_NOT_UNDERSTAND)) as u8;
    }

    /// Stamp `updated_at` for a persist at `now`, never moving it before
    /// `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}
