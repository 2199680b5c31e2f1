//! Per-turn context shared by reference along the middleware chain.
//!
//! A `TurnContext` is built fresh for every inbound message and owned by
//! that turn alone. It carries the message, the NLU handle, the active
//! configuration, and (when persistence is on) the resolved session plus the
//! snapshot of the not-understood counter taken before the dispatcher reset it.

use std::sync::Arc;

use parley_types::config::BotConfig;
use parley_types::error::StoreError;
use parley_types::message::InboundMessage;
use parley_types::session::Session;

use crate::nlu::BoxNluClient;
use crate::session::BoxSessionStore;

/// State for one turn, handed to each middleware as `&mut`.
#[derive(Debug)]
pub struct TurnContext {
    message: InboundMessage,
    nlu: BoxNluClient,
    config: Arc<BotConfig>,
    store: Option<BoxSessionStore>,
    session: Option<Session>,
    previous_not_understand: Option<u8>,
    replies: Vec<String>,
}

impl TurnContext {
    pub(crate) fn new(
        message: InboundMessage,
        nlu: BoxNluClient,
        config: Arc<BotConfig>,
        store: Option<BoxSessionStore>,
    ) -> Self {
        Self {
            message,
            nlu,
            config,
            store,
            session: None,
            previous_not_understand: None,
            replies: Vec::new(),
        }
    }

    pub(crate) fn attach_session(&mut self, session: Session, previous_not_understand: u8) {
        self.session = Some(session);
        self.previous_not_understand = Some(previous_not_understand);
    }

    /// The inbound message for this turn.
    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    pub fn nlu(&self) -> &BoxNluClient {
        &self.nlu
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// The conversation's session; `None` when persistence is disabled.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Not-understood counter as stored before this turn reset it to 0.
    ///
    /// `None` when persistence is disabled.
    pub fn previous_not_understand(&self) -> Option<u8> {
        self.previous_not_understand
    }

    /// Queue a reply for the transport to send back.
    pub fn reply(&mut self, text: impl Into<String>) {
        self.replies.push(text.into());
    }

    pub fn replies(&self) -> &[String] {
        &self.replies
    }

    pub fn into_replies(self) -> Vec<String> {
        self.replies
    }

    /// Persist the session as currently modified by this turn.
    ///
    /// On success the context holds the refreshed session. On failure it keeps
    /// the unsaved values. A no-op when persistence is disabled.
    pub async fn save_session(&mut self) -> Result<(), StoreError> {
        let (Some(store), Some(session)) = (&self.store, &self.session) else {
            return Ok(());
        };
        let saved = store.save(session).await?;
        self.session = Some(saved);
        Ok(())
    }
}
