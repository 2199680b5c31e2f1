//! Turn dispatcher owning the middleware registry.
//!
//! For every inbound message the dispatcher resolves the conversation's
//! session, resets and increments its counters, persists it, and only then
//! runs the middleware chain. With persistence disabled it goes straight to
//! the chain.
//!
//! Turns for the same conversation are serialized: each holds a
//! per-conversation lock from session resolution until its chain resolves,
//! so no increment or in-chain save is lost to an overlapping turn. Turns
//! for different conversations run freely.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parley_types::config::BotConfig;
use parley_types::error::ConfigError;
use parley_types::message::InboundMessage;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::context::TurnContext;
use super::error::DispatchError;
use super::middleware::{Middleware, MiddlewareDyn, Next};
use crate::nlu::BoxNluClient;
use crate::session::BoxSessionStore;

/// Where a turn is in its lifecycle. Used as a structured log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    SessionResolving,
    SessionUpdating,
    SessionPersisting,
    MiddlewareRunning,
    Done,
    Failed,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::Idle => write!(f, "idle"),
            TurnPhase::SessionResolving => write!(f, "session_resolving"),
            TurnPhase::SessionUpdating => write!(f, "session_updating"),
            TurnPhase::SessionPersisting => write!(f, "session_persisting"),
            TurnPhase::MiddlewareRunning => write!(f, "middleware_running"),
            TurnPhase::Done => write!(f, "done"),
            TurnPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Runs each inbound message through session tracking and the middleware chain.
///
/// Register middlewares up front with [`use_middleware`](Self::use_middleware),
/// then share the dispatcher (e.g. behind an `Arc`) across concurrent turns.
pub struct TurnDispatcher {
    config: Arc<BotConfig>,
    nlu: BoxNluClient,
    store: Option<BoxSessionStore>,
    middlewares: Vec<Arc<dyn MiddlewareDyn>>,
    /// One lock per conversation with a turn in flight or queued.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TurnDispatcher {
    /// Create a dispatcher.
    ///
    /// A store must be supplied exactly when the configuration enables
    /// persistence; any mismatch is a configuration error.
    pub fn new(
        config: Arc<BotConfig>,
        nlu: BoxNluClient,
        store: Option<BoxSessionStore>,
    ) -> Result<Self, ConfigError> {
        match (config.persistence_enabled(), store.is_some()) {
            (true, false) => Err(ConfigError::Invalid {
                field: "persistence",
                reason: "persistence is enabled but no session store was supplied".to_string(),
            }),
            (false, true) => Err(ConfigError::Invalid {
                field: "persistence",
                reason: "a session store was supplied but persistence is not configured"
                    .to_string(),
            }),
            _ => Ok(Self {
                config,
                nlu,
                store,
                middlewares: Vec::new(),
                turn_locks: DashMap::new(),
            }),
        }
    }

    /// Append a middleware. Runs in registration order; no de-duplication.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        debug!(middleware = %Middleware::name(&middleware), position = self.middlewares.len(), "registered middleware");
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn middleware_names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn persistence_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Option<&BoxSessionStore> {
        self.store.as_ref()
    }

    pub fn nlu(&self) -> &BoxNluClient {
        &self.nlu
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Handle one inbound message.
    ///
    /// Returns the finished context (queued replies, final session) once the
    /// chain resolves, whether it ran to the end or short-circuited.
    pub async fn on_message(&self, message: InboundMessage) -> Result<TurnContext, DispatchError> {
        if self.store.is_none() {
            return self.run_turn(message).await;
        }

        let conversation_id = message.conversation_id.clone();
        let guard = self.lock_conversation(&conversation_id).await;
        let result = self.run_turn(message).await;
        drop(guard);
        self.release_conversation(&conversation_id);
        result
    }

    /// Wait for any other turn on this conversation to finish.
    async fn lock_conversation(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .turn_locks
            .entry(conversation_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drop the conversation's lock entry once no turn holds or awaits it.
    fn release_conversation(&self, conversation_id: &str) {
        self.turn_locks
            .remove_if(conversation_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn run_turn(&self, message: InboundMessage) -> Result<TurnContext, DispatchError> {
        let conversation_id = message.conversation_id.clone();
        debug!(%conversation_id, phase = %TurnPhase::Idle, "turn received");

        let mut ctx = TurnContext::new(
            message,
            self.nlu.clone(),
            Arc::clone(&self.config),
            self.store.clone(),
        );

        if let Some(store) = &self.store {
            debug!(%conversation_id, phase = %TurnPhase::SessionResolving);
            let mut session = store
                .find_or_create_by_id(&conversation_id)
                .await
                .map_err(|source| self.persistence_failure(&conversation_id, source))?;

            debug!(%conversation_id, phase = %TurnPhase::SessionUpdating);
            let previous = session.consecutive_not_understand();
            session.set_consecutive_not_understand(0);
            session.message_count += 1;

            debug!(%conversation_id, phase = %TurnPhase::SessionPersisting);
            let session = store
                .save(&session)
                .await
                .map_err(|source| self.persistence_failure(&conversation_id, source))?;

            info!(
                %conversation_id,
                message_count = session.message_count,
                previous_not_understand = previous,
                "session updated"
            );
            ctx.attach_session(session, previous);
        }

        debug!(
            %conversation_id,
            phase = %TurnPhase::MiddlewareRunning,
            middlewares = self.middlewares.len()
        );
        if let Err(err) = Next::new(&self.middlewares).run(&mut ctx).await {
            warn!(
                %conversation_id,
                phase = %TurnPhase::Failed,
                middleware = %err.middleware,
                error = %err,
                "middleware chain failed"
            );
            return Err(err.into());
        }

        debug!(%conversation_id, phase = %TurnPhase::Done, replies = ctx.replies().len());
        Ok(ctx)
    }

    fn persistence_failure(
        &self,
        conversation_id: &str,
        source: parley_types::error::StoreError,
    ) -> DispatchError {
        warn!(
            %conversation_id,
            phase = %TurnPhase::Failed,
            error = %source,
            "session persistence failed, middleware chain skipped"
        );
        DispatchError::Persistence {
            conversation_id: conversation_id.to_string(),
            source,
        }
    }
}

impl fmt::Debug for TurnDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnDispatcher")
            .field("persistence_enabled", &self.persistence_enabled())
            .field("middlewares", &self.middleware_names())
            .finish()
    }
}
