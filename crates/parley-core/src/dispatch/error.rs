use parley_types::error::StoreError;
use thiserror::Error;

/// A failure raised by a middleware, attributed to the middleware that
/// raised it.
#[derive(Debug, Error)]
#[error("middleware '{middleware}' failed: {source}")]
pub struct MiddlewareError {
    pub middleware: String,
    #[source]
    pub source: anyhow::Error,
}

impl MiddlewareError {
    /// The store failure behind this error, when a middleware's own save
    /// failed.
    pub fn store_error(&self) -> Option<&StoreError> {
        self.source.downcast_ref::<StoreError>()
    }
}

/// Why a turn failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Resolving or persisting the session failed before the chain ran.
    #[error("session persistence failed for '{conversation_id}': {source}")]
    Persistence {
        conversation_id: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Middleware(#[from] MiddlewareError),
}
