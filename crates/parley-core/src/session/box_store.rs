//! BoxSessionStore -- object-safe dynamic dispatch wrapper for SessionStore.
//!
//! 1. Define an object-safe `SessionStoreDyn` trait with boxed futures
//! 2. Blanket-impl `SessionStoreDyn` for all `T: SessionStore`
//! 3. `BoxSessionStore` wraps `Arc<dyn SessionStoreDyn>` and delegates

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parley_types::error::StoreError;
use parley_types::session::Session;

use super::store::SessionStore;

type StoreFuture<'a> = Pin<Box<dyn Future<Output = Result<Session, StoreError>> + Send + 'a>>;

/// Object-safe version of [`SessionStore`] with boxed futures.
///
/// A blanket implementation is provided for all types implementing `SessionStore`.
pub trait SessionStoreDyn: Send + Sync {
    fn create_boxed<'a>(&'a self, conversation_id: &'a str) -> StoreFuture<'a>;

    fn find_by_id_boxed<'a>(&'a self, conversation_id: &'a str) -> StoreFuture<'a>;

    fn find_or_create_by_id_boxed<'a>(&'a self, conversation_id: &'a str) -> StoreFuture<'a>;

    fn save_boxed<'a>(&'a self, session: &'a Session) -> StoreFuture<'a>;
}

impl<T: SessionStore> SessionStoreDyn for T {
    fn create_boxed<'a>(&'a self, conversation_id: &'a str) -> StoreFuture<'a> {
        Box::pin(self.create(conversation_id))
    }

    fn find_by_id_boxed<'a>(&'a self, conversation_id: &'a str) -> StoreFuture<'a> {
        Box::pin(self.find_by_id(conversation_id))
    }

    fn find_or_create_by_id_boxed<'a>(&'a self, conversation_id: &'a str) -> StoreFuture<'a> {
        Box::pin(self.find_or_create_by_id(conversation_id))
    }

    fn save_boxed<'a>(&'a self, session: &'a Session) -> StoreFuture<'a> {
        Box::pin(self.save(session))
    }
}

/// Type-erased session store for runtime backend selection.
///
/// `SessionStore` uses RPITIT and cannot be a trait object directly.
/// Cloning is cheap and shares the same backend, so the dispatcher and every
/// turn context can hold one.
#[derive(Clone)]
pub struct BoxSessionStore {
    inner: Arc<dyn SessionStoreDyn>,
}

impl BoxSessionStore {
    /// Wrap a concrete `SessionStore` in a type-erased handle.
    pub fn new<T: SessionStore + 'static>(store: T) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    pub async fn create(&self, conversation_id: &str) -> Result<Session, StoreError> {
        self.inner.create_boxed(conversation_id).await
    }

    pub async fn find_by_id(&self, conversation_id: &str) -> Result<Session, StoreError> {
        self.inner.find_by_id_boxed(conversation_id).await
    }

    pub async fn find_or_create_by_id(&self, conversation_id: &str) -> Result<Session, StoreError> {
        self.inner.find_or_create_by_id_boxed(conversation_id).await
    }

    pub async fn save(&self, session: &Session) -> Result<Session, StoreError> {
        self.inner.save_boxed(session).await
    }
}

impl std::fmt::Debug for BoxSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxSessionStore").finish_non_exhaustive()
    }
}
