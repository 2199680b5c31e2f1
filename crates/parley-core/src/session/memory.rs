//! In-process session store.
//!
//! `InMemorySessionStore` keeps sessions in a `DashMap` keyed by conversation
//! id. Find-or-create goes through the map's entry API, which holds the shard
//! lock for that key, so concurrent first turns cannot both insert.
//! Values are cloned on read so no `DashMap` guard is ever held across an
//! `.await`.

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parley_types::error::StoreError;
use parley_types::session::Session;

use super::store::SessionStore;

/// Session store backed by a concurrent hash map.
///
/// Cloning produces a shared view of the same sessions (backed by `Arc`).
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    inner: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    async fn create(&self, conversation_id: &str) -> Result<Session, StoreError> {
        match self.inner.entry(conversation_id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(conversation_id.to_string())),
            Entry::Vacant(slot) => {
                let session = Session::new(conversation_id, Utc::now());
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn find_by_id(&self, conversation_id: &str) -> Result<Session, StoreError> {
        self.inner
            .get(conversation_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))
    }

    async fn find_or_create_by_id(&self, conversation_id: &str) -> Result<Session, StoreError> {
        let session = self
            .inner
            .entry(conversation_id.to_string())
            .or_insert_with(|| Session::new(conversation_id, Utc::now()))
            .value()
            .clone();
        Ok(session)
    }

    async fn save(&self, session: &Session) -> Result<Session, StoreError> {
        let Some(mut stored) = self.inner.get_mut(session.conversation_id()) else {
            return Err(StoreError::NotFound(session.conversation_id().to_string()));
        };

        let mut refreshed = session.clone();
        refreshed.created_at = stored.created_at;
        refreshed.touch(Utc::now());
        *stored = refreshed.clone();
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_find() {
        let store = InMemorySessionStore::new();
        let created = store.create("conv-1").await.unwrap();
        assert_eq!(created.message_count, 0);
        assert_eq!(created.consecutive_not_understand(), 0);

        let found = store.find_by_id("conv-1").await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn create_existing_conflicts() {
        let store = InMemorySessionStore::new();
        store.create("conv-1").await.unwrap();
        let err = store.create("conv-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(err.is_persistence());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn find_missing_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store.find_by_id("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let store = InMemorySessionStore::new();
        let first = store.find_or_create_by_id("conv-1").await.unwrap();
        let second = store.find_or_create_by_id("conv-1").await.unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_find_or_create_creates_one_record() {
        let store = InMemorySessionStore::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.find_or_create_by_id("race").await.unwrap()
            }));
        }

        let mut created_at = Vec::new();
        for handle in handles {
            created_at.push(handle.await.unwrap().created_at);
        }

        assert_eq!(store.len(), 1);
        created_at.dedup();
        assert_eq!(created_at.len(), 1, "every caller saw the same record");
    }

    #[tokio::test]
    async fn save_persists_and_keeps_created_at() {
        let store = InMemorySessionStore::new();
        let session = store.create("conv-1").await.unwrap();

        let mut edited = session.clone();
        edited.message_count = 3;
        edited.set_consecutive_not_understand(5);
        edited.created_at = session.created_at + chrono::Duration::days(1);

        let saved = store.save(&edited).await.unwrap();
        assert_eq!(saved.message_count, 3);
        assert_eq!(saved.consecutive_not_understand(), 2);
        assert_eq!(saved.created_at, session.created_at);
        assert!(saved.updated_at >= saved.created_at);

        let found = store.find_by_id("conv-1").await.unwrap();
        assert_eq!(found, saved);
    }

    #[tokio::test]
    async fn save_unknown_session_fails_without_inserting() {
        let store = InMemorySessionStore::new();
        let orphan = Session::new("ghost", Utc::now());
        let err = store.save(&orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.is_empty());
    }
}
