//! SQLite session store.
//!
//! Implements `SessionStore` from `parley-core` with raw sqlx queries and a
//! private row type. Reads use the reader pool; writes run in a transaction
//! on the single-connection writer pool.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parley_core::session::SessionStore;
use parley_types::error::StoreError;
use parley_types::session::Session;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionStore`.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    conversation_id: String,
    consecutive_not_understand: i64,
    message_count: i64,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            conversation_id: row.try_get("conversation_id")?,
            consecutive_not_understand: row.try_get("consecutive_not_understand")?,
            message_count: row.try_get("message_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<Session, StoreError> {
        let message_count = u64::try_from(self.message_count).map_err(|_| {
            StoreError::Persistence(format!("negative message_count: {}", self.message_count))
        })?;
        Ok(Session::restore(
            self.conversation_id,
            self.consecutive_not_understand,
            message_count,
            parse_datetime(&self.created_at)?,
            parse_datetime(&self.updated_at)?,
        ))
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Persistence(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 at microsecond precision so stored timestamps
/// round-trip exactly and sort as text.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_error(e: sqlx::Error) -> StoreError {
    StoreError::Persistence(e.to_string())
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<Session, StoreError> {
    SessionRow::from_row(row)
        .map_err(query_error)?
        .into_session()
}

// ---------------------------------------------------------------------------
// SessionStore implementation
// ---------------------------------------------------------------------------

impl SessionStore for SqliteSessionStore {
    async fn create(&self, conversation_id: &str) -> Result<Session, StoreError> {
        let now = format_datetime(&Utc::now());
        sqlx::query(
            r#"INSERT INTO sessions (conversation_id, consecutive_not_understand, message_count, created_at, updated_at)
               VALUES (?, 0, 0, ?, ?)"#,
        )
        .bind(conversation_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                StoreError::Conflict(conversation_id.to_string())
            }
            _ => query_error(e),
        })?;

        // Re-read so the caller sees exactly what was stored.
        self.read_from(&self.pool.writer, conversation_id).await
    }

    async fn find_by_id(&self, conversation_id: &str) -> Result<Session, StoreError> {
        self.read_from(&self.pool.reader, conversation_id).await
    }

    async fn find_or_create_by_id(&self, conversation_id: &str) -> Result<Session, StoreError> {
        let now = format_datetime(&Utc::now());
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        sqlx::query(
            r#"INSERT INTO sessions (conversation_id, consecutive_not_understand, message_count, created_at, updated_at)
               VALUES (?, 0, 0, ?, ?)
               ON CONFLICT (conversation_id) DO NOTHING"#,
        )
        .bind(conversation_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        let row = sqlx::query("SELECT * FROM sessions WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;
        map_row(&row)
    }

    async fn save(&self, session: &Session) -> Result<Session, StoreError> {
        let conversation_id = session.conversation_id();
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let created_at: Option<String> =
            sqlx::query_scalar("SELECT created_at FROM sessions WHERE conversation_id = ?")
                .bind(conversation_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(query_error)?;
        let Some(created_at) = created_at else {
            return Err(StoreError::NotFound(conversation_id.to_string()));
        };

        let mut refreshed = session.clone();
        refreshed.created_at = parse_datetime(&created_at)?;
        refreshed.touch(Utc::now().trunc_subsecs(6));

        let message_count = i64::try_from(refreshed.message_count).map_err(|_| {
            StoreError::Persistence(format!(
                "message_count {} out of range",
                refreshed.message_count
            ))
        })?;

        sqlx::query(
            r#"UPDATE sessions
               SET consecutive_not_understand = ?, message_count = ?, updated_at = ?
               WHERE conversation_id = ?"#,
        )
        .bind(i64::from(refreshed.consecutive_not_understand()))
        .bind(message_count)
        .bind(format_datetime(&refreshed.updated_at))
        .bind(conversation_id)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;
        Ok(refreshed)
    }
}

impl SqliteSessionStore {
    async fn read_from(
        &self,
        pool: &sqlx::SqlitePool,
        conversation_id: &str,
    ) -> Result<Session, StoreError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_optional(pool)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => map_row(&row),
            None => Err(StoreError::NotFound(conversation_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn test_store() -> (SqliteSessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(&dir.path().join("sessions.db"))
            .await
            .unwrap();
        (SqliteSessionStore::new(pool), dir)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (store, _dir) = test_store().await;

        let created = store.create("conv-1").await.unwrap();
        assert_eq!(created.conversation_id(), "conv-1");
        assert_eq!(created.message_count, 0);
        assert_eq!(created.consecutive_not_understand(), 0);
        assert_eq!(created.created_at, created.updated_at);

        let found = store.find_by_id("conv-1").await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let (store, _dir) = test_store().await;
        store.create("conv-1").await.unwrap();

        let err = store.create("conv-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(id) if id == "conv-1"));
    }

    #[tokio::test]
    async fn test_find_missing() {
        let (store, _dir) = test_store().await;
        let err = store.find_by_id("ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!err.is_persistence());
    }

    #[tokio::test]
    async fn test_find_or_create_returns_existing() {
        let (store, _dir) = test_store().await;

        let first = store.find_or_create_by_id("conv-1").await.unwrap();
        let mut changed = first.clone();
        changed.message_count = 7;
        store.save(&changed).await.unwrap();

        let again = store.find_or_create_by_id("conv-1").await.unwrap();
        assert_eq!(again.message_count, 7);
        assert_eq!(again.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_save_round_trips_and_keeps_created_at() {
        let (store, _dir) = test_store().await;
        let created = store.create("conv-1").await.unwrap();

        let mut session = created.clone();
        session.set_consecutive_not_understand(5);
        session.message_count = 3;
        session.created_at = Utc::now() + chrono::Duration::days(1);
        let saved = store.save(&session).await.unwrap();

        assert_eq!(saved.consecutive_not_understand(), 2);
        assert_eq!(saved.created_at, created.created_at);
        assert!(saved.updated_at >= saved.created_at);

        let found = store.find_by_id("conv-1").await.unwrap();
        assert_eq!(found, saved);
    }

    #[tokio::test]
    async fn test_save_unknown_session() {
        let (store, _dir) = test_store().await;
        let orphan = Session::new("nobody", Utc::now());
        let err = store.save(&orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_find_or_create_inserts_once() {
        let (store, _dir) = test_store().await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.find_or_create_by_id("race").await
            }));
        }

        let mut created = Vec::new();
        for handle in handles {
            created.push(handle.await.unwrap().unwrap().created_at);
        }
        assert!(created.windows(2).all(|w| w[0] == w[1]));

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE conversation_id = 'race'")
                .fetch_one(&store.pool.reader)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_sessions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");
        {
            let store = SqliteSessionStore::new(DatabasePool::open(&path).await.unwrap());
            let mut session = store.find_or_create_by_id("conv-1").await.unwrap();
            session.message_count = 4;
            store.save(&session).await.unwrap();
        }

        let store = SqliteSessionStore::new(DatabasePool::open(&path).await.unwrap());
        let found = store.find_by_id("conv-1").await.unwrap();
        assert_eq!(found.message_count, 4);
    }
}
