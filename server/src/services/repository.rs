//! Scene repositories: where the one scene row actually lives.
//!
//! DESIGN
//! ======
//! `SceneRepository` is the seam between the canvas store and storage. The
//! Postgres implementation is used in production; the in-memory one backs
//! tests and database-less local runs. Both replace the whole row on write
//! and take no locks beyond what a single statement needs, so concurrent
//! writers resolve as last-write-wins.

use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde_json::Value;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// A scene row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredScene {
    pub data: Value,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored scene is malformed: {0}")]
    Malformed(#[from] scene::SceneError),
    #[cfg(test)]
    #[error("scene storage is offline")]
    Offline,
}

#[async_trait::async_trait]
pub trait SceneRepository: Send + Sync {
    /// Fetch a row. `Ok(None)` means the row does not exist yet.
    async fn fetch(&self, id: &str) -> Result<Option<StoredScene>, RepositoryError>;

    /// Insert or fully replace a row.
    async fn upsert(&self, id: &str, data: &Value, updated_at: OffsetDateTime) -> Result<(), RepositoryError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgSceneRepository {
    pool: PgPool,
}

impl PgSceneRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SceneRepository for PgSceneRepository {
    async fn fetch(&self, id: &str) -> Result<Option<StoredScene>, RepositoryError> {
        let row = sqlx::query("SELECT data, updated_at FROM drawings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StoredScene { data: row.try_get("data")?, updated_at: row.try_get("updated_at")? }))
    }

    async fn upsert(&self, id: &str, data: &Value, updated_at: OffsetDateTime) -> Result<(), RepositoryError> {
        sqlx::query(
            r"INSERT INTO drawings (id, data, updated_at)
              VALUES ($1, $2, $3)
              ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at",
        )
        .bind(id)
        .bind(data)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local repository. Contents are lost on restart.
#[derive(Default)]
pub struct MemorySceneRepository {
    rows: RwLock<HashMap<String, StoredScene>>,
    #[cfg(test)]
    offline: AtomicBool,
    #[cfg(test)]
    writes: AtomicUsize,
}

impl MemorySceneRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`RepositoryError::Offline`] until reset.
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check_online(&self) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::SeqCst) { Err(RepositoryError::Offline) } else { Ok(()) }
    }

    /// Successful upserts so far.
    #[cfg(test)]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seed a raw row, bypassing the write counter.
    #[cfg(test)]
    pub async fn seed(&self, id: &str, data: Value, updated_at: OffsetDateTime) {
        self.rows
            .write()
            .await
            .insert(id.to_owned(), StoredScene { data, updated_at });
    }
}

#[async_trait::async_trait]
impl SceneRepository for MemorySceneRepository {
    async fn fetch(&self, id: &str) -> Result<Option<StoredScene>, RepositoryError> {
        #[cfg(test)]
        self.check_online()?;
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn upsert(&self, id: &str, data: &Value, updated_at: OffsetDateTime) -> Result<(), RepositoryError> {
        #[cfg(test)]
        self.check_online()?;
        self.rows
            .write()
            .await
            .insert(id.to_owned(), StoredScene { data: data.clone(), updated_at });
        #[cfg(test)]
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[path = "repository_test.rs"]
mod tests;
