//! Canvas store: load and save the single shared scene.
//!
//! DESIGN
//! ======
//! One scene, one fixed key. `save` writes a complete snapshot through an
//! upsert; `load` reads it back and normalizes view state in one place. A
//! missing row is not an error: it yields the empty scene.
//!
//! ERROR HANDLING
//! ==============
//! Any repository failure, including a stored payload that no longer decodes,
//! is reported as `StorageUnavailable`. Load never falls back to the empty
//! scene on a generic failure, only on "no row". Saves may retry a bounded
//! number of times; the default is a single attempt and callers own any
//! further retry policy.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scene::{SCENE_ID, Scene, SceneDocument};
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::config::SaveRetry;
use crate::services::repository::{RepositoryError, SceneRepository};

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas storage unavailable: {0}")]
    StorageUnavailable(#[from] RepositoryError),
}

pub struct CanvasStore {
    repo: Arc<dyn SceneRepository>,
    scene_id: String,
    retry: SaveRetry,
    /// Latest `updatedAt` this process has issued or observed.
    last_stamp: Mutex<Option<OffsetDateTime>>,
}

impl CanvasStore {
    #[must_use]
    pub fn new(repo: Arc<dyn SceneRepository>, retry: SaveRetry) -> Self {
        Self { repo, scene_id: SCENE_ID.to_owned(), retry, last_stamp: Mutex::new(None) }
    }

    /// Load the scene, or the empty scene if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::StorageUnavailable`] if the repository fails or
    /// the stored payload is malformed.
    pub async fn load(&self) -> Result<Scene, CanvasError> {
        let Some(row) = self.repo.fetch(&self.scene_id).await? else {
            return Ok(Scene::empty());
        };

        let document = SceneDocument::from_value(row.data).map_err(RepositoryError::from)?;
        self.observe_stamp(row.updated_at);
        Ok(document.into_scene(Some(row.updated_at)))
    }

    /// Replace the stored scene with `document`, returning the save timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::StorageUnavailable`] once every configured attempt
    /// has failed.
    pub async fn save(&self, document: SceneDocument) -> Result<OffsetDateTime, CanvasError> {
        let saved_at = self.next_stamp();
        let data = document.to_value();
        let attempts = self.retry.attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.repo.upsert(&self.scene_id, &data, saved_at).await {
                Ok(()) => {
                    info!(
                        scene_id = %self.scene_id,
                        elements = document.elements.len(),
                        files = document.files.len(),
                        %saved_at,
                        "scene saved"
                    );
                    return Ok(saved_at);
                }
                Err(e) if attempt < attempts => {
                    warn!(error = %e, attempt, total = attempts, "scene save failed; retrying");
                    tokio::time::sleep(Duration::from_millis((attempt as u64) * self.retry.base_ms)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(error = %e, attempts, scene_id = %self.scene_id, "scene save failed");
                    return Err(e.into());
                }
            }
        }
    }

    /// Current time, never earlier than any stamp seen before. Truncated to
    /// microseconds so the value survives a `TIMESTAMPTZ` round trip unchanged.
    fn next_stamp(&self) -> OffsetDateTime {
        let now = truncate_to_micros(OffsetDateTime::now_utc());
        let mut last = self.last_stamp.lock().unwrap_or_else(PoisonError::into_inner);
        let stamp = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    fn observe_stamp(&self, seen: OffsetDateTime) {
        let mut last = self.last_stamp.lock().unwrap_or_else(PoisonError::into_inner);
        if last.is_none_or(|prev| seen > prev) {
            *last = Some(seen);
        }
    }
}

fn truncate_to_micros(ts: OffsetDateTime) -> OffsetDateTime {
    ts.replace_nanosecond(ts.nanosecond() / 1_000 * 1_000).unwrap_or(ts)
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
