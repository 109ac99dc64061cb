//! Client sync state and input-file snapshots.
//!
//! DESIGN
//! ======
//! `SyncStatus` is the observable client phase:
//! `Unauthenticated → Loading → Ready ⇄ Saving`. Saves never block editing, so
//! several can be in flight at once; `Saving` carries the count and drops back
//! to `Ready` when the last one finishes. Each save holds a `SaveGuard`, which
//! releases its slot on drop even if the save task panics.

use std::path::PathBuf;
use std::sync::Arc;

use scene::SceneDocument;
use serde_json::Value;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unauthenticated,
    Loading,
    Ready,
    Saving { in_flight: usize },
}

/// Shared, observable client phase. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    tx: Arc<watch::Sender<Phase>>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Phase::Unauthenticated);
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.tx.subscribe()
    }

    /// Session confirmed; the scene is being fetched.
    pub fn begin_loading(&self) {
        self.tx.send_replace(Phase::Loading);
    }

    pub fn loaded(&self) {
        self.tx.send_replace(Phase::Ready);
    }

    pub fn signed_out(&self) {
        self.tx.send_replace(Phase::Unauthenticated);
    }

    /// Count one more save in flight until the guard drops.
    #[must_use]
    pub fn begin_save(&self) -> SaveGuard {
        self.tx.send_modify(|phase| {
            *phase = match *phase {
                Phase::Saving { in_flight } => Phase::Saving { in_flight: in_flight + 1 },
                _ => Phase::Saving { in_flight: 1 },
            };
        });
        SaveGuard { status: self.clone() }
    }

    /// Signing out mid-save wins: the phase stays `Unauthenticated`.
    fn finish_save(&self) {
        self.tx.send_modify(|phase| {
            if let Phase::Saving { in_flight } = *phase {
                *phase = if in_flight > 1 { Phase::Saving { in_flight: in_flight - 1 } } else { Phase::Ready };
            }
        });
    }

    /// Resolve once no save is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|phase| !matches!(phase, Phase::Saving { .. })).await;
    }
}

/// One in-flight save. Dropping it releases the slot.
#[derive(Debug)]
pub struct SaveGuard {
    status: SyncStatus,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.status.finish_save();
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Polls a scene file and reports each changed, parseable snapshot once.
#[derive(Debug)]
pub struct SnapshotWatcher {
    path: PathBuf,
    last: Option<String>,
}

impl SnapshotWatcher {
    /// Start watching `path`. Contents equal to `baseline` are not reported,
    /// so the file written from the loaded scene does not echo back as an edit.
    pub fn new(path: impl Into<PathBuf>, baseline: Option<String>) -> Self {
        Self { path: path.into(), last: baseline }
    }

    /// The next snapshot if the file changed since the last poll.
    ///
    /// Unparseable contents are logged and skipped until the file changes
    /// again.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn poll(&mut self) -> std::io::Result<Option<SceneDocument>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        if self.last.as_deref() == Some(raw.as_str()) {
            return Ok(None);
        }

        let parsed = serde_json::from_str::<Value>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|value| SceneDocument::from_value(value).map_err(|e| e.to_string()));
        self.last = Some(raw);

        match parsed {
            Ok(document) => Ok(Some(document)),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "skipping unparseable scene snapshot");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
