//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! Every dependency is constructed once in `main` and passed in here; there
//! are no module-level singletons, so tests build the same state around the
//! in-memory scene repository.

use std::sync::Arc;

use crate::config::{CookieConfig, SaveRetry};
use crate::services::canvas::CanvasStore;
use crate::services::content::ContentLibrary;
use crate::services::repository::SceneRepository;
use crate::services::session::SessionGate;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub gate: SessionGate,
    pub canvas: Arc<CanvasStore>,
    pub content: ContentLibrary,
    pub cookie: CookieConfig,
}

impl AppState {
    #[must_use]
    pub fn new(
        gate: SessionGate,
        repo: Arc<dyn SceneRepository>,
        retry: SaveRetry,
        content: ContentLibrary,
        cookie: CookieConfig,
    ) -> Self {
        Self { gate, canvas: Arc::new(CanvasStore::new(repo, retry)), content, cookie }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
