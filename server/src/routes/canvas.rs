//! Canvas routes: load and save the shared scene.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use scene::{LoadResponse, SaveResponse, SceneDocument};

use super::auth::CanvasSession;
use super::error_json;
use crate::state::AppState;

/// `GET /api/canvas`: the stored scene, or the empty scene if none exists.
pub async fn load(_session: CanvasSession, State(state): State<AppState>) -> Response {
    match state.canvas.load().await {
        Ok(drawing) => Json(LoadResponse { success: true, drawing }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "canvas load failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load drawing")
        }
    }
}

/// `POST /api/canvas`: replace the stored scene with the request body.
pub async fn save(
    _session: CanvasSession,
    State(state): State<AppState>,
    body: Result<Json<SceneDocument>, JsonRejection>,
) -> Response {
    let Json(document) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "canvas save rejected");
            return error_json(rejection.status(), rejection.body_text());
        }
    };

    match state.canvas.save(document).await {
        Ok(saved_at) => Json(SaveResponse { success: true, message: "Drawing saved".to_owned(), saved_at }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "canvas save failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save drawing")
        }
    }
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
