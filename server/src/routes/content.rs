//! Content routes: blog posts and learning resources.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use super::error_json;
use crate::services::content::ContentError;
use crate::state::AppState;

/// Detail lookups answer a missing entry with 404 `not_found`; anything else,
/// including a missing index file, is a 500.
fn content_error_response(err: &ContentError, not_found: Option<&str>) -> Response {
    if let (ContentError::NotFound(what), Some(message)) = (err, not_found) {
        tracing::debug!(%what, "content not found");
        return error_json(StatusCode::NOT_FOUND, message);
    }
    tracing::error!(error = %err, "content read failed");
    error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read content")
}

/// `GET /api/blog`
pub async fn list_posts(State(state): State<AppState>) -> Response {
    match state.content.list_posts().await {
        Ok(posts) => Json(posts).into_response(),
        Err(e) => content_error_response(&e, None),
    }
}

/// `GET /api/blog/{slug}`
pub async fn get_post(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    match state.content.post(&slug).await {
        Ok(post) => Json(post).into_response(),
        Err(e) => content_error_response(&e, Some("Blog not found")),
    }
}

/// `GET /api/resources`
pub async fn list_categories(State(state): State<AppState>) -> Response {
    match state.content.list_categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => content_error_response(&e, None),
    }
}

/// `GET /api/resources/{category}`
pub async fn get_category(State(state): State<AppState>, Path(category): Path<String>) -> Response {
    match state.content.category(&category).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => content_error_response(&e, Some("Category not found")),
    }
}
