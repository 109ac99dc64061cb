//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api` and serves the public website
//! as static files for every other path. The canvas endpoints sit behind the
//! session cookie; auth, blog and resource endpoints are open.

pub mod auth;
pub mod canvas;
pub mod content;

use std::path::Path;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use scene::ErrorResponse;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// JSON API routes.
pub fn api_routes(state: AppState, canvas_body_limit: usize) -> Router {
    Router::new()
        .route("/api/auth/check", get(auth::check))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route(
            "/api/canvas",
            get(canvas::load)
                .post(canvas::save)
                .layer(DefaultBodyLimit::max(canvas_body_limit)),
        )
        .route("/api/blog", get(content::list_posts))
        .route("/api/blog/{slug}", get(content::get_post))
        .route("/api/resources", get(content::list_categories))
        .route("/api/resources/{category}", get(content::get_category))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Full application: API routes plus the static website as fallback.
pub fn app(state: AppState, canvas_body_limit: usize, website_dir: &Path) -> Router {
    let website_service = ServeDir::new(website_dir).append_index_html_on_directories(true);

    api_routes(state, canvas_body_limit)
        .fallback_service(website_service)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// `{ "error": message }` with the given status.
pub(crate) fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
