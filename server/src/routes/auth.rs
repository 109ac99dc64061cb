//! Auth routes: password login, session check, logout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use scene::{CheckResponse, LoginRequest, OkResponse, SESSION_COOKIE};
use time::Duration;

use super::error_json;
use crate::config::CookieConfig;
use crate::services::session::{self, GateError};
use crate::state::AppState;

// =============================================================================
// SESSION EXTRACTOR
// =============================================================================

/// Proof that the request carries a valid session cookie.
/// Use as a handler parameter to require a session; it rejects before the
/// body is read, so a refused request never touches storage.
pub struct CanvasSession;

impl<S> axum::extract::FromRequestParts<S> for CanvasSession
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let marker = jar.get(SESSION_COOKIE).map(Cookie::value);
        session::require_session(marker)
            .map(|()| Self)
            .map_err(gate_error_response)
    }
}

pub(crate) fn gate_error_response(err: GateError) -> Response {
    match err {
        GateError::InvalidCredential => error_json(StatusCode::UNAUTHORIZED, "Invalid password"),
        GateError::Unauthorized => error_json(StatusCode::UNAUTHORIZED, "Unauthorized"),
        GateError::NotConfigured => error_json(StatusCode::SERVICE_UNAVAILABLE, "Canvas login not configured"),
    }
}

// =============================================================================
// COOKIES
// =============================================================================

fn session_cookie(value: &str, config: CookieConfig) -> Cookie<'static> {
    let mut builder = Cookie::build((SESSION_COOKIE, value.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure);
    if let Some(secs) = config.max_age_secs {
        builder = builder.max_age(Duration::seconds(secs));
    }
    builder.build()
}

fn clearing_cookie(config: CookieConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure)
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/auth/check`: whether the request carries the session marker.
pub async fn check(jar: CookieJar) -> Json<CheckResponse> {
    let marker = jar.get(SESSION_COOKIE).map(Cookie::value);
    Json(CheckResponse { authenticated: session::check_session(marker) })
}

/// `POST /api/auth/login`: verify the password and set the session cookie.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(body): Json<LoginRequest>) -> Response {
    match state.gate.login(&body.password) {
        Ok(marker) => {
            let jar = jar.add(session_cookie(marker, state.cookie));
            (jar, Json(OkResponse { ok: true })).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "canvas login rejected");
            gate_error_response(e)
        }
    }
}

/// `POST /api/auth/logout`: clear the session cookie on this client.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(clearing_cookie(state.cookie));
    (jar, Json(OkResponse { ok: true }))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
