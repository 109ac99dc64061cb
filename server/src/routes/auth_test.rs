use super::*;
use serde_json::json;

use crate::state::test_helpers::{
    TEST_PASSWORD, get_request, json_request, send, session_cookie_header, test_app_state, test_router,
};

fn set_cookie(headers: &axum::http::HeaderMap) -> String {
    headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("response should set a cookie")
        .to_owned()
}

// =============================================================================
// cookies
// =============================================================================

#[test]
fn session_cookie_attributes() {
    let cookie = session_cookie("authenticated", CookieConfig::default());
    assert_eq!(cookie.name(), SESSION_COOKIE);
    assert_eq!(cookie.value(), "authenticated");
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.secure(), Some(false));
    assert_eq!(cookie.max_age(), None);
}

#[test]
fn session_cookie_honours_secure_and_max_age() {
    let config = CookieConfig { secure: true, max_age_secs: Some(3600) };
    let cookie = session_cookie("authenticated", config);
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.max_age(), Some(Duration::hours(1)));
}

#[test]
fn clearing_cookie_expires_immediately() {
    let cookie = clearing_cookie(CookieConfig::default());
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
}

#[test]
fn gate_errors_map_to_statuses() {
    assert_eq!(gate_error_response(GateError::InvalidCredential).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(gate_error_response(GateError::Unauthorized).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(gate_error_response(GateError::NotConfigured).status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// handlers
// =============================================================================

#[tokio::test]
async fn check_without_cookie_is_false() {
    let (state, _) = test_app_state();
    let res = send(&test_router(state), get_request("/api/auth/check", None)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({"authenticated": false}));
}

#[tokio::test]
async fn check_with_wrong_marker_is_false() {
    let (state, _) = test_app_state();
    let res = send(&test_router(state), get_request("/api/auth/check", Some("canvas-session=admin"))).await;
    assert_eq!(res.body, json!({"authenticated": false}));
}

#[tokio::test]
async fn login_sets_cookie_that_check_accepts() {
    let (state, _) = test_app_state();
    let router = test_router(state);

    let res = send(&router, json_request("POST", "/api/auth/login", None, &json!({"password": TEST_PASSWORD}))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({"ok": true}));

    let cookie = set_cookie(&res.headers);
    assert!(cookie.starts_with("canvas-session=authenticated"), "{cookie}");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));

    let pair = cookie.split(';').next().unwrap();
    let res = send(&router, get_request("/api/auth/check", Some(pair))).await;
    assert_eq!(res.body, json!({"authenticated": true}));
}

#[tokio::test]
async fn login_wrong_password_is_401_without_cookie() {
    let (state, _) = test_app_state();
    let res = send(
        &test_router(state),
        json_request("POST", "/api/auth/login", None, &json!({"password": "hunter2"})),
    )
    .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body, json!({"error": "Invalid password"}));
    assert!(res.headers.get("set-cookie").is_none());
}

#[tokio::test]
async fn login_missing_password_is_401() {
    let (state, _) = test_app_state();
    let res = send(&test_router(state), json_request("POST", "/api/auth/login", None, &json!({}))).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_unconfigured_is_503() {
    let (mut state, _) = test_app_state();
    state.gate = crate::services::session::SessionGate::new(None);
    let res = send(
        &test_router(state),
        json_request("POST", "/api/auth/login", None, &json!({"password": ""})),
    )
    .await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(res.body["error"].is_string());
}

#[tokio::test]
async fn logout_clears_cookie() {
    let (state, _) = test_app_state();
    let cookie = session_cookie_header();
    let res = send(&test_router(state), json_request("POST", "/api/auth/logout", Some(&cookie), &json!({}))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({"ok": true}));
    let cleared = set_cookie(&res.headers);
    assert!(cleared.starts_with("canvas-session=;"), "{cleared}");
    assert!(cleared.contains("Max-Age=0"));
}
