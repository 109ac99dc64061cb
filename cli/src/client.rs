//! HTTP client for the canvas API.
//!
//! The session is carried explicitly as a `Cookie` header rather than through
//! a cookie store, so it can be handed in from the environment and printed
//! back out after `login`.

use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderValue, SET_COOKIE};
use scene::{CheckResponse, ErrorResponse, LoadResponse, LoginRequest, SESSION_COOKIE, SaveResponse, Scene, SceneDocument};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("not logged in; run `login` or set FOLIO_SESSION")]
    Unauthorized,
    #[error("login succeeded but no {SESSION_COOKIE} cookie was returned")]
    MissingSessionCookie,
    #[error("server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },
}

#[derive(Debug, Clone)]
pub struct CanvasClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<String>,
}

impl CanvasClient {
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] unless `base_url` is http(s).
    pub fn new(base_url: &str, session: Option<String>) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url.to_owned()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_owned(),
            session: session.filter(|s| !s.is_empty()),
        })
    }

    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder, ClientError> {
        let request = self.http.request(method, self.url(path));
        Ok(match &self.session {
            Some(value) => request.header(COOKIE, HeaderValue::from_str(&format!("{SESSION_COOKIE}={value}"))?),
            None => request,
        })
    }

    /// `GET /healthz`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx status.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let response = self.http.get(self.url("/healthz")).send().await?;
        ensure_success(response).await.map(|_| ())
    }

    /// Whether the server accepts the current session.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx status.
    pub async fn check(&self) -> Result<bool, ClientError> {
        let response = self.request(reqwest::Method::GET, "/api/auth/check")?.send().await?;
        let body: CheckResponse = ensure_success(response).await?.json().await?;
        Ok(body.authenticated)
    }

    /// Exchange the password for a session and keep it for later calls.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Server`] with the server's message on a rejected
    /// password, or [`ClientError::MissingSessionCookie`] if no cookie came back.
    pub async fn login(&mut self, password: &str) -> Result<&str, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { password: password.to_owned() })
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let values = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok());
        let session = session_from_set_cookie(values).ok_or(ClientError::MissingSessionCookie)?;
        let session = self.session.insert(session);
        Ok(session.as_str())
    }

    /// Ask the server to clear the cookie and forget the local session.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx status.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let response = self.request(reqwest::Method::POST, "/api/auth/logout")?.send().await?;
        ensure_success(response).await?;
        self.session = None;
        Ok(())
    }

    /// Fetch the shared scene.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] without a valid session.
    pub async fn load(&self) -> Result<Scene, ClientError> {
        let response = self.request(reqwest::Method::GET, "/api/canvas")?.send().await?;
        let body: LoadResponse = ensure_success(response).await?.json().await?;
        Ok(body.drawing)
    }

    /// Replace the shared scene.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] without a valid session, or
    /// [`ClientError::Server`] when the server could not store the scene.
    pub async fn save(&self, document: &SceneDocument) -> Result<SaveResponse, ClientError> {
        let response = self
            .request(reqwest::Method::POST, "/api/canvas")?
            .json(&document.to_value())
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED && response.url().path() != "/api/auth/login" {
        return Err(ClientError::Unauthorized);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ClientError::Server { status: status.as_u16(), message: error_message(&text) })
}

/// The `error` field of a JSON error body, or the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => match serde_json::from_str::<Value>(body) {
            Ok(Value::String(s)) => s,
            _ => body.trim().to_owned(),
        },
    }
}

/// Value of the session cookie among `Set-Cookie` header values. An empty
/// value is a clearing cookie and does not count.
fn session_from_set_cookie<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    values
        .filter_map(|header| header.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, value)| name.trim() == SESSION_COOKIE && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_owned())
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
