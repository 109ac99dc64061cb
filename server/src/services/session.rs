//! Session gate: shared-secret login and sentinel cookie validation.
//!
//! ARCHITECTURE
//! ============
//! There is exactly one operator, so there is no identity and no session
//! table. A successful login tells the route to set the session cookie to a
//! fixed sentinel; every canvas request is then checked for that exact value.
//!
//! TRADE-OFFS
//! ==========
//! Logout only deletes the cookie on the client that asks. A marker still held
//! elsewhere stays valid: the marker is not per-client, and nothing server-side
//! remembers it. The secret is compared through SHA-256 digests so comparison
//! time does not track the length of the matching prefix of the password.

use scene::SESSION_SENTINEL;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("invalid password")]
    InvalidCredential,
    #[error("unauthorized")]
    Unauthorized,
    #[error("canvas password not configured")]
    NotConfigured,
}

/// Validates the shared secret. Cheap to clone.
#[derive(Clone)]
pub struct SessionGate {
    secret_digest: Option<[u8; 32]>,
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl SessionGate {
    /// Build a gate for `secret`. A missing or empty secret leaves the gate locked.
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        Self { secret_digest: secret.filter(|s| !s.is_empty()).map(digest) }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.secret_digest.is_some()
    }

    /// Check a candidate password. On success returns the marker the caller
    /// must store in the session cookie.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidCredential`] for any mismatch,
    /// [`GateError::NotConfigured`] when no secret is set.
    pub fn login(&self, candidate: &str) -> Result<&'static str, GateError> {
        let Some(expected) = &self.secret_digest else {
            return Err(GateError::NotConfigured);
        };
        if digest(candidate) == *expected {
            Ok(SESSION_SENTINEL)
        } else {
            Err(GateError::InvalidCredential)
        }
    }
}

/// True iff the cookie value is exactly the sentinel. A missing cookie is `false`.
#[must_use]
pub fn check_session(marker: Option<&str>) -> bool {
    marker == Some(SESSION_SENTINEL)
}

/// Guard used before every canvas store operation.
///
/// # Errors
///
/// Returns [`GateError::Unauthorized`] when [`check_session`] is false.
pub fn require_session(marker: Option<&str>) -> Result<(), GateError> {
    if check_session(marker) { Ok(()) } else { Err(GateError::Unauthorized) }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
