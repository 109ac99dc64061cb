use super::*;

// =============================================================================
// check_session / require_session
// =============================================================================

#[test]
fn check_session_missing_cookie_is_false() {
    assert!(!check_session(None));
}

#[test]
fn check_session_exact_sentinel_is_true() {
    assert!(check_session(Some("authenticated")));
}

#[test]
fn check_session_rejects_near_misses() {
    for value in ["", "Authenticated", "authenticated ", " authenticated", "true", "authenticated\0"] {
        assert!(!check_session(Some(value)), "accepted {value:?}");
    }
}

#[test]
fn require_session_maps_false_to_unauthorized() {
    assert_eq!(require_session(None), Err(GateError::Unauthorized));
    assert_eq!(require_session(Some("nope")), Err(GateError::Unauthorized));
    assert_eq!(require_session(Some(SESSION_SENTINEL)), Ok(()));
}

// =============================================================================
// SessionGate::login
// =============================================================================

#[test]
fn login_with_correct_secret_returns_sentinel() {
    let gate = SessionGate::new(Some("hunter2"));
    let marker = gate.login("hunter2").expect("login should succeed");
    assert_eq!(marker, SESSION_SENTINEL);
    assert!(check_session(Some(marker)));
}

#[test]
fn login_with_wrong_secret_is_invalid_credential() {
    let gate = SessionGate::new(Some("hunter2"));
    for candidate in ["", "hunter", "hunter22", "HUNTER2", " hunter2"] {
        assert_eq!(gate.login(candidate), Err(GateError::InvalidCredential), "candidate {candidate:?}");
    }
}

#[test]
fn login_without_secret_is_not_configured() {
    let gate = SessionGate::new(None);
    assert!(!gate.is_configured());
    assert_eq!(gate.login("anything"), Err(GateError::NotConfigured));
}

#[test]
fn empty_secret_counts_as_unconfigured() {
    let gate = SessionGate::new(Some(""));
    assert!(!gate.is_configured());
    assert_eq!(gate.login(""), Err(GateError::NotConfigured));
}

#[test]
fn debug_does_not_leak_secret() {
    let gate = SessionGate::new(Some("top-secret"));
    let debug = format!("{gate:?}");
    assert!(!debug.contains("top-secret"));
    assert!(debug.contains("configured: true"));
}

#[test]
fn digest_is_stable_and_distinct() {
    assert_eq!(digest("a"), digest("a"));
    assert_ne!(digest("a"), digest("b"));
}
