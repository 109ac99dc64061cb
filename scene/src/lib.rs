//! Shared scene model and HTTP payloads for the canvas API.
//!
//! This crate owns the JSON shapes exchanged by `server` and `cli`. Drawable
//! elements and file payloads stay opaque (`serde_json::Value`): the store
//! never interprets shape semantics, it only persists and normalizes them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Fixed key of the one persisted scene.
pub const SCENE_ID: &str = "default-canvas";

/// Cookie carrying the session marker.
pub const SESSION_COOKIE: &str = "canvas-session";

/// The only value of [`SESSION_COOKIE`] that counts as authenticated.
pub const SESSION_SENTINEL: &str = "authenticated";

/// `appState` field that is reset on every load.
pub const COLLABORATORS_KEY: &str = "collaborators";

/// Error returned by [`SceneDocument::from_value`].
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// Stored JSON does not have the scene shape.
    #[error("malformed scene document: {0}")]
    Decode(#[from] serde_json::Error),
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// The persisted payload: what a client sends on save and what the store keeps.
///
/// Decodes only from a JSON object; a top-level array is rejected rather than
/// read positionally as an empty document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Map<String, Value>")]
pub struct SceneDocument {
    pub elements: Vec<Value>,
    pub app_state: Map<String, Value>,
    pub files: Map<String, Value>,
}

/// Field-level decode rules shared by [`SceneDocument`] and [`Scene`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentFields {
    #[serde(default, deserialize_with = "array_or_empty")]
    elements: Vec<Value>,
    #[serde(default, deserialize_with = "object_or_empty")]
    app_state: Map<String, Value>,
    #[serde(default, deserialize_with = "object_or_empty")]
    files: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for SceneDocument {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let fields: DocumentFields = serde_json::from_value(Value::Object(map))?;
        Ok(Self { elements: fields.elements, app_state: fields.app_state, files: fields.files })
    }
}

impl SceneDocument {
    /// Decode a stored JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Decode`] when the value is not an object, or
    /// `elements` is present but not an array.
    pub fn from_value(value: Value) -> Result<Self, SceneError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode for storage.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "elements": self.elements,
            "appState": self.app_state,
            "files": self.files,
        })
    }

    /// Attach a save timestamp and normalize view state.
    #[must_use]
    pub fn into_scene(self, updated_at: Option<OffsetDateTime>) -> Scene {
        let mut scene = Scene { elements: self.elements, app_state: self.app_state, files: self.files, updated_at };
        normalize_app_state(&mut scene.app_state);
        scene
    }
}

// =============================================================================
// SCENE
// =============================================================================

/// A loaded scene as returned to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Map<String, Value>")]
pub struct Scene {
    pub elements: Vec<Value>,
    pub app_state: Map<String, Value>,
    pub files: Map<String, Value>,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<OffsetDateTime>,
}

impl TryFrom<Map<String, Value>> for Scene {
    type Error = serde_json::Error;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let updated_at = match map.remove("updatedAt") {
            Some(value) => time::serde::rfc3339::option::deserialize(value)?,
            None => None,
        };
        let document = SceneDocument::try_from(map)?;
        Ok(Self { elements: document.elements, app_state: document.app_state, files: document.files, updated_at })
    }
}

impl Scene {
    /// The scene served when nothing has been saved yet.
    #[must_use]
    pub fn empty() -> Self {
        SceneDocument::default().into_scene(None)
    }

    /// Drop the timestamp, keeping the persisted payload.
    #[must_use]
    pub fn into_document(self) -> SceneDocument {
        SceneDocument { elements: self.elements, app_state: self.app_state, files: self.files }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::empty()
    }
}

/// Reset `collaborators` to an empty keyed collection.
///
/// Presence is never persisted, so a loaded scene must not carry stale
/// collaborator entries. An already-empty object is left as is.
pub fn normalize_app_state(app_state: &mut Map<String, Value>) {
    let already_empty = matches!(app_state.get(COLLABORATORS_KEY), Some(Value::Object(m)) if m.is_empty());
    if !already_empty {
        app_state.insert(COLLABORATORS_KEY.to_owned(), Value::Object(Map::new()));
    }
}

fn object_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    })
}

fn array_or_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// HTTP PAYLOADS
// =============================================================================

/// `GET /api/auth/check` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub authenticated: bool,
}

/// `POST /api/auth/login` request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// Plain acknowledgement used by login and logout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `GET /api/canvas` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadResponse {
    pub success: bool,
    pub drawing: Scene,
}

/// `POST /api/canvas` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
}

/// Error body returned by every failing endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
