use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use scene::COLLABORATORS_KEY;
use serde_json::{Value, json};

use crate::services::repository::{MemorySceneRepository, StoredScene};

fn memory_store() -> (Arc<MemorySceneRepository>, CanvasStore) {
    let repo = Arc::new(MemorySceneRepository::new());
    let store = CanvasStore::new(repo.clone(), SaveRetry::default());
    (repo, store)
}

fn document(elements: Value, app_state: Value, files: Value) -> SceneDocument {
    SceneDocument::from_value(json!({"elements": elements, "appState": app_state, "files": files}))
        .expect("test document should decode")
}

/// Fails the first `failures` upserts, then delegates to memory.
struct FlakyRepo {
    inner: MemorySceneRepository,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl SceneRepository for FlakyRepo {
    async fn fetch(&self, id: &str) -> Result<Option<StoredScene>, RepositoryError> {
        self.inner.fetch(id).await
    }

    async fn upsert(&self, id: &str, data: &Value, updated_at: OffsetDateTime) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Offline);
        }
        self.inner.upsert(id, data, updated_at).await
    }
}

fn flaky(failures: usize) -> Arc<FlakyRepo> {
    Arc::new(FlakyRepo {
        inner: MemorySceneRepository::new(),
        failures: AtomicUsize::new(failures),
        calls: AtomicUsize::new(0),
    })
}

// =============================================================================
// load
// =============================================================================

#[tokio::test]
async fn load_empty_store_returns_default_scene() {
    let (_, store) = memory_store();
    let scene = store.load().await.expect("load should succeed");
    assert!(scene.elements.is_empty());
    assert!(scene.files.is_empty());
    assert_eq!(scene.app_state.get(COLLABORATORS_KEY), Some(&json!({})));
    assert!(scene.updated_at.is_none());
}

#[tokio::test]
async fn load_normalizes_stored_collaborators() {
    let (repo, store) = memory_store();
    let stamp = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
    repo.seed(
        SCENE_ID,
        json!({"elements": [], "appState": {"collaborators": {"ghost": {}}, "theme": "dark"}, "files": {}}),
        stamp,
    )
    .await;

    let scene = store.load().await.unwrap();
    assert_eq!(scene.app_state.get(COLLABORATORS_KEY), Some(&json!({})));
    assert_eq!(scene.app_state.get("theme"), Some(&json!("dark")));
    assert_eq!(scene.updated_at, Some(stamp));
}

#[tokio::test]
async fn load_storage_failure_is_error_not_empty_scene() {
    let (repo, store) = memory_store();
    repo.set_offline(true);
    let err = store.load().await.expect_err("offline load should fail");
    assert!(matches!(err, CanvasError::StorageUnavailable(RepositoryError::Offline)));
}

#[tokio::test]
async fn load_malformed_row_is_storage_unavailable() {
    let (repo, store) = memory_store();
    repo.seed(SCENE_ID, json!({"elements": "not a list"}), OffsetDateTime::now_utc())
        .await;
    let err = store.load().await.expect_err("malformed row should fail");
    assert!(matches!(err, CanvasError::StorageUnavailable(RepositoryError::Malformed(_))));
}

#[tokio::test]
async fn load_array_row_is_storage_unavailable() {
    let (repo, store) = memory_store();
    repo.seed(SCENE_ID, json!([]), OffsetDateTime::now_utc()).await;
    let err = store.load().await.expect_err("array row should fail");
    assert!(matches!(err, CanvasError::StorageUnavailable(RepositoryError::Malformed(_))));
}

// =============================================================================
// save
// =============================================================================

#[tokio::test]
async fn save_then_load_round_trips_elements_and_files() {
    let (_, store) = memory_store();
    let elements = json!([{"id": "r1", "type": "rectangle", "x": 1.5}, {"id": "t1", "type": "text"}]);
    let files = json!({"img-1": {"mimeType": "image/png", "dataURL": "data:image/png;base64,iVBOR"}});
    let doc = document(elements.clone(), json!({"viewBackgroundColor": "#fff"}), files.clone());

    let saved_at = store.save(doc).await.expect("save should succeed");
    let scene = store.load().await.unwrap();

    assert_eq!(Value::Array(scene.elements), elements);
    assert_eq!(Value::Object(scene.files), files);
    assert_eq!(scene.app_state.get("viewBackgroundColor"), Some(&json!("#fff")));
    assert_eq!(scene.app_state.get(COLLABORATORS_KEY), Some(&json!({})));
    assert_eq!(scene.updated_at, Some(saved_at));
}

#[tokio::test]
async fn save_replaces_whole_scene() {
    let (_, store) = memory_store();
    store
        .save(document(json!([{"id": "a"}, {"id": "b"}]), json!({}), json!({"f": {}})))
        .await
        .unwrap();
    store
        .save(document(json!([{"id": "c"}]), json!({}), json!({})))
        .await
        .unwrap();

    let scene = store.load().await.unwrap();
    assert_eq!(scene.elements, vec![json!({"id": "c"})]);
    assert!(scene.files.is_empty());
}

#[tokio::test]
async fn save_stamps_are_monotonic() {
    let (_, store) = memory_store();
    let mut previous = None;
    for i in 0..20 {
        let stamp = store
            .save(document(json!([{"n": i}]), json!({}), json!({})))
            .await
            .unwrap();
        if let Some(prev) = previous {
            assert!(stamp >= prev, "stamp went backwards at save {i}");
        }
        assert_eq!(stamp.nanosecond() % 1_000, 0);
        previous = Some(stamp);
    }
}

#[tokio::test]
async fn save_never_stamps_before_loaded_row() {
    let (repo, store) = memory_store();
    let future = OffsetDateTime::from_unix_timestamp(4_102_444_800).unwrap(); // 2100-01-01
    repo.seed(SCENE_ID, json!({"elements": []}), future).await;

    store.load().await.unwrap();
    let stamp = store
        .save(document(json!([]), json!({}), json!({})))
        .await
        .unwrap();
    assert!(stamp >= future);
}

#[tokio::test]
async fn overlapping_saves_leave_exactly_one_payload() {
    let (repo, store) = memory_store();
    let first = document(json!([{"id": "tab-1"}]), json!({"tab": 1}), json!({"one": {}}));
    let second = document(json!([{"id": "tab-2"}, {"id": "tab-2b"}]), json!({"tab": 2}), json!({}));

    let (a, b) = tokio::join!(store.save(first.clone()), store.save(second.clone()));
    a.unwrap();
    b.unwrap();

    let loaded = store.load().await.unwrap();
    let matches_first = loaded.elements == first.elements && loaded.files == first.files;
    let matches_second = loaded.elements == second.elements && loaded.files == second.files;
    assert!(matches_first ^ matches_second, "stored scene is a hybrid: {loaded:?}");
    assert_eq!(repo.write_count(), 2);
}

#[tokio::test]
async fn save_failure_is_storage_unavailable() {
    let (repo, store) = memory_store();
    repo.set_offline(true);
    let err = store
        .save(document(json!([]), json!({}), json!({})))
        .await
        .expect_err("offline save should fail");
    assert!(matches!(err, CanvasError::StorageUnavailable(_)));
    assert_eq!(repo.write_count(), 0);
}

#[tokio::test]
async fn default_policy_does_not_retry() {
    let repo = flaky(1);
    let store = CanvasStore::new(repo.clone(), SaveRetry::default());
    assert!(store.save(SceneDocument::default()).await.is_err());
    assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bounded_retry_recovers_from_transient_failures() {
    let repo = flaky(2);
    let store = CanvasStore::new(repo.clone(), SaveRetry { attempts: 3, base_ms: 1 });
    store
        .save(document(json!([{"id": "x"}]), json!({}), json!({})))
        .await
        .expect("third attempt should succeed");
    assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.load().await.unwrap().elements, vec![json!({"id": "x"})]);
}

#[tokio::test]
async fn bounded_retry_gives_up_after_attempts() {
    let repo = flaky(5);
    let store = CanvasStore::new(repo.clone(), SaveRetry { attempts: 2, base_ms: 1 });
    assert!(store.save(SceneDocument::default()).await.is_err());
    assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn truncate_to_micros_drops_sub_microsecond_part() {
    let ts = OffsetDateTime::from_unix_timestamp(10)
        .unwrap()
        .replace_nanosecond(123_456_789)
        .unwrap();
    assert_eq!(truncate_to_micros(ts).nanosecond(), 123_456_000);
}
