//! Integration tests for the labelserver HTTP surface.

use std::fs;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use labeling::{FileTaskStorage, LabelingTask, LabelingTaskStore};
use labelserver::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

struct TestEnv {
    results: tempfile::TempDir,
    frames: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            results: tempfile::tempdir().unwrap(),
            frames: tempfile::tempdir().unwrap(),
        }
    }

    fn app(&self) -> axum::Router {
        let state = AppState::new(self.results.path().to_path_buf(), self.frames.path().to_path_buf()).unwrap();
        build_router(Arc::new(state))
    }

    fn seed_task(&self) -> String {
        let mut task = LabelingTask::new();
        task.set_description("Label the BEER BOTTLE category");
        task.set_datapoints(vec!["a.jpg".into(), "b.jpg".into(), "c.jpg".into()]).unwrap();
        task.assign_categories(&["beer bottle", "background"]).unwrap();
        let store = LabelingTaskStore::new(FileTaskStorage::new(self.results.path()).unwrap());
        store.create(&task).unwrap();
        task.task_id().to_string()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health() {
    let env = TestEnv::new();
    let response = env.app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["status"], "ok");
}

#[tokio::test]
async fn test_get_task_returns_record() {
    let env = TestEnv::new();
    let id = env.seed_task();

    let response = env
        .app()
        .oneshot(get(&format!("/labeling_api/get_task?taskid={id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["task_id"], id.as_str());
    assert_eq!(body["datapoint_urls"], json!(["a.jpg", "b.jpg", "c.jpg"]));
    assert_eq!(body["categories"]["beer bottle"]["key_binding"], 1);
    assert_eq!(body["categories"]["background"]["key_binding"], 2);
}

#[tokio::test]
async fn test_get_unknown_task_is_404() {
    let env = TestEnv::new();
    let response = env.app().oneshot(get("/labeling_api/get_task?taskid=nosuchtask")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(extract_json(response.into_body()).await["error"].is_string());
}

#[tokio::test]
async fn test_get_task_rejects_path_like_id() {
    let env = TestEnv::new();
    let response = env
        .app()
        .oneshot(get("/labeling_api/get_task?taskid=..%2F..%2Fetc%2Fpasswd"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_labels_merges_labelers() {
    let env = TestEnv::new();
    let id = env.seed_task();

    let response = env
        .app()
        .oneshot(post_json(
            "/labeling_api/store_labels",
            json!({ "task_id": id, "labeler_name": "Alice", "labels": [1, 2, 1], "labeling_times": [0.5, 0.7, 0.2] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["labeler"], "alice");
    assert_eq!(body["num_labels"], 3);

    let response = env
        .app()
        .oneshot(post_json(
            "/labeling_api/store_labels",
            json!({ "task_id": id, "labeler_name": "bob", "labels": [2, 2, 2] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored: Value =
        serde_json::from_slice(&fs::read(env.results.path().join(format!("{id}.json"))).unwrap()).unwrap();
    assert_eq!(stored["labeler_results"]["alice"]["labels"], json!([1, 2, 1]));
    assert_eq!(stored["labeler_results"]["alice"]["labeling_times"], json!([0.5, 0.7, 0.2]));
    assert_eq!(stored["labeler_results"]["bob"]["labels"], json!([2, 2, 2]));
}

#[tokio::test]
async fn test_store_labels_rejects_length_mismatch() {
    let env = TestEnv::new();
    let id = env.seed_task();

    let response = env
        .app()
        .oneshot(post_json(
            "/labeling_api/store_labels",
            json!({ "task_id": id, "labeler_name": "carol", "labels": [1, 2] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stored: Value =
        serde_json::from_slice(&fs::read(env.results.path().join(format!("{id}.json"))).unwrap()).unwrap();
    assert_eq!(stored["labeler_results"], json!({}));
}

#[tokio::test]
async fn test_store_labels_for_unknown_task_is_404() {
    let env = TestEnv::new();
    let response = env
        .app()
        .oneshot(post_json(
            "/labeling_api/store_labels",
            json!({ "task_id": "missing", "labeler_name": "dan", "labels": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_tasks() {
    let env = TestEnv::new();
    let id = env.seed_task();
    let response = env.app().oneshot(get("/labeling_api/tasks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["tasks"], json!([id]));
}

#[tokio::test]
async fn test_frame_browsing() {
    let env = TestEnv::new();
    let root = env.frames.path();
    fs::create_dir_all(root.join("match1/point1")).unwrap();
    fs::create_dir_all(root.join("match1/point2")).unwrap();
    fs::create_dir_all(root.join("__pycache__")).unwrap();
    fs::write(root.join("match1/point1/0002.jpg"), b"jpeg-2").unwrap();
    fs::write(root.join("match1/point1/0001.jpg"), b"jpeg-1").unwrap();

    let response = env.app().oneshot(get("/fs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        extract_json(response.into_body()).await,
        json!({ "match1": ["point1", "point2"] })
    );

    let response = env.app().oneshot(get("/frames/match1/point1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!(["0001.jpg", "0002.jpg"]));

    let response = env.app().oneshot(get("/frame/match1/point1/0001.jpg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"jpeg-1");

    let response = env.app().oneshot(get("/frames/nowhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
