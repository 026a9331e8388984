use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use flowd_http::{build_app, AppState};
use tower::ServiceExt;

fn test_state(scripts_root: &Path, data_dir: &Path) -> Arc<AppState> {
    Arc::new(AppState::new(scripts_root.to_path_buf(), data_dir.to_path_buf()))
}

#[tokio::test]
async fn healthz_returns_ok_without_a_token() {
    let scripts = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let app = build_app(test_state(scripts.path(), data.path()));

    let resp = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn jobs_lists_discovered_job_directories() {
    let scripts = tempfile::tempdir().unwrap();
    let job_dir = scripts.path().join("hello").join("config.d");
    std::fs::create_dir_all(&job_dir).unwrap();
    std::fs::write(job_dir.join("config.yaml"), "interpreter: /bin/bash\n").unwrap();

    let data = tempfile::tempdir().unwrap();
    let app = build_app(test_state(scripts.path(), data.path()));

    let resp = app
        .oneshot(Request::builder().uri("/jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_run_returns_404() {
    let scripts = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let app = build_app(test_state(scripts.path(), data.path()));

    let resp = app
        .oneshot(Request::builder().uri("/runs/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_source_removal_returns_404() {
    let scripts = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let app = build_app(test_state(scripts.path(), data.path()));

    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/sources/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
