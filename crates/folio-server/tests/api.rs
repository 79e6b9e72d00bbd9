//! End-to-end tests of the HTTP surface, driven through the router without a
//! socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use folio_core::ContentStore;
use folio_server::{app, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const MAX_BODY: usize = 64 * 1024;
const BOUNDARY: &str = "folio-test-boundary";

fn setup() -> (Router, Arc<ContentStore>, TempDir) {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(ContentStore::new());
    let state = AppState::new(store.clone(), temp.path().join("uploads"));
    (app(state, MAX_BODY), store, temp)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_content(body: Value) -> Request<Body> {
    post_raw(body.to_string())
}

fn post_raw(body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/content")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

fn multipart_upload(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_get_content_lists_every_key() {
    let (router, _store, _temp) = setup();

    let (status, body) = send_json(&router, get("/content")).await;

    assert_eq!(status, StatusCode::OK);
    for key in [
        "header-lines",
        "tagline",
        "skills-list",
        "projects-list",
        "uploaded-images-list",
        "verified-section-blob",
    ] {
        assert_eq!(body[key], Value::Null, "{} should be present and null", key);
    }
    assert!(body["lastUpdated"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_write_then_read_back() {
    let (router, _store, _temp) = setup();

    let (status, ack) = send_json(
        &router,
        post_content(json!({ "type": "tagline", "content": "Building things" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);
    let stamp = ack["lastUpdated"].as_i64().unwrap();

    let (_, body) = send_json(&router, get("/content")).await;
    assert_eq!(body["tagline"], "Building things");
    assert_eq!(body["lastUpdated"].as_i64().unwrap(), stamp);
}

#[tokio::test]
async fn test_each_write_advances_last_updated() {
    let (router, _store, _temp) = setup();

    let (_, first) = send_json(
        &router,
        post_content(json!({ "type": "tagline", "content": "one" })),
    )
    .await;
    let (_, second) = send_json(
        &router,
        post_content(json!({ "type": "tagline", "content": "two" })),
    )
    .await;

    assert!(second["lastUpdated"].as_i64().unwrap() > first["lastUpdated"].as_i64().unwrap());
}

#[tokio::test]
async fn test_invalid_projects_leave_previous_value() {
    let (router, store, _temp) = setup();
    let good = r#"[{"title":"folio","description":"site"}]"#;

    let (status, _) = send_json(
        &router,
        post_content(json!({ "type": "projects-list", "content": good })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let before = store.snapshot().unwrap();

    let (status, body) = send_json(
        &router,
        post_content(json!({ "type": "projects-list", "content": "{not json" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid projects data format"));

    let after = store.snapshot().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_projects_must_be_an_array() {
    let (router, _store, _temp) = setup();

    let (status, _) = send_json(
        &router,
        post_content(json!({ "type": "projects-list", "content": "{\"title\":\"x\"}" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_messages() {
    let (router, _store, _temp) = setup();

    let cases = [
        (json!({ "content": "x" }), "Missing data type"),
        (json!({ "type": "tagline" }), "Missing content data"),
        (
            json!({ "type": "site-footer", "content": "x" }),
            "Unknown content type: 'site-footer'",
        ),
        (
            json!({ "type": "tagline", "content": "" }),
            "Empty content for 'tagline'",
        ),
    ];

    for (request, message) in cases {
        let (status, body) = send_json(&router, post_content(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], message);
    }
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (router, store, _temp) = setup();
    let before = store.snapshot().unwrap();

    let (status, body) = send_json(&router, post_raw("{\"type\": ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
    assert_eq!(store.snapshot().unwrap(), before);
}

#[tokio::test]
async fn test_upload_stores_and_serves_file() {
    let (router, _store, temp) = setup();
    let png = b"\x89PNG\r\n\x1a\nnot really an image";

    let (status, body) = send_json(&router, multipart_upload("file", "my photo.png", png)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["originalName"], "my photo.png");

    let file_name = body["fileName"].as_str().unwrap();
    assert!(file_name.ends_with("-my_photo.png"));
    assert_eq!(body["fileUrl"], format!("/uploads/{}", file_name));

    let on_disk = std::fs::read(temp.path().join("uploads").join(file_name)).unwrap();
    assert_eq!(on_disk, png);

    let (status, served) = send(&router, get(&format!("/uploads/{}", file_name))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, png);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (router, _store, _temp) = setup();

    let (status, body) = send_json(&router, multipart_upload("avatar", "a.png", b"x")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No file provided");
}

#[tokio::test]
async fn test_upload_over_body_limit() {
    let (router, _store, _temp) = setup();
    let oversized = vec![0u8; MAX_BODY + 1];

    let (status, _) = send(&router, multipart_upload("file", "big.bin", &oversized)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_missing_upload_is_not_found() {
    let (router, _store, _temp) = setup();

    let (status, _) = send(&router, get("/uploads/nothing-here.png")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
