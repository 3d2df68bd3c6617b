//! HTTP API tests
//!
//! Drives the axum router through `axum-test`: publishing archives as multipart
//! uploads, fetching code with the version header, and the index endpoints.

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use component_registry::{build_router, AppState, Config, IngestLimits, MemoryStorage, Registry};
use serde_json::Value;
use std::sync::Arc;

mod common;
use common::{code_for, component_archive};

fn create_test_server() -> TestServer {
    let registry = Registry::new(Arc::new(MemoryStorage::new()), IngestLimits::default());
    let state = AppState::new(Arc::new(registry), Arc::new(Config::default()));
    TestServer::new(build_router(state)).expect("Failed to create test server")
}

fn package_form(name: &str, version: &str, host_range: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "package",
        Part::bytes(component_archive(name, version, host_range).to_vec())
            .file_name(format!("{name}-{version}.tgz"))
            .mime_type("application/gzip"),
    )
}

async fn publish(server: &TestServer, name: &str, version: &str, host_range: &str) {
    server
        .post(&format!("/api/components/{name}/1.0.0/{version}"))
        .multipart(package_form(name, version, host_range))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_publish_then_fetch_code() {
    let server = create_test_server();

    let response = server
        .post("/api/components/MyComp/1.3.0/1.0.0")
        .multipart(package_form("mycomp", "1.0.0", "1.3.0"))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert!(response.json::<Value>()["message"]
        .as_str()
        .unwrap()
        .contains("mycomp@1.0.0"));

    let response = server
        .get("/api/components/mycomp")
        .add_query_param("hostVersion", "1.3.0")
        .add_query_param("componentVersion", "^1.0.0")
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("component-version"), "1.0.0");
    assert_eq!(response.header("content-type"), "application/javascript");
    assert_eq!(
        response.as_bytes().as_ref(),
        code_for("mycomp", "1.0.0").as_bytes()
    );
}

#[tokio::test]
async fn test_bare_component_version_pins_exactly() {
    let server = create_test_server();
    publish(&server, "widget", "1.0.0", "*").await;
    publish(&server, "widget", "1.9.0", "*").await;

    let response = server
        .get("/api/components/widget")
        .add_query_param("hostVersion", "1.0.0")
        .add_query_param("componentVersion", "1.0.0")
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("component-version"), "1.0.0");

    let response = server
        .get("/api/components/widget")
        .add_query_param("hostVersion", "1.0.0")
        .add_query_param("componentVersion", "^1.0.0")
        .await;
    assert_eq!(response.header("component-version"), "1.9.0");
}

#[tokio::test]
async fn test_fetch_returns_no_content_when_caller_is_current() {
    let server = create_test_server();
    publish(&server, "widget", "1.0.0", "^1.0.0").await;

    let response = server
        .get("/api/components/widget")
        .add_query_param("hostVersion", "1.0.0")
        .add_query_param("latestComponentVersion", "1.0.0")
        .await;
    response.assert_status(StatusCode::NO_CONTENT);
    assert_eq!(response.header("component-version"), "1.0.0");
    assert!(response.as_bytes().is_empty());
}

#[tokio::test]
async fn test_fetch_error_statuses() {
    let server = create_test_server();
    publish(&server, "widget", "1.0.0", "^1.0.0").await;

    let response = server
        .get("/api/components/widget")
        .add_query_param("hostVersion", "3.0.0")
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "incompatible_host");

    let response = server
        .get("/api/components/widget")
        .add_query_param("hostVersion", "1.0.0")
        .add_query_param("componentVersion", "^2")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .get("/api/components/unknown")
        .add_query_param("hostVersion", "1.0.0")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "not_found");

    let response = server
        .get("/api/components/widget")
        .add_query_param("hostVersion", "not-a-version")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "validation_error");
}

#[tokio::test]
async fn test_publish_rejections() {
    let server = create_test_server();

    // Declared version disagrees with the descriptor.
    let response = server
        .post("/api/components/widget/1.0.0/2.0.0")
        .multipart(package_form("widget", "1.0.0", "*"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/components/widget/1.0.0/1.0.0")
        .multipart(MultipartForm::new().add_text("note", "no archive here"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/components/widget/latest/1.0.0")
        .multipart(package_form("widget", "1.0.0", "*"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/components/..%2Fetc/1.0.0/1.0.0")
        .multipart(package_form("widget", "1.0.0", "*"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let index = server.get("/api/index").await.json::<Value>();
    assert_eq!(index, serde_json::json!({}));
}

#[tokio::test]
async fn test_index_endpoints() {
    let server = create_test_server();
    publish(&server, "widget", "1.0.0", "*").await;
    publish(&server, "widget", "1.2.0", "*").await;
    publish(&server, "gadget", "0.1.0", "*").await;

    let index = server.get("/api/index").await.json::<Value>();
    assert_eq!(index["widget"]["latest"], "1.2.0");
    assert_eq!(index["gadget"]["latest"], "0.1.0");
    assert!(index["widget"]["updatedAt"].is_string());

    // Re-publishing an older version moves the pointer; a rebuild restores the maximum.
    publish(&server, "widget", "1.0.0", "*").await;
    let index = server.get("/api/index").await.json::<Value>();
    assert_eq!(index["widget"]["latest"], "1.0.0");

    let response = server.post("/api/index/rebuild").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["widget"]["latest"], "1.2.0");
}
