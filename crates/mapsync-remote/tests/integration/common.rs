//! Shared test helpers for project server integration tests
//!
//! Provides wiremock-based mock server setup for the server API endpoints.
//! Each helper mounts the necessary mock endpoints and returns a configured
//! RemoteClient pointing at the mock server.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mapsync_remote::RemoteClient;

/// Sets up a mock server with a login endpoint and returns a
/// (MockServer, RemoteClient) tuple with an authenticated client.
pub async fn setup_server_mock() -> (MockServer, RemoteClient) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "test-session-token"
        })))
        .mount(&server)
        .await;

    let client = RemoteClient::with_token(server.uri(), "test-session-token");
    (server, client)
}

/// Mounts a project info endpoint reporting the given version and files.
pub async fn mount_project_info(server: &MockServer, version: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v1/project/john/dbsync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "version": version,
            "files": files,
        })))
        .mount(server)
        .await;
}

/// Mounts a raw file download endpoint serving fixed bytes for one file.
pub async fn mount_raw_file(server: &MockServer, file: &str, content: &'static [u8]) {
    Mock::given(method("GET"))
        .and(path("/v1/project/raw/john/dbsync"))
        .and(query_param("file", file))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .mount(server)
        .await;
}

/// Mounts the three push endpoints for a successful push transaction.
pub async fn mount_push_transaction(server: &MockServer, new_version: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/project/push/john/dbsync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transaction": "tx-001"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/project/push/chunk/tx-001"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/project/push/finish/tx-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "version": new_version
        })))
        .mount(server)
        .await;
}
