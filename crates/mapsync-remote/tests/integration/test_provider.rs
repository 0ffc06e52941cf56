//! Integration tests for RemoteProjectClient working-copy operations

use mapsync_core::domain::{ProjectPath, ProjectVersion};
use mapsync_core::ports::IProjectClient;
use mapsync_remote::RemoteProjectClient;

use crate::common;

fn project() -> ProjectPath {
    ProjectPath::new("john/dbsync").unwrap()
}

#[tokio::test]
async fn test_download_creates_working_copy() {
    let (server, client) = common::setup_server_mock().await;
    common::mount_project_info(
        &server,
        "v1",
        serde_json::json!([{"path": "sync.gpkg", "size": 12, "checksum": null}]),
    )
    .await;
    common::mount_raw_file(&server, "sync.gpkg", b"gpkg-content").await;

    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("dbsync");
    let provider = RemoteProjectClient::new(client);

    provider.download(&project(), &work_dir, None).await.unwrap();

    assert!(provider.is_working_copy(&work_dir).await);
    assert_eq!(
        std::fs::read(work_dir.join("sync.gpkg")).unwrap(),
        b"gpkg-content"
    );
    // pristine base copy matches the working file
    assert_eq!(
        std::fs::read(provider.base_file_path(&work_dir, "sync.gpkg")).unwrap(),
        b"gpkg-content"
    );
    assert_eq!(
        provider.local_version(&work_dir).await.unwrap(),
        ProjectVersion::new("v1").unwrap()
    );
    assert!(provider
        .pending_local_changes(&work_dir)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_pull_noop_at_server_version() {
    let (server, client) = common::setup_server_mock().await;
    common::mount_project_info(
        &server,
        "v1",
        serde_json::json!([{"path": "sync.gpkg", "size": 12, "checksum": null}]),
    )
    .await;
    common::mount_raw_file(&server, "sync.gpkg", b"gpkg-content").await;

    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("dbsync");
    let provider = RemoteProjectClient::new(client);
    provider.download(&project(), &work_dir, None).await.unwrap();

    let changes = provider.pull(&work_dir).await.unwrap();
    assert!(changes.is_empty());
    assert_eq!(
        provider.local_version(&work_dir).await.unwrap().as_str(),
        "v1"
    );
}

#[tokio::test]
async fn test_pull_downloads_new_version() {
    let (server, client) = common::setup_server_mock().await;
    common::mount_project_info(
        &server,
        "v1",
        serde_json::json!([{"path": "sync.gpkg", "size": 12, "checksum": "aaaa"}]),
    )
    .await;
    common::mount_raw_file(&server, "sync.gpkg", b"gpkg-content").await;

    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("dbsync");
    let provider = RemoteProjectClient::new(client);
    provider.download(&project(), &work_dir, None).await.unwrap();

    // server moves on to v2 with different content
    server.reset().await;
    common::mount_project_info(
        &server,
        "v2",
        serde_json::json!([{"path": "sync.gpkg", "size": 14, "checksum": "bbbb"}]),
    )
    .await;
    common::mount_raw_file(&server, "sync.gpkg", b"gpkg-content-v2").await;

    let changes = provider.pull(&work_dir).await.unwrap();
    assert_eq!(changes.updated.len(), 1);
    assert_eq!(
        std::fs::read(work_dir.join("sync.gpkg")).unwrap(),
        b"gpkg-content-v2"
    );
    assert_eq!(
        std::fs::read(provider.base_file_path(&work_dir, "sync.gpkg")).unwrap(),
        b"gpkg-content-v2"
    );
    assert_eq!(
        provider.local_version(&work_dir).await.unwrap().as_str(),
        "v2"
    );
}

#[tokio::test]
async fn test_push_uploads_local_edit_and_records_version() {
    let (server, client) = common::setup_server_mock().await;
    common::mount_project_info(
        &server,
        "v1",
        serde_json::json!([{"path": "sync.gpkg", "size": 12, "checksum": null}]),
    )
    .await;
    common::mount_raw_file(&server, "sync.gpkg", b"gpkg-content").await;
    common::mount_push_transaction(&server, "v2").await;

    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("dbsync");
    let provider = RemoteProjectClient::new(client);
    provider.download(&project(), &work_dir, None).await.unwrap();

    // the engine has applied a database changeset to the working file
    std::fs::write(work_dir.join("sync.gpkg"), b"gpkg-with-db-edits").unwrap();

    provider.push(&work_dir).await.unwrap();

    assert_eq!(
        provider.local_version(&work_dir).await.unwrap().as_str(),
        "v2"
    );
    // base copy refreshed; tree is clean again
    assert!(provider
        .pending_local_changes(&work_dir)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_push_with_clean_tree_is_noop() {
    let (server, client) = common::setup_server_mock().await;
    common::mount_project_info(
        &server,
        "v1",
        serde_json::json!([{"path": "sync.gpkg", "size": 12, "checksum": null}]),
    )
    .await;
    common::mount_raw_file(&server, "sync.gpkg", b"gpkg-content").await;
    // no push endpoints mounted: a request to them would fail the test

    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("dbsync");
    let provider = RemoteProjectClient::new(client);
    provider.download(&project(), &work_dir, None).await.unwrap();

    provider.push(&work_dir).await.unwrap();
    assert_eq!(
        provider.local_version(&work_dir).await.unwrap().as_str(),
        "v1"
    );
}
