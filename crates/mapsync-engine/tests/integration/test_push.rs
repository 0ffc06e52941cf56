//! Push operation: transferring database edits onto the server

use std::sync::atomic::Ordering;

use mapsync_core::domain::{InitSource, SyncError, SyncOutcome};

use crate::common::{Harness, BASE_SCHEMA, MODIFIED_SCHEMA, SYNC_FILE};

#[tokio::test]
async fn test_push_transfers_db_edits() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.set_schema(MODIFIED_SCHEMA, "state-v1+edit");

    let outcome = h.engine.push().await.unwrap();
    assert!(
        matches!(&outcome, SyncOutcome::Applied { version } if version.as_str() == "v2"),
        "{outcome:?}"
    );
    assert_eq!(h.client.server_version(), 2);
    assert_eq!(
        h.client.server_files().get(SYNC_FILE).map(String::as_str),
        Some("state-v1+edit")
    );
    // base catches up only after the server accepted the version
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v1+edit"));
    assert_eq!(
        h.catalog.comment(BASE_SCHEMA).unwrap().version.as_str(),
        "v2"
    );
}

#[tokio::test]
async fn test_push_without_db_changes_is_noop() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();

    let outcome = h.engine.push().await.unwrap();
    assert_eq!(outcome, SyncOutcome::NoOpAlreadySynced);
    assert_eq!(h.client.server_version(), 1);
}

#[tokio::test]
async fn test_push_requires_pull_first() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.set_schema(MODIFIED_SCHEMA, "state-v1+edit");
    h.client.publish_file(SYNC_FILE, "state-v2");

    let err = h.engine.push().await.unwrap_err();
    assert!(matches!(err, SyncError::Precondition(_)), "{err}");
    assert!(err.to_string().contains("pull them first"), "{err}");
    // nothing was transferred in either direction
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v1"));
    assert_eq!(
        h.client.server_files().get(SYNC_FILE).map(String::as_str),
        Some("state-v2")
    );
}

#[tokio::test]
async fn test_push_then_status_is_in_sync() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.set_schema(MODIFIED_SCHEMA, "state-v1+edit");

    h.engine.push().await.unwrap();
    let report = h.engine.status().await.unwrap();
    assert!(report.in_sync(), "{report:?}");
}

#[tokio::test]
async fn test_push_requires_schemas() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.drop_schema(MODIFIED_SCHEMA);

    let err = h.engine.push().await.unwrap_err();
    assert!(matches!(err, SyncError::Precondition(_)), "{err}");
    assert!(err.to_string().contains("schema does not exist"), "{err}");
}

#[tokio::test]
async fn test_push_fails_when_no_changeset_is_written() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.set_schema(MODIFIED_SCHEMA, "state-v1+edit");

    // a diff engine that exits cleanly without output must not read as
    // "no differences"
    h.diff.drop_output.store(true, Ordering::SeqCst);
    let err = h.engine.push().await.unwrap_err();
    assert!(matches!(err, SyncError::Collaborator(_)), "{err}");
    assert!(err.to_string().contains("no changeset"), "{err}");
    assert_eq!(h.client.server_version(), 1);
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v1"));
}

#[tokio::test]
async fn test_push_leaves_base_untouched_on_upload_failure() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.set_schema(MODIFIED_SCHEMA, "state-v1+edit");

    h.client.fail_push.store(true, Ordering::SeqCst);
    let err = h.engine.push().await.unwrap_err();
    assert!(matches!(err, SyncError::Collaborator(_)), "{err}");
    // base still says "v1 is on the server", so a retry pushes the same edits
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v1"));
    assert_eq!(
        h.catalog.comment(BASE_SCHEMA).unwrap().version.as_str(),
        "v1"
    );

    // the working-copy file still carries the failed attempt; restore it
    // from the pristine base copy, then retry the push from the database
    h.client.fail_push.store(false, Ordering::SeqCst);
    std::fs::copy(
        h.work_dir().join(".basefiles").join(SYNC_FILE),
        h.gpkg_path(),
    )
    .unwrap();
    let outcome = h.engine.push().await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Applied { .. }), "{outcome:?}");
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v1+edit"));
    assert_eq!(
        h.client.server_files().get(SYNC_FILE).map(String::as_str),
        Some("state-v1+edit")
    );
}
