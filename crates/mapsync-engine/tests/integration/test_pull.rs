//! Pull operation: merging upstream versions into the database

use mapsync_core::domain::{InitSource, SyncError, SyncOutcome};

use crate::common::{Harness, BASE_SCHEMA, MODIFIED_SCHEMA, SYNC_FILE};

#[tokio::test]
async fn test_pull_converges_all_copies() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.client.publish_file(SYNC_FILE, "state-v2");

    let outcome = h.engine.pull().await.unwrap();
    assert!(
        matches!(&outcome, SyncOutcome::Applied { version } if version.as_str() == "v2"),
        "{outcome:?}"
    );
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v2"));
    assert_eq!(h.schema(MODIFIED_SCHEMA).as_deref(), Some("state-v2"));
    assert_eq!(std::fs::read_to_string(h.gpkg_path()).unwrap(), "state-v2");
    assert_eq!(
        h.catalog.comment(BASE_SCHEMA).unwrap().version.as_str(),
        "v2"
    );
}

#[tokio::test]
async fn test_pull_at_server_version_is_noop() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();

    let outcome = h.engine.pull().await.unwrap();
    assert_eq!(outcome, SyncOutcome::NoOpAlreadySynced);
    assert_eq!(
        h.catalog.comment(BASE_SCHEMA).unwrap().version.as_str(),
        "v1"
    );
}

#[tokio::test]
async fn test_pull_rebases_local_db_edits() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.set_schema(MODIFIED_SCHEMA, "state-v1+local");
    h.client.publish_file(SYNC_FILE, "state-v2");

    let outcome = h.engine.pull().await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Applied { .. }), "{outcome:?}");
    // base tracks the server exactly; modified keeps the local edits on top
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v2"));
    assert_eq!(
        h.schema(MODIFIED_SCHEMA).as_deref(),
        Some("merge(state-v2,state-v1+local)")
    );
}

#[tokio::test]
async fn test_pull_twice_second_is_noop() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.client.publish_file(SYNC_FILE, "state-v2");

    h.engine.pull().await.unwrap();
    let outcome = h.engine.pull().await.unwrap();
    assert_eq!(outcome, SyncOutcome::NoOpAlreadySynced);
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v2"));
}

#[tokio::test]
async fn test_pull_rejects_local_file_edits() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.client.publish_file(SYNC_FILE, "state-v2");
    std::fs::write(h.gpkg_path(), "tampered-by-hand").unwrap();

    let err = h.engine.pull().await.unwrap_err();
    assert!(matches!(err, SyncError::Precondition(_)), "{err}");
    // nothing was transferred
    assert_eq!(h.schema(BASE_SCHEMA).as_deref(), Some("state-v1"));
    assert_eq!(h.schema(MODIFIED_SCHEMA).as_deref(), Some("state-v1"));
}

#[tokio::test]
async fn test_pull_removes_temporary_snapshots() {
    let h = Harness::new();
    h.engine.init(InitSource::Gpkg).await.unwrap();
    h.client.publish_file(SYNC_FILE, "state-v2");

    h.engine.pull().await.unwrap();

    let base_dir = h.work_dir().join(".basefiles");
    assert!(base_dir.join(SYNC_FILE).exists());
    assert!(!base_dir.join("sync.gpkg-old").exists());
    let leftovers: Vec<_> = std::fs::read_dir(h.tmp.path().join("working"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .ends_with(".changeset")
        })
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
