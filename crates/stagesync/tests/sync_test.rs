//! Tests for the staged bulk-update engine
//!
//! Validation happens before any connection is opened, so the rejection
//! paths are observable without a reachable server. The connectivity
//! contract is exercised against a closed port: connection failures
//! propagate as errors instead of being folded into a report.

use stagesync::prelude::*;

/// A store pointing at a port nothing listens on.
fn unreachable_store() -> Store {
    Store::new(
        ConnectionConfig::new("127.0.0.1", "app", "secret", "testdb", 1)
            .with_require_tls(false),
    )
}

fn engine() -> BulkSync {
    BulkSync::new(
        unreachable_store(),
        TableRef::new("testdb", "items").unwrap(),
    )
}

fn batch() -> RowBatch {
    let mut batch = RowBatch::new(vec!["k".into(), "v".into()]).unwrap();
    batch.push(vec![Value::Int32(1), Value::Int32(10)]).unwrap();
    batch.push(vec![Value::Int32(2), Value::Int32(20)]).unwrap();
    batch
}

#[tokio::test]
async fn test_empty_batch_fails_without_io() {
    let empty = RowBatch::new(vec!["k".into(), "v".into()]).unwrap();
    let report = engine()
        .bulk_update(&empty, &["k"], CreateMode::Permissive)
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.table, "testdb.items");
    assert_eq!(report.rows_loaded, 0);
    let failure = report.failure.unwrap();
    assert_eq!(failure.category, ErrorCategory::Validation);
}

#[tokio::test]
async fn test_unknown_join_key_fails_without_io() {
    let report = engine()
        .bulk_update(&batch(), &["absent"], CreateMode::Permissive)
        .await
        .unwrap();

    assert!(!report.is_success());
    let failure = report.failure.unwrap();
    assert_eq!(failure.category, ErrorCategory::Validation);
    assert!(failure.message.contains("absent"));
}

#[tokio::test]
async fn test_empty_join_keys_fail_without_io() {
    let report = engine()
        .bulk_update(&batch(), &[], CreateMode::Strict)
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(
        report.failure.unwrap().category,
        ErrorCategory::Validation
    );
}

#[tokio::test]
async fn test_join_keys_covering_all_columns_fail_without_io() {
    let report = engine()
        .bulk_update(&batch(), &["k", "v"], CreateMode::Permissive)
        .await
        .unwrap();

    assert!(!report.is_success());
    let failure = report.failure.unwrap();
    assert_eq!(failure.category, ErrorCategory::Validation);
    assert!(failure.message.contains("no update columns"));
}

#[tokio::test]
async fn test_refresh_rejects_empty_batch_without_io() {
    let empty = RowBatch::new(vec!["k".into()]).unwrap();
    let report = engine().delete_all_insert_all(&empty).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(
        report.failure.unwrap().category,
        ErrorCategory::Validation
    );
}

#[tokio::test]
async fn test_connection_failure_propagates() {
    // Valid input, unreachable server: the error must surface instead of
    // being converted into a failed report.
    let err = engine()
        .bulk_update(&batch(), &["k"], CreateMode::Permissive)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Connection);
    assert!(err.is_retriable());
}

#[tokio::test]
async fn test_refresh_connection_failure_propagates() {
    let err = engine().delete_all_insert_all(&batch()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Connection);
}

#[test]
fn test_engine_accessors() {
    let engine = engine();
    assert_eq!(engine.table().qualified(), "testdb.items");
    assert_eq!(engine.store().database(), "testdb");
}

#[test]
fn test_failure_display() {
    let failure = SyncFailure {
        category: ErrorCategory::Validation,
        message: "empty row batch".into(),
    };
    assert_eq!(failure.to_string(), "validation: empty row batch");
}
