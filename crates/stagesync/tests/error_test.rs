//! Unit tests for the stagesync error module

use stagesync::error::{Error, ErrorCategory};

#[test]
fn test_category_mapping() {
    assert_eq!(
        Error::connection("refused").category(),
        ErrorCategory::Connection
    );
    assert_eq!(Error::query("bad sql").category(), ErrorCategory::Query);
    assert_eq!(
        Error::transaction("no begin").category(),
        ErrorCategory::Transaction
    );
    assert_eq!(Error::Deadlock.category(), ErrorCategory::Deadlock);
    assert_eq!(Error::EmptyBatch.category(), ErrorCategory::Validation);
    assert_eq!(
        Error::invalid_join_key("nope").category(),
        ErrorCategory::Validation
    );
    assert_eq!(
        Error::ColumnMismatch { row: 0 }.category(),
        ErrorCategory::Validation
    );
    assert_eq!(
        Error::TableNotFound { table: "a.b".into() }.category(),
        ErrorCategory::Schema
    );
    assert_eq!(Error::schema("drift").category(), ErrorCategory::Schema);
    assert_eq!(
        Error::config("bad name").category(),
        ErrorCategory::Configuration
    );
}

#[test]
fn test_retriable_classification() {
    assert!(Error::connection("refused").is_retriable());
    assert!(Error::Deadlock.is_retriable());

    assert!(!Error::query("syntax").is_retriable());
    assert!(!Error::EmptyBatch.is_retriable());
    assert!(!Error::config("bad").is_retriable());
}

#[test]
fn test_display_messages() {
    assert!(Error::connection("connection refused")
        .to_string()
        .contains("connection refused"));
    assert!(Error::invalid_join_key("columns not present in batch: id")
        .to_string()
        .contains("id"));
    assert_eq!(
        Error::ColumnMismatch { row: 7 }.to_string(),
        "row 7 does not match the batch column set"
    );
    assert_eq!(
        Error::TableNotFound {
            table: "mydb.items_dummy".into()
        }
        .to_string(),
        "table not found: mydb.items_dummy"
    );
}

#[test]
fn test_source_is_preserved() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let err = Error::connection_with_source("failed to connect", io);
    assert!(std::error::Error::source(&err).is_some());

    let err = Error::query("plain");
    assert!(std::error::Error::source(&err).is_none());
}

#[test]
fn test_query_error_keeps_sql() {
    let io = std::io::Error::other("boom");
    let err = Error::query_with_source("failed", "DELETE FROM mydb.items", io);
    match err {
        Error::Query { sql, .. } => assert_eq!(sql.as_deref(), Some("DELETE FROM mydb.items")),
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn test_category_display() {
    assert_eq!(ErrorCategory::Validation.to_string(), "validation");
    assert_eq!(ErrorCategory::Connection.to_string(), "connection");
    assert_eq!(ErrorCategory::Schema.to_string(), "schema");
}
