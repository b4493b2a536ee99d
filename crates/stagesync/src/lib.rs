//! # stagesync
//!
//! Staged bulk-update synchronization for MySQL tables.
//!
//! This crate moves bulk in-memory tabular data into a live relational
//! table using a staging-table pattern: the incoming batch is loaded into a
//! transient `<table>_dummy` table, and a single transactional join-update
//! merges it into the target. A thin data-access layer handles raw query
//! execution and chunked bulk loading.
//!
//! ## Features
//!
//! - **Staged merge**: stage, join-update, and clean up inside one
//!   transaction, with rollback on every failure path
//! - **Full refresh**: delete-all plus bulk reload as a single atomic swap
//! - **Schema inference**: replace-mode loads derive a typed column list
//!   from the batch's sampled values
//! - **Explicit outcomes**: validation failures, rolled-back transactional
//!   failures, and propagated connectivity failures are distinct
//! - **Driver pooling**: connections recycle after a fixed maximum lifetime
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagesync::prelude::*;
//!
//! let store = Store::new(ConnectionConfig::new(
//!     "db.internal", "app", "secret", "warehouse", 3306,
//! ));
//!
//! // Raw query execution
//! let mut conn = store.connect().await?;
//! let table = store.execute_as_table(&mut conn, "SELECT * FROM warehouse.items").await?;
//!
//! // Staged bulk update: match on `k`, assign every other batch column
//! let sync = BulkSync::new(store, TableRef::new("warehouse", "items")?);
//! let report = sync.bulk_update(&batch, &["k"], CreateMode::Permissive).await?;
//! assert!(report.is_success());
//! ```
//!
//! Concurrent callers targeting the same table are not coordinated; keep a
//! single writer per table.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod schema;
pub mod security;
pub mod sql;
pub mod store;
pub mod sync;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and row types
    pub use crate::types::{Row, RowBatch, Table, Value};

    // Configuration
    pub use crate::config::ConnectionConfig;

    // Schema inference
    pub use crate::schema::{infer_schema, ColumnDef, ColumnType};

    // Statement building
    pub use crate::sql::TableRef;

    // Store and bulk loading
    pub use crate::store::{Conn, LoadMode, Store};

    // Sync engine
    pub use crate::sync::{BulkSync, CreateMode, SyncFailure, SyncReport};
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::Value;
