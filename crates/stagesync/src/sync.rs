//! Staged bulk-update engine
//!
//! Merges an in-memory row batch into a live table without row-by-row
//! UPDATE statements: the batch is loaded into a staging table
//! (`<table>_dummy`), then a single join-update moves the values across.
//! The staging delete, staging load, and join update run strictly in that
//! order inside one transaction.
//!
//! Concurrent invocations against the same target table are not
//! coordinated; callers are expected to keep a single writer per table.
//! Database transaction isolation is the only runtime safety net.

use mysql_async::{Transaction, TxOpts};
use tracing::{debug, info, warn};

use crate::error::{Error, ErrorCategory, Result};
use crate::sql::{self, TableRef};
use crate::store::{LoadMode, Store};
use crate::types::RowBatch;

/// Policy for a missing staging table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateMode {
    /// Abort the operation without creating anything
    #[default]
    Strict,
    /// Create the staging table from the batch's inferred schema
    Permissive,
}

/// Why a sync attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// Classification of the underlying error
    pub category: ErrorCategory,
    /// Human-readable cause
    pub message: String,
}

impl SyncFailure {
    fn from_error(error: &Error) -> Self {
        Self {
            category: error.category(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// Outcome of a sync operation.
///
/// Failures inside the transactional scope are rolled back and reported
/// here rather than raised; only connectivity failures during setup reach
/// the caller as errors.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Qualified target table name
    pub table: String,
    /// Rows written by the bulk load (staging rows, or target rows for a
    /// full refresh)
    pub rows_loaded: u64,
    /// Rows affected by the join update
    pub rows_updated: u64,
    /// The failure, when the operation did not complete
    pub failure: Option<SyncFailure>,
}

impl SyncReport {
    fn success(table: &TableRef, rows_loaded: u64, rows_updated: u64) -> Self {
        Self {
            table: table.qualified(),
            rows_loaded,
            rows_updated,
            failure: None,
        }
    }

    fn failed(table: &TableRef, error: &Error) -> Self {
        Self {
            table: table.qualified(),
            rows_loaded: 0,
            rows_updated: 0,
            failure: Some(SyncFailure::from_error(error)),
        }
    }

    /// Whether every step completed and the transaction committed
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Staged bulk-update engine bound to one target table.
///
/// Owns the target [`TableRef`] and delegates all connectivity to its
/// [`Store`].
#[derive(Debug, Clone)]
pub struct BulkSync {
    store: Store,
    table: TableRef,
}

impl BulkSync {
    /// Bind a sync engine to a target table
    pub fn new(store: Store, table: TableRef) -> Self {
        Self { store, table }
    }

    /// The target table
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// The underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Merge a row batch into the target table by column-matched join.
    ///
    /// Stages the batch into `<table>_dummy` (clearing it first, or creating
    /// it when `mode` permits), then runs a single join-update matching
    /// staging rows to target rows on `join_keys` and assigning every other
    /// batch column. The staging delete, load, and join update share one
    /// transaction; any failure rolls the whole attempt back and leaves the
    /// target unchanged.
    ///
    /// Validation failures (empty batch, unusable join keys) are reported
    /// before any database I/O. Connection failures propagate as errors.
    pub async fn bulk_update(
        &self,
        batch: &RowBatch,
        join_keys: &[&str],
        mode: CreateMode,
    ) -> Result<SyncReport> {
        let (join_columns, update_columns) = match partition_columns(batch, join_keys) {
            Ok(partition) => partition,
            Err(e) => {
                warn!(table = %self.table, error = %e, "bulk update rejected");
                return Ok(SyncReport::failed(&self.table, &e));
            }
        };

        let mut conn = self.store.connect().await?;
        let mut tx = match conn.start_transaction(TxOpts::default()).await {
            Ok(tx) => tx,
            Err(e) => {
                let err = Error::transaction_with_source("failed to begin transaction", e);
                warn!(table = %self.table, error = %err, "bulk update failed");
                return Ok(SyncReport::failed(&self.table, &err));
            }
        };

        let result = self
            .run_staged(&mut tx, batch, &join_columns, &update_columns, mode)
            .await;
        Ok(self.finish(tx, result).await)
    }

    /// Replace the target table's contents with a full dataset.
    ///
    /// Within one transaction, deletes every target row and bulk-loads the
    /// replacement batch. Same atomicity and reporting contract as
    /// [`bulk_update`](Self::bulk_update).
    pub async fn delete_all_insert_all(&self, batch: &RowBatch) -> Result<SyncReport> {
        if batch.is_empty() {
            let err = Error::EmptyBatch;
            warn!(table = %self.table, error = %err, "full refresh rejected");
            return Ok(SyncReport::failed(&self.table, &err));
        }

        let mut conn = self.store.connect().await?;
        let mut tx = match conn.start_transaction(TxOpts::default()).await {
            Ok(tx) => tx,
            Err(e) => {
                let err = Error::transaction_with_source("failed to begin transaction", e);
                warn!(table = %self.table, error = %err, "full refresh failed");
                return Ok(SyncReport::failed(&self.table, &err));
            }
        };

        let result = self.run_refresh(&mut tx, batch).await;
        Ok(self.finish(tx, result).await)
    }

    /// The staged protocol: existence check, staging clear or create,
    /// staging load, join update. Runs entirely inside `tx`.
    async fn run_staged(
        &self,
        tx: &mut Transaction<'_>,
        batch: &RowBatch,
        join_columns: &[&str],
        update_columns: &[&str],
        mode: CreateMode,
    ) -> Result<(u64, u64)> {
        let staging = self.table.staging();

        let rows_loaded = if self.store.table_exists(tx, &staging).await? {
            self.store.delete_all(tx, &staging).await?;
            let loaded = self
                .store
                .bulk_load(tx, &staging, batch, LoadMode::Append)
                .await?;
            debug!(table = %staging, rows = loaded, "staging table refreshed");
            loaded
        } else {
            match mode {
                CreateMode::Strict => {
                    return Err(Error::TableNotFound {
                        table: staging.qualified(),
                    });
                }
                CreateMode::Permissive => {
                    let loaded = self
                        .store
                        .bulk_load(tx, &staging, batch, LoadMode::Replace)
                        .await?;
                    debug!(table = %staging, rows = loaded, "staging table created");
                    loaded
                }
            }
        };

        let update = sql::join_update_sql(&self.table, &staging, join_columns, update_columns);
        let rows_updated = self.store.execute(tx, &update, &[]).await?;
        Ok((rows_loaded, rows_updated))
    }

    /// The full-refresh protocol: delete everything, reload everything.
    async fn run_refresh(&self, tx: &mut Transaction<'_>, batch: &RowBatch) -> Result<(u64, u64)> {
        let deleted = self.store.delete_all(tx, &self.table).await?;
        debug!(table = %self.table, rows = deleted, "target table cleared");
        let loaded = self
            .store
            .bulk_load(tx, &self.table, batch, LoadMode::Append)
            .await?;
        Ok((loaded, 0))
    }

    /// Commit on success, roll back on failure, and fold either path into a
    /// report. The transaction never outlives this call.
    async fn finish(&self, tx: Transaction<'_>, result: Result<(u64, u64)>) -> SyncReport {
        match result {
            Ok((rows_loaded, rows_updated)) => match tx.commit().await {
                Ok(()) => {
                    info!(
                        table = %self.table,
                        rows_loaded,
                        rows_updated,
                        "sync committed"
                    );
                    SyncReport::success(&self.table, rows_loaded, rows_updated)
                }
                Err(e) => {
                    let err = Error::transaction_with_source("failed to commit transaction", e);
                    warn!(table = %self.table, error = %err, "sync failed");
                    SyncReport::failed(&self.table, &err)
                }
            },
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(table = %self.table, error = %rollback_err, "rollback failed");
                }
                warn!(table = %self.table, error = %e, "sync failed, rolled back");
                SyncReport::failed(&self.table, &e)
            }
        }
    }
}

/// Split the batch columns into join columns and update columns, in batch
/// column order. Validates the join-key invariants without touching the
/// database.
fn partition_columns<'a>(
    batch: &'a RowBatch,
    join_keys: &[&str],
) -> Result<(Vec<&'a str>, Vec<&'a str>)> {
    if batch.is_empty() {
        return Err(Error::EmptyBatch);
    }
    if join_keys.is_empty() {
        return Err(Error::invalid_join_key("no join key columns given"));
    }

    let missing: Vec<&str> = join_keys
        .iter()
        .copied()
        .filter(|k| !batch.contains_column(k))
        .collect();
    if !missing.is_empty() {
        return Err(Error::invalid_join_key(format!(
            "columns not present in batch: {}",
            missing.join(", ")
        )));
    }

    let (join_columns, update_columns): (Vec<&str>, Vec<&str>) = batch
        .columns()
        .iter()
        .map(String::as_str)
        .partition(|c| join_keys.contains(c));

    if update_columns.is_empty() {
        return Err(Error::invalid_join_key(
            "join keys cover every batch column, no update columns remain",
        ));
    }

    Ok((join_columns, update_columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn batch() -> RowBatch {
        let mut batch = RowBatch::new(vec!["k".into(), "v".into()]).unwrap();
        batch.push(vec![Value::Int32(1), Value::Int32(10)]).unwrap();
        batch.push(vec![Value::Int32(2), Value::Int32(20)]).unwrap();
        batch
    }

    #[test]
    fn test_partition_in_batch_column_order() {
        let batch = batch();
        let (join, update) = partition_columns(&batch, &["k"]).unwrap();
        assert_eq!(join, vec!["k"]);
        assert_eq!(update, vec!["v"]);
    }

    #[test]
    fn test_partition_rejects_unknown_key() {
        let batch = batch();
        let err = partition_columns(&batch, &["missing"]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_partition_rejects_empty_keys() {
        let batch = batch();
        assert!(partition_columns(&batch, &[]).is_err());
    }

    #[test]
    fn test_partition_rejects_all_column_keys() {
        let batch = batch();
        let err = partition_columns(&batch, &["k", "v"]).unwrap_err();
        assert!(err.to_string().contains("no update columns"));
    }

    #[test]
    fn test_create_mode_default_is_strict() {
        assert_eq!(CreateMode::default(), CreateMode::Strict);
    }
}
