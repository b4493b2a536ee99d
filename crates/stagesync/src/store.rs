//! Connection and query layer for stagesync
//!
//! `Store` owns the connection parameters and a lazily connecting
//! `mysql_async` pool, and provides uniform statement execution plus the
//! bulk-load primitive. Executors are generic over
//! [`Queryable`](mysql_async::prelude::Queryable), so the same code runs on
//! a plain connection or inside an open transaction; the caller controls
//! commit scope.

use chrono::{Datelike, Timelike};
use mysql_async::prelude::Queryable;
use mysql_async::{OptsBuilder, Params, Pool, PoolOpts, SslOpts};
use tracing::debug;

pub use mysql_async::Conn;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::schema;
use crate::sql::{self, TableRef};
use crate::types::{Row, RowBatch, Table, Value};

/// MySQL server error code for a detected deadlock.
const ER_LOCK_DEADLOCK: u16 = 1213;

/// How a bulk load treats the destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Insert into an existing table with a compatible column set
    Append,
    /// Drop and recreate the table from the batch's inferred schema
    Replace,
}

/// Convert a stagesync value to a MySQL parameter
fn value_to_sql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::from(*b),
        Value::Int8(n) => mysql_async::Value::from(*n),
        Value::Int16(n) => mysql_async::Value::from(*n),
        Value::Int32(n) => mysql_async::Value::from(*n),
        Value::Int64(n) => mysql_async::Value::from(*n),
        Value::Float32(n) => mysql_async::Value::from(*n),
        Value::Float64(n) => mysql_async::Value::from(*n),
        // String form keeps full DECIMAL precision on the wire
        Value::Decimal(d) => mysql_async::Value::from(d.to_string()),
        Value::String(s) => mysql_async::Value::from(s.clone()),
        Value::Bytes(b) => mysql_async::Value::from(b.clone()),
        Value::Date(d) => {
            mysql_async::Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
        }
        Value::Time(t) => mysql_async::Value::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1000,
        ),
        Value::DateTime(dt) => {
            let (date, time) = (dt.date(), dt.time());
            mysql_async::Value::Date(
                date.year() as u16,
                date.month() as u8,
                date.day() as u8,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
                time.nanosecond() / 1000,
            )
        }
        Value::DateTimeTz(dt) => {
            let naive = dt.naive_utc();
            let (date, time) = (naive.date(), naive.time());
            mysql_async::Value::Date(
                date.year() as u16,
                date.month() as u8,
                date.day() as u8,
                time.hour() as u8,
                time.minute() as u8,
                time.second() as u8,
                time.nanosecond() / 1000,
            )
        }
        Value::Uuid(u) => mysql_async::Value::from(u.to_string()),
        Value::Json(j) => mysql_async::Value::from(j.to_string()),
    }
}

/// Convert a MySQL value to a stagesync value
fn sql_to_value(val: mysql_async::Value) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(n) => Value::Int64(n),
        mysql_async::Value::UInt(n) => Value::Int64(n as i64),
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let Some(date) = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
            else {
                return Value::Null;
            };
            if hour == 0 && min == 0 && sec == 0 && micro == 0 {
                Value::Date(date)
            } else {
                match chrono::NaiveTime::from_hms_micro_opt(
                    hour as u32,
                    min as u32,
                    sec as u32,
                    micro,
                ) {
                    Some(time) => Value::DateTime(chrono::NaiveDateTime::new(date, time)),
                    None => Value::Null,
                }
            }
        }
        mysql_async::Value::Time(neg, days, hour, min, sec, micro) => {
            let total_hours = days * 24 + hour as u32;
            // Negative TIME is an interval, which has no value counterpart here
            if neg {
                return Value::Null;
            }
            match chrono::NaiveTime::from_hms_micro_opt(
                total_hours % 24,
                min as u32,
                sec as u32,
                micro,
            ) {
                Some(time) => Value::Time(time),
                None => Value::Null,
            }
        }
    }
}

/// Materialize a driver row into a stagesync row
fn row_from_mysql(row: mysql_async::Row) -> Row {
    let columns: Vec<String> = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().to_string())
        .collect();

    let values: Vec<Value> = (0..row.len())
        .map(|i| {
            let val: mysql_async::Value = row.get(i).unwrap_or(mysql_async::Value::NULL);
            sql_to_value(val)
        })
        .collect();

    Row::new(columns, values)
}

fn map_exec_err(sql: &str, e: mysql_async::Error) -> Error {
    if let mysql_async::Error::Server(ref server) = e {
        if server.code == ER_LOCK_DEADLOCK {
            return Error::Deadlock;
        }
    }
    Error::query_with_source(format!("failed to execute statement: {e}"), sql, e)
}

fn to_params(params: &[Value]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(value_to_sql).collect())
    }
}

/// Connection factory and query executor for one logical database.
///
/// Holds no mutable state beyond the driver pool. Connections are checked
/// out per operation (or per transaction scope) and return to the pool when
/// dropped; the pool recycles connections that exceed the configured
/// maximum lifetime.
#[derive(Clone)]
pub struct Store {
    config: ConnectionConfig,
    pool: Pool,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("config", &self.config).finish()
    }
}

impl Store {
    /// Create a store from connection parameters.
    ///
    /// The pool connects lazily; no I/O happens here. Connections are fixed
    /// to UTF-8 and use a TLS transport unless the config disables it.
    pub fn new(config: ConnectionConfig) -> Self {
        let pool_opts = PoolOpts::default().with_abs_conn_ttl(Some(config.max_lifetime));
        let mut builder = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()))
            .init(vec!["SET NAMES utf8mb4".to_string()])
            .pool_opts(pool_opts);
        if config.require_tls {
            builder = builder.ssl_opts(Some(SslOpts::default()));
        }
        let pool = Pool::new(builder);
        Self { config, pool }
    }

    /// The configuration this store was created with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The database (schema) this store targets
    pub fn database(&self) -> &str {
        &self.config.database
    }

    /// Check a connection out of the pool.
    ///
    /// Connection failures always propagate; nothing downstream converts
    /// them into a result flag.
    pub async fn connect(&self) -> Result<Conn> {
        self.pool.get_conn().await.map_err(|e| {
            Error::connection_with_source(
                format!(
                    "failed to connect to {}:{}/{}",
                    self.config.host, self.config.port, self.config.database
                ),
                e,
            )
        })
    }

    /// Close all pooled connections and tear the store down.
    pub async fn disconnect(self) -> Result<()> {
        self.pool
            .disconnect()
            .await
            .map_err(|e| Error::connection_with_source("failed to disconnect pool", e))
    }

    /// Execute a parameterized statement, returning the affected row count.
    ///
    /// No implicit transaction management: run on a connection for
    /// autocommit semantics, or on an open transaction to join its scope.
    pub async fn execute<Q>(&self, conn: &mut Q, sql: &str, params: &[Value]) -> Result<u64>
    where
        Q: Queryable,
    {
        debug!(sql, "executing statement");
        let result = conn
            .exec_iter(sql, to_params(params))
            .await
            .map_err(|e| map_exec_err(sql, e))?;
        let affected = result.affected_rows();
        result
            .drop_result()
            .await
            .map_err(|e| map_exec_err(sql, e))?;
        Ok(affected)
    }

    /// Execute a query, returning rows and column names in result order.
    ///
    /// Column names are reported even for an empty result set.
    pub async fn execute_query<Q>(&self, conn: &mut Q, sql: &str) -> Result<(Vec<Row>, Vec<String>)>
    where
        Q: Queryable,
    {
        debug!(sql, "executing query");
        let mut result = conn.query_iter(sql).await.map_err(|e| map_exec_err(sql, e))?;
        let column_names: Vec<String> = result
            .columns()
            .map(|cols| cols.iter().map(|c| c.name_str().to_string()).collect())
            .unwrap_or_default();
        let raw: Vec<mysql_async::Row> =
            result.collect().await.map_err(|e| map_exec_err(sql, e))?;
        let rows = raw.into_iter().map(row_from_mysql).collect();
        Ok((rows, column_names))
    }

    /// Execute a query and materialize the result set as a [`Table`].
    pub async fn execute_as_table<Q>(&self, conn: &mut Q, sql: &str) -> Result<Table>
    where
        Q: Queryable,
    {
        let (rows, columns) = self.execute_query(conn, sql).await?;
        Ok(Table::new(
            columns,
            rows.into_iter().map(Row::into_values).collect(),
        ))
    }

    /// Check whether a table exists, via an `information_schema` lookup.
    ///
    /// Tri-state contract: `Ok(true)` exists, `Ok(false)` absent, `Err(_)`
    /// unknown. A failed probe is an error, never treated as absence.
    pub async fn table_exists<Q>(&self, conn: &mut Q, table: &TableRef) -> Result<bool>
    where
        Q: Queryable,
    {
        let sql = sql::table_exists_sql(table);
        let exists: Option<i64> = conn
            .query_first(sql.as_str())
            .await
            .map_err(|e| map_exec_err(&sql, e))?;
        Ok(exists.is_some_and(|v| v != 0))
    }

    /// Bulk-load a row batch into a table.
    ///
    /// `Append` requires the table to already exist with a compatible
    /// column set; `Replace` drops and recreates it from the batch's
    /// inferred schema. Loading is chunked by the configured chunk size to
    /// bound memory and statement size; individual chunks are not
    /// transactionally significant, the enclosing transaction (if any)
    /// governs atomicity. Returns the number of rows inserted.
    pub async fn bulk_load<Q>(
        &self,
        conn: &mut Q,
        table: &TableRef,
        batch: &RowBatch,
        mode: LoadMode,
    ) -> Result<u64>
    where
        Q: Queryable,
    {
        if batch.is_empty() {
            return Err(Error::EmptyBatch);
        }

        if mode == LoadMode::Replace {
            let columns = schema::infer_schema(batch)?;
            let drop = sql::drop_table_sql(table);
            conn.query_drop(drop.as_str())
                .await
                .map_err(|e| map_exec_err(&drop, e))?;
            let create = sql::create_table_sql(table, &columns);
            conn.query_drop(create.as_str())
                .await
                .map_err(|e| map_exec_err(&create, e))?;
            debug!(table = %table, columns = columns.len(), "created table from inferred schema");
        }

        let mut inserted = 0u64;
        for rows in batch.rows().chunks(self.config.chunk_size) {
            let stmt = sql::insert_chunk_sql(table, batch.columns(), rows.len());
            let params: Vec<mysql_async::Value> = rows
                .iter()
                .flat_map(|row| row.iter().map(value_to_sql))
                .collect();
            let result = conn
                .exec_iter(stmt.as_str(), Params::Positional(params))
                .await
                .map_err(|e| map_exec_err(&stmt, e))?;
            inserted += result.affected_rows();
            result
                .drop_result()
                .await
                .map_err(|e| map_exec_err(&stmt, e))?;
            debug!(table = %table, rows = rows.len(), "loaded chunk");
        }
        Ok(inserted)
    }

    /// Delete every row in a table. The reset primitive for full refreshes.
    pub async fn delete_all<Q>(&self, conn: &mut Q, table: &TableRef) -> Result<u64>
    where
        Q: Queryable,
    {
        self.execute(conn, &sql::delete_all_sql(table), &[]).await
    }
}
