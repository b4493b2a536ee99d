//! SQL generation for stagesync
//!
//! Every statement the system issues is built here. The staging clear, the
//! join update, and the full-refresh delete have fixed shapes with bare
//! (validated, unquoted) identifiers; downstream consumers depend on those
//! exact strings. The chunked INSERT is built with sea-query, and the
//! catalog probe queries `information_schema`.

use sea_query::{Alias, Expr, IntoIden, MysqlQueryBuilder, Query};

use crate::error::{Error, Result};
use crate::schema::ColumnDef;
use crate::security::{escape_literal, validate_identifier};

/// Suffix appended to a target table name to derive its staging table.
pub const STAGING_SUFFIX: &str = "_dummy";

/// A validated (database, table) pair.
///
/// Identifiers are validated at construction, so rendering them unquoted
/// into statement strings is safe. The table name must leave room for the
/// staging suffix within MySQL's 64-character identifier limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    database: String,
    table: String,
}

impl TableRef {
    /// Create a table reference, validating both identifiers
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let database = database.into();
        let table = table.into();
        validate_identifier(&database)?;
        validate_identifier(&table)?;
        if table.len() + STAGING_SUFFIX.len() > 64 {
            return Err(Error::config(format!(
                "table name '{table}' leaves no room for the '{STAGING_SUFFIX}' staging suffix"
            )));
        }
        Ok(Self { database, table })
    }

    /// Database (schema) name
    #[inline]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Table name
    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The staging table for this target, in the same database
    pub fn staging(&self) -> TableRef {
        TableRef {
            database: self.database.clone(),
            table: format!("{}{}", self.table, STAGING_SUFFIX),
        }
    }

    /// Render as `database.table` with bare identifiers
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

fn sea_table(table: &TableRef) -> sea_query::TableRef {
    sea_query::TableRef::SchemaTable(
        Alias::new(table.database()).into_iden(),
        Alias::new(table.table()).into_iden(),
    )
}

/// `DELETE FROM <db>.<table>` with no WHERE clause.
///
/// Used both as the staging clear and as the full-refresh reset primitive.
pub fn delete_all_sql(table: &TableRef) -> String {
    format!("DELETE FROM {}", table.qualified())
}

/// The join-update statement:
///
/// `UPDATE <db>.<t> A INNER JOIN <db>.<t>_dummy B ON A.<k1> = B.<k1> AND ... SET A.<c1> = B.<c1>, ...`
///
/// Join predicates come from the join-key columns, SET clauses from the
/// update columns. Callers guarantee both lists are non-empty.
pub fn join_update_sql(
    target: &TableRef,
    staging: &TableRef,
    join_columns: &[&str],
    update_columns: &[&str],
) -> String {
    let on = join_columns
        .iter()
        .map(|c| format!("A.{c} = B.{c}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let set = update_columns
        .iter()
        .map(|c| format!("A.{c} = B.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} A INNER JOIN {} B ON {} SET {}",
        target.qualified(),
        staging.qualified(),
        on,
        set
    )
}

/// Catalog lookup for table existence.
///
/// Returns a single `EXISTS` flag from `information_schema.tables`. A
/// failed probe means "unknown", never "absent".
pub fn table_exists_sql(table: &TableRef) -> String {
    format!(
        "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}')",
        escape_literal(table.database()),
        escape_literal(table.table())
    )
}

/// `DROP TABLE IF EXISTS <db>.<table>`, the first half of a replace load.
pub fn drop_table_sql(table: &TableRef) -> String {
    format!("DROP TABLE IF EXISTS {}", table.qualified())
}

/// CREATE TABLE statement from an inferred column-definition list.
pub fn create_table_sql(table: &TableRef, columns: &[ColumnDef]) -> String {
    let columns: Vec<String> = columns
        .iter()
        .map(|col| {
            let mut def = format!("`{}` {}", col.name, col.column_type.mysql_type());
            if !col.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    format!(
        "CREATE TABLE `{}`.`{}` (\n  {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        table.database(),
        table.table(),
        columns.join(",\n  ")
    )
}

/// Parameterized multi-row INSERT for one bulk-load chunk.
///
/// Emits one `?` placeholder per value, `row_count` value tuples.
pub fn insert_chunk_sql(table: &TableRef, columns: &[String], row_count: usize) -> String {
    let mut stmt = Query::insert();
    stmt.into_table(sea_table(table))
        .columns(columns.iter().map(|c| Alias::new(c.as_str())));
    for _ in 0..row_count {
        let values: Vec<_> = columns.iter().map(|_| Expr::cust("?")).collect();
        stmt.values_panic(values);
    }
    stmt.to_string(MysqlQueryBuilder)
}
