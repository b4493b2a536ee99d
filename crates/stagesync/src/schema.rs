//! Schema inference for replace-mode bulk loads.
//!
//! When a staging table is created from a row batch, its column types are
//! inferred in an explicit step: every row's values are sampled, types are
//! unified per column, and the result is a typed column-definition list.

use crate::error::{Error, Result};
use crate::types::{RowBatch, Value};

/// Column type in a created staging table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ColumnType {
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Text,
    Bytes,
    Date,
    Time,
    DateTime,
    Uuid,
    Json,
}

impl ColumnType {
    /// MySQL native type name for this column type
    pub fn mysql_type(self) -> &'static str {
        match self {
            Self::Bool => "TINYINT(1)",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL(65,30)",
            Self::Text => "TEXT",
            Self::Bytes => "LONGBLOB",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATETIME(6)",
            Self::Uuid => "CHAR(36)",
            Self::Json => "JSON",
        }
    }

    /// Type of a single sampled value, `None` for NULL
    fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Bool),
            Value::Int8(_) => Some(Self::TinyInt),
            Value::Int16(_) => Some(Self::SmallInt),
            Value::Int32(_) => Some(Self::Int),
            Value::Int64(_) => Some(Self::BigInt),
            Value::Float32(_) => Some(Self::Float),
            Value::Float64(_) => Some(Self::Double),
            Value::Decimal(_) => Some(Self::Decimal),
            Value::String(_) => Some(Self::Text),
            Value::Bytes(_) => Some(Self::Bytes),
            Value::Date(_) => Some(Self::Date),
            Value::Time(_) => Some(Self::Time),
            Value::DateTime(_) | Value::DateTimeTz(_) => Some(Self::DateTime),
            Value::Uuid(_) => Some(Self::Uuid),
            Value::Json(_) => Some(Self::Json),
        }
    }

    /// Rank within the numeric widening ladder, `None` for non-numeric types
    fn numeric_rank(self) -> Option<u8> {
        match self {
            Self::Bool => Some(0),
            Self::TinyInt => Some(1),
            Self::SmallInt => Some(2),
            Self::Int => Some(3),
            Self::BigInt => Some(4),
            Self::Float => Some(5),
            Self::Double => Some(6),
            Self::Decimal => Some(7),
            _ => None,
        }
    }

    fn from_numeric_rank(rank: u8) -> Self {
        match rank {
            0 => Self::Bool,
            1 => Self::TinyInt,
            2 => Self::SmallInt,
            3 => Self::Int,
            4 => Self::BigInt,
            5 => Self::Float,
            6 => Self::Double,
            _ => Self::Decimal,
        }
    }

    /// Unify two sampled types into one column type.
    ///
    /// Numeric types widen to the larger of the two; DATE and DATETIME unify
    /// to DATETIME; anything else that disagrees falls back to TEXT.
    fn unify(self, other: Self) -> Self {
        if self == other {
            return self;
        }
        match (self.numeric_rank(), other.numeric_rank()) {
            (Some(a), Some(b)) => Self::from_numeric_rank(a.max(b)),
            _ => match (self, other) {
                (Self::Date, Self::DateTime) | (Self::DateTime, Self::Date) => Self::DateTime,
                _ => Self::Text,
            },
        }
    }
}

/// A typed column definition produced by schema inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Inferred column type
    pub column_type: ColumnType,
    /// Whether the column held any NULL in the sampled batch
    pub nullable: bool,
}

/// Infer a typed column-definition list from a row batch.
///
/// Every row is sampled; a column whose values are NULL throughout falls
/// back to a nullable TEXT column.
pub fn infer_schema(batch: &RowBatch) -> Result<Vec<ColumnDef>> {
    if batch.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let mut defs = Vec::with_capacity(batch.columns().len());
    for (idx, name) in batch.columns().iter().enumerate() {
        let mut inferred: Option<ColumnType> = None;
        let mut nullable = false;
        for row in batch.rows() {
            match ColumnType::of_value(&row[idx]) {
                Some(t) => inferred = Some(inferred.map_or(t, |acc| acc.unify(t))),
                None => nullable = true,
            }
        }
        defs.push(ColumnDef {
            name: name.clone(),
            column_type: inferred.unwrap_or(ColumnType::Text),
            nullable,
        });
    }
    Ok(defs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(columns: &[&str], rows: Vec<Vec<Value>>) -> RowBatch {
        let mut batch = RowBatch::new(columns.iter().map(|c| c.to_string()).collect()).unwrap();
        for row in rows {
            batch.push(row).unwrap();
        }
        batch
    }

    #[test]
    fn test_mysql_type_mapping() {
        assert_eq!(ColumnType::Int.mysql_type(), "INT");
        assert_eq!(ColumnType::Bool.mysql_type(), "TINYINT(1)");
        assert_eq!(ColumnType::Text.mysql_type(), "TEXT");
        assert_eq!(ColumnType::Uuid.mysql_type(), "CHAR(36)");
        assert_eq!(ColumnType::Json.mysql_type(), "JSON");
    }

    #[test]
    fn test_infer_simple_types() {
        let b = batch(
            &["flag", "n", "name"],
            vec![vec![
                Value::Bool(true),
                Value::Int64(1),
                Value::String("a".into()),
            ]],
        );
        let defs = infer_schema(&b).unwrap();
        assert_eq!(defs[0].column_type, ColumnType::Bool);
        assert_eq!(defs[1].column_type, ColumnType::BigInt);
        assert_eq!(defs[2].column_type, ColumnType::Text);
        assert!(defs.iter().all(|d| !d.nullable));
    }

    #[test]
    fn test_numeric_widening() {
        let b = batch(
            &["n"],
            vec![
                vec![Value::Int32(1)],
                vec![Value::Int64(2)],
                vec![Value::Float64(3.5)],
            ],
        );
        let defs = infer_schema(&b).unwrap();
        assert_eq!(defs[0].column_type, ColumnType::Double);
    }

    #[test]
    fn test_cross_family_conflict_falls_back_to_text() {
        let b = batch(
            &["mixed"],
            vec![vec![Value::Int32(1)], vec![Value::String("x".into())]],
        );
        let defs = infer_schema(&b).unwrap();
        assert_eq!(defs[0].column_type, ColumnType::Text);
    }

    #[test]
    fn test_nulls_set_nullable() {
        let b = batch(
            &["n"],
            vec![vec![Value::Null], vec![Value::Int32(1)]],
        );
        let defs = infer_schema(&b).unwrap();
        assert_eq!(defs[0].column_type, ColumnType::Int);
        assert!(defs[0].nullable);
    }

    #[test]
    fn test_all_null_column() {
        let b = batch(&["n"], vec![vec![Value::Null]]);
        let defs = infer_schema(&b).unwrap();
        assert_eq!(defs[0].column_type, ColumnType::Text);
        assert!(defs[0].nullable);
    }

    #[test]
    fn test_empty_batch_rejected() {
        let b = RowBatch::new(vec!["n".into()]).unwrap();
        assert!(matches!(infer_schema(&b), Err(Error::EmptyBatch)));
    }
}
