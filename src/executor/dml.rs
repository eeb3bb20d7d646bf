/// DML (Data Manipulation Language) operations
///
/// INSERT only: streamed tables are append-only.

use crate::types::{Column, Database, DatabaseError, Row, Table, Value};
use crate::storage::StorageEngine;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Wall clock in nanoseconds since the Unix epoch.
#[must_use]
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
}

pub struct DmlExecutor;

impl DmlExecutor {
    /// Execute INSERT statement
    ///
    /// Every row is checked against a scratch copy of the table first, so a
    /// failing row leaves nothing behind in the WAL. Returns the number of
    /// rows inserted.
    pub fn insert(
        db: &mut Database,
        storage: &mut StorageEngine,
        table_name: &str,
        columns: Option<&[String]>,
        rows: &[Vec<Value>],
    ) -> Result<usize, DatabaseError> {
        let mut scratch = db.table(table_name)?.clone();
        let targets = Self::target_positions(&scratch, columns)?;

        let mut prepared = Vec::with_capacity(rows.len());
        for values in rows {
            let row = Self::build_row(&scratch, &targets, columns.is_none(), values)?;
            scratch.insert(row.clone())?;
            prepared.push(row);
        }

        for row in &prepared {
            storage.log_insert(&scratch.name, row)?;
        }
        storage.catch_up(db)?;

        debug!(table = %scratch.name, rows = prepared.len(), "rows inserted");
        Ok(prepared.len())
    }

    /// Table position receiving each supplied value
    fn target_positions(
        table: &Table,
        columns: Option<&[String]>,
    ) -> Result<Vec<usize>, DatabaseError> {
        match columns {
            Some(names) => {
                let mut positions: Vec<usize> = Vec::with_capacity(names.len());
                for name in names {
                    let idx = table
                        .get_column_index(name)
                        .ok_or_else(|| DatabaseError::ColumnNotFound(name.clone()))?;
                    if positions.contains(&idx) {
                        return Err(DatabaseError::ParseError(format!(
                            "column '{name}' specified more than once"
                        )));
                    }
                    positions.push(idx);
                }
                Ok(positions)
            }
            None => Ok((0..table.columns.len()).collect()),
        }
    }

    /// Lay out one VALUES tuple in table order: defaults for missing columns,
    /// a generated rowtime when none is given, values cast to column types.
    fn build_row(
        table: &Table,
        targets: &[usize],
        implicit: bool,
        values: &[Value],
    ) -> Result<Row, DatabaseError> {
        let width = table.columns.len();

        // Without a column list the rowtime position may be left out
        let targets: Vec<usize> = if implicit && values.len() + 1 == width {
            (0..width).filter(|&i| i != table.rowtime_index).collect()
        } else {
            targets.to_vec()
        };
        if values.len() != targets.len() {
            return Err(DatabaseError::ColumnCountMismatch {
                expected: targets.len(),
                actual: values.len(),
            });
        }

        let mut slots: Vec<Option<Value>> = vec![None; width];
        for (&idx, value) in targets.iter().zip(values) {
            slots[idx] = Some(value.clone());
        }

        let mut out = Vec::with_capacity(width);
        for (idx, (col, slot)) in table.columns.iter().zip(slots).enumerate() {
            let value = if idx == table.rowtime_index {
                match slot {
                    None | Some(Value::Null) => Value::Integer(table.next_rowtime(now_nanos())),
                    Some(v) => v,
                }
            } else {
                slot.unwrap_or_else(|| Self::default_for(col))
            };
            out.push(value.cast(&col.data_type)?);
        }

        Ok(Row::new(out))
    }

    fn default_for(col: &Column) -> Value {
        col.default.clone().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StorageEngine, Database) {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = StorageEngine::new(temp_dir.path()).unwrap();
        let mut db = Database::new("main".to_string());
        let table = Table::new(
            "events".to_string(),
            vec![
                Column {
                    name: "kind".to_string(),
                    data_type: DataType::Text,
                    nullable: false,
                    primary_key: false,
                    unique: false,
                    default: Some(Value::Text("click".to_string())),
                },
                Column {
                    name: "amount".to_string(),
                    data_type: DataType::Real,
                    nullable: true,
                    primary_key: false,
                    unique: false,
                    default: None,
                },
            ],
        )
        .unwrap();
        storage.log_create_table(&table).unwrap();
        storage.catch_up(&mut db).unwrap();
        (temp_dir, storage, db)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_insert_explicit_rowtime() {
        let (_dir, mut storage, mut db) = setup();
        let rows = vec![
            vec![Value::Integer(10), text("a"), Value::Integer(1)],
            vec![Value::Integer(20), text("b"), Value::Null],
        ];
        assert_eq!(DmlExecutor::insert(&mut db, &mut storage, "events", None, &rows).unwrap(), 2);

        let table = db.get_table("events").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].values[2], Value::Real(1.0));
        assert_eq!(table.max_rowtime, 20);
    }

    #[test]
    fn test_insert_generates_increasing_rowtime() {
        let (_dir, mut storage, mut db) = setup();
        let rows = vec![vec![text("a"), Value::Null], vec![text("b"), Value::Null]];
        DmlExecutor::insert(&mut db, &mut storage, "events", None, &rows).unwrap();

        let cols = vec!["amount".to_string()];
        DmlExecutor::insert(&mut db, &mut storage, "events", Some(&cols), &[vec![Value::Real(2.5)]])
            .unwrap();

        let table = db.get_table("events").unwrap();
        let times: Vec<i64> = table.rows.iter().filter_map(|r| r.values[0].to_i64()).collect();
        assert_eq!(times.len(), 3);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert!(times[0] > 0);
        // Default applied for the omitted column
        assert_eq!(table.rows[2].values[1], text("click"));
    }

    #[test]
    fn test_insert_is_all_or_nothing() {
        let (_dir, mut storage, mut db) = setup();
        let rows = vec![
            vec![Value::Integer(10), text("a"), Value::Null],
            vec![Value::Integer(5), text("b"), Value::Null],
        ];
        assert!(matches!(
            DmlExecutor::insert(&mut db, &mut storage, "events", None, &rows),
            Err(DatabaseError::InvalidRowtime(_))
        ));
        assert!(db.get_table("events").unwrap().rows.is_empty());
        assert_eq!(storage.catch_up(&mut db).unwrap(), 0);
    }

    #[test]
    fn test_insert_errors() {
        let (_dir, mut storage, mut db) = setup();
        assert!(matches!(
            DmlExecutor::insert(&mut db, &mut storage, "missing", None, &[vec![]]),
            Err(DatabaseError::TableNotFound(_))
        ));
        assert!(matches!(
            DmlExecutor::insert(&mut db, &mut storage, "events", None, &[vec![text("a")]]),
            Err(DatabaseError::ColumnCountMismatch { .. })
        ));
        let cols = vec!["nope".to_string()];
        assert!(matches!(
            DmlExecutor::insert(&mut db, &mut storage, "events", Some(&cols), &[vec![text("a")]]),
            Err(DatabaseError::ColumnNotFound(_))
        ));
        let cols = vec!["rowtime".to_string(), "kind".to_string(), "amount".to_string()];
        assert!(matches!(
            DmlExecutor::insert(&mut db, &mut storage, "events", Some(&cols), &[vec![text("a"), Value::Null]]),
            Err(DatabaseError::ColumnCountMismatch { expected: 3, actual: 2 })
        ));
        let cols = vec!["kind".to_string()];
        assert!(matches!(
            DmlExecutor::insert(&mut db, &mut storage, "events", Some(&cols), &[vec![Value::Null]]),
            Err(DatabaseError::NotNullViolation(_))
        ));
        let cols = vec!["amount".to_string()];
        assert!(matches!(
            DmlExecutor::insert(&mut db, &mut storage, "events", Some(&cols), &[vec![text("x")]]),
            Err(DatabaseError::TypeMismatch(_))
        ));
    }
}
