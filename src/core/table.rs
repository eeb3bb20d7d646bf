use serde::{Deserialize, Serialize};
use super::column::Column;
use super::row::Row;
use super::error::DatabaseError;
use super::value::Value;

/// An append-only table ordered by its `rowtime` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    /// Position of the `rowtime` column in `columns`
    pub rowtime_index: usize,
    /// Highest rowtime stored so far (0 while empty)
    pub max_rowtime: i64,
}

impl Table {
    /// Build a table, prepending `rowtime BIGINT NOT NULL PRIMARY KEY` when it is missing.
    ///
    /// A declared `rowtime` must be a 64-bit integer and NOT NULL; it is always
    /// promoted to the primary key.
    pub fn new(name: String, mut columns: Vec<Column>) -> Result<Self, DatabaseError> {
        let rowtime_index = match columns.iter().position(Column::is_rowtime) {
            Some(idx) => {
                let col = &mut columns[idx];
                if !col.data_type.is_int64() {
                    return Err(DatabaseError::InvalidRowtime(format!(
                        "rowtime must be BIGINT, got {}",
                        col.data_type
                    )));
                }
                if col.nullable {
                    return Err(DatabaseError::InvalidRowtime(
                        "rowtime may not be nullable".to_string(),
                    ));
                }
                if col.default.is_some() {
                    return Err(DatabaseError::InvalidRowtime(
                        "rowtime may not declare a default".to_string(),
                    ));
                }
                col.primary_key = true;
                col.unique = true;
                idx
            }
            None => {
                columns.insert(0, Column::rowtime());
                0
            }
        };

        if let Some(pk) = columns.iter().find(|c| c.primary_key && !c.is_rowtime()) {
            return Err(DatabaseError::InvalidRowtime(format!(
                "rowtime is the primary key, '{}' cannot be one",
                pk.name
            )));
        }

        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name.eq_ignore_ascii_case(&col.name)) {
                return Err(DatabaseError::ParseError(format!(
                    "column '{}' specified more than once",
                    col.name
                )));
            }
        }

        Ok(Self {
            name,
            columns,
            rows: Vec::new(),
            rowtime_index,
            max_rowtime: 0,
        })
    }

    /// Append a fully-populated row, enforcing NOT NULL, UNIQUE and strictly increasing rowtime.
    pub fn insert(&mut self, row: Row) -> Result<(), DatabaseError> {
        if row.values.len() != self.columns.len() {
            return Err(DatabaseError::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: row.values.len(),
            });
        }

        for (idx, (col, value)) in self.columns.iter().zip(&row.values).enumerate() {
            if value.is_null() {
                if !col.nullable {
                    return Err(DatabaseError::NotNullViolation(col.name.clone()));
                }
                continue;
            }
            if col.unique && !col.is_rowtime() && self.rows.iter().any(|r| r.values[idx] == *value) {
                return Err(DatabaseError::UniqueViolation {
                    column: col.name.clone(),
                    value: value.to_string(),
                });
            }
        }

        let rowtime = match row.values[self.rowtime_index] {
            Value::Integer(t) if t > 0 => t,
            ref other => {
                return Err(DatabaseError::InvalidRowtime(format!(
                    "rowtime must be a positive integer, got {other}"
                )));
            }
        };
        // Streams read by rowtime window; a row landing below the high-water mark would never be seen
        if rowtime <= self.max_rowtime {
            return Err(DatabaseError::InvalidRowtime(format!(
                "rowtime {rowtime} is not above the current maximum {}",
                self.max_rowtime
            )));
        }

        self.max_rowtime = self.max_rowtime.max(rowtime);
        self.rows.push(row);
        Ok(())
    }

    /// Rowtime for a row inserted at `now_nanos`: the clock reading, or one past
    /// the current maximum when the clock has not moved beyond it.
    #[must_use]
    pub fn next_rowtime(&self, now_nanos: i64) -> i64 {
        now_nanos.max(self.max_rowtime.saturating_add(1))
    }

    #[must_use]
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }
}
