//! Per-table `max(rowtime)` probes.

use super::scheduler::ExecutionIds;
use super::tables::TableRef;
use super::StreamError;
use crate::executor::QueryEngine;
use crate::types::DatabaseError;
use tracing::trace;

/// High-water mark per table, in discovery order.
///
/// Each value is read by its own probe, so the snapshot is consistent per
/// table but not across tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatermarkSnapshot {
    entries: Vec<(TableRef, i64)>,
}

impl WatermarkSnapshot {
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Record a mark; a table already present is updated in place.
    pub fn insert(&mut self, table: TableRef, mark: i64) {
        match self.entries.iter_mut().find(|(t, _)| *t == table) {
            Some(entry) => entry.1 = mark,
            None => self.entries.push((table, mark)),
        }
    }

    #[must_use]
    pub fn get(&self, table: &TableRef) -> Option<i64> {
        self.entries.iter().find(|(t, _)| t == table).map(|(_, m)| *m)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableRef, i64)> {
        self.entries.iter().map(|(t, m)| (t, *m))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose table is among `tables`, keeping this snapshot's order.
    #[must_use]
    pub fn restrict(&self, tables: &[TableRef]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(t, _)| tables.contains(t))
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<(TableRef, i64)> for WatermarkSnapshot {
    fn from_iter<I: IntoIterator<Item = (TableRef, i64)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (table, mark) in iter {
            snapshot.insert(table, mark);
        }
        snapshot
    }
}

pub struct WatermarkTracker;

impl WatermarkTracker {
    /// Probe text for one table, addressed by name rather than alias.
    #[must_use]
    pub fn probe_sql(table: &TableRef) -> String {
        format!(
            "SELECT COALESCE(max(rowtime), 0) FROM \"{}\"",
            table.name.replace('"', "\"\"")
        )
    }

    /// Probe every table in order, each with a fresh execution id.
    /// Any failure aborts the whole snapshot.
    pub fn snapshot<E: QueryEngine>(
        engine: &mut E,
        ids: &mut ExecutionIds,
        tables: &[TableRef],
    ) -> Result<WatermarkSnapshot, StreamError> {
        let mut snapshot = WatermarkSnapshot::new();
        for table in tables {
            let mark = Self::probe(engine, ids, table)?;
            trace!(table = %table, mark, "watermark");
            snapshot.insert(table.clone(), mark);
        }
        Ok(snapshot)
    }

    fn probe<E: QueryEngine>(
        engine: &mut E,
        ids: &mut ExecutionIds,
        table: &TableRef,
    ) -> Result<i64, StreamError> {
        let failed = |source: DatabaseError| StreamError::Probe {
            table: table.name.clone(),
            source,
        };

        let mut result = engine
            .execute(&ids.next_context(), &Self::probe_sql(table))
            .map_err(failed)?;
        let Some(row) = result.rows.next_row().map_err(failed)? else {
            return Ok(0);
        };
        match row.first() {
            None => Ok(0),
            Some(value) => value.to_i64().ok_or_else(|| {
                failed(DatabaseError::TypeMismatch(format!(
                    "watermark '{value}' is not a 64-bit integer"
                )))
            }),
        }
    }
}
