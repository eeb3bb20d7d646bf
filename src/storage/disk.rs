use crate::types::{Database, DatabaseError, Row, Table};
use crate::storage::wal::{Operation, WalManager};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Каталог данных + журнал
///
/// The database image is never written as a whole: it is the replay of the
/// WAL, brought up to date with [`StorageEngine::catch_up`].
pub struct StorageEngine {
    data_dir: PathBuf,
    wal: WalManager,
}

impl StorageEngine {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let wal = WalManager::new(&data_dir)?;

        Ok(Self { data_dir, wal })
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Применяет к `db` все записи журнала, появившиеся с прошлого вызова
    ///
    /// An entry that no longer applies (two writers raced on the same table)
    /// is logged and skipped. Returns the number of entries applied.
    pub fn catch_up(&mut self, db: &mut Database) -> Result<usize, DatabaseError> {
        let entries = self.wal.read_new_entries()?;
        let mut applied = 0;
        for entry in &entries {
            match WalManager::apply_operation(db, &entry.operation) {
                Ok(()) => applied += 1,
                Err(e) => warn!(sequence = entry.sequence, error = %e, "skipping WAL entry"),
            }
        }
        if !entries.is_empty() {
            debug!(applied, read = entries.len(), offset = self.wal.read_offset(), "WAL catch-up");
        }
        Ok(applied)
    }

    pub fn log_create_table(&mut self, table: &Table) -> Result<u64, DatabaseError> {
        self.wal.append(Operation::CreateTable {
            table_name: table.name.clone(),
            table: table.clone(),
        })
    }

    pub fn log_drop_table(&mut self, table_name: &str) -> Result<u64, DatabaseError> {
        self.wal.append(Operation::DropTable {
            table_name: table_name.to_string(),
        })
    }

    pub fn log_insert(&mut self, table_name: &str, row: &Row) -> Result<u64, DatabaseError> {
        self.wal.append(Operation::Insert {
            table_name: table_name.to_string(),
            row: row.clone(),
        })
    }
}
