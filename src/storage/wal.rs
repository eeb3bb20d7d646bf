use crate::types::{Database, DatabaseError, Row, Table};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Имя файла журнала внутри каталога данных
pub const WAL_FILE_NAME: &str = "streamql.wal";

/// Размер префикса длины у каждого фрейма
const FRAME_HEADER_LEN: usize = 4;

/// Типы операций, записываемых в WAL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    /// CREATE TABLE
    CreateTable {
        table_name: String,
        table: Table,
    },
    /// DROP TABLE
    DropTable {
        table_name: String,
    },
    /// INSERT INTO (одна строка на запись)
    Insert {
        table_name: String,
        row: Row,
    },
}

/// Запись в WAL логе
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Порядковый номер (LSN - Log Sequence Number)
    pub sequence: u64,
    /// Timestamp когда операция была выполнена
    pub timestamp: u64,
    /// Операция
    pub operation: Operation,
}

impl LogEntry {
    #[must_use]
    pub fn new(sequence: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        Self {
            sequence,
            timestamp,
            operation,
        }
    }
}

/// Write-Ahead Log Manager
///
/// Один файл, только дозапись. Каждый фрейм: длина `u32` (LE) + `bincode(LogEntry)`.
/// Читатель помнит смещение конца последнего целого фрейма и при следующем
/// чтении разбирает только новые байты, поэтому видит записи других процессов.
pub struct WalManager {
    /// Путь к файлу журнала
    path: PathBuf,
    /// Дескриптор для дозаписи
    file: File,
    /// Последний известный sequence number
    current_sequence: u64,
    /// Смещение после последнего прочитанного целого фрейма
    read_offset: u64,
}

impl WalManager {
    /// Открывает (или создает) журнал в каталоге данных
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        fs::create_dir_all(data_dir.as_ref())?;
        let path = data_dir.as_ref().join(WAL_FILE_NAME);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;

        Ok(Self {
            path,
            file,
            current_sequence: 0,
            read_offset: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn current_sequence(&self) -> u64 {
        self.current_sequence
    }

    #[must_use]
    pub const fn read_offset(&self) -> u64 {
        self.read_offset
    }

    /// Записывает операцию в WAL (весь фрейм одним `write_all`)
    pub fn append(&mut self, operation: Operation) -> Result<u64, DatabaseError> {
        self.current_sequence += 1;
        let entry = LogEntry::new(self.current_sequence, operation);

        // Сериализуем в bincode
        let encoded = bincode::serialize(&entry)
            .map_err(|e| DatabaseError::BinarySerialization(e.to_string()))?;
        let len = u32::try_from(encoded.len())
            .map_err(|_| DatabaseError::BinarySerialization("WAL entry too large".to_string()))?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + encoded.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&encoded);

        self.file.write_all(&frame)?;
        self.file.flush()?;

        debug!(sequence = self.current_sequence, bytes = frame.len(), "WAL append");
        Ok(self.current_sequence)
    }

    /// Читает записи, появившиеся после предыдущего вызова
    ///
    /// Обрезанный хвостовой фрейм (писатель еще не закончил) не трогаем:
    /// он будет прочитан в следующий раз.
    pub fn read_new_entries(&mut self) -> Result<Vec<LogEntry>, DatabaseError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.read_offset))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let (entries, consumed) = Self::parse_frames(&data);
        self.read_offset += consumed as u64;
        if let Some(last) = entries.iter().map(|e| e.sequence).max() {
            self.current_sequence = self.current_sequence.max(last);
        }
        Ok(entries)
    }

    /// Разбирает целые фреймы из буфера; возвращает записи и число использованных байт
    fn parse_frames(data: &[u8]) -> (Vec<LogEntry>, usize) {
        let mut entries = Vec::new();
        let mut pos = 0;

        while data.len() - pos >= FRAME_HEADER_LEN {
            let mut len_bytes = [0u8; FRAME_HEADER_LEN];
            len_bytes.copy_from_slice(&data[pos..pos + FRAME_HEADER_LEN]);
            let len = u32::from_le_bytes(len_bytes) as usize;

            let start = pos + FRAME_HEADER_LEN;
            if data.len() - start < len {
                break;
            }

            match bincode::deserialize::<LogEntry>(&data[start..start + len]) {
                Ok(entry) => entries.push(entry),
                // Продолжаем, игнорируя поврежденные записи
                Err(e) => warn!(offset = pos, error = %e, "skipping unreadable WAL entry"),
            }
            pos = start + len;
        }

        (entries, pos)
    }

    /// Применяет операцию к базе данных
    pub fn apply_operation(db: &mut Database, operation: &Operation) -> Result<(), DatabaseError> {
        match operation {
            Operation::CreateTable { table_name, table } => {
                if db.get_table(table_name).is_none() {
                    db.create_table(table.clone())?;
                }
            }
            Operation::DropTable { table_name } => {
                db.drop_table(table_name).ok(); // Игнорируем ошибки
            }
            Operation::Insert { table_name, row } => {
                db.get_table_mut(table_name)
                    .ok_or_else(|| DatabaseError::TableNotFound(table_name.clone()))?
                    .insert(row.clone())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, DataType, Value};
    use tempfile::TempDir;

    fn users_table() -> Table {
        let columns = vec![Column {
            name: "name".to_string(),
            data_type: DataType::Text,
            nullable: true,
            primary_key: false,
            unique: false,
            default: None,
        }];
        Table::new("users".to_string(), columns).unwrap()
    }

    fn insert(rowtime: i64, name: &str) -> Operation {
        Operation::Insert {
            table_name: "users".to_string(),
            row: Row::new(vec![Value::Integer(rowtime), Value::Text(name.to_string())]),
        }
    }

    #[test]
    fn test_wal_creation() {
        let temp_dir = TempDir::new().unwrap();
        let wal = WalManager::new(temp_dir.path()).unwrap();

        assert_eq!(wal.current_sequence(), 0);
        assert!(wal.path().exists());
    }

    #[test]
    fn test_wal_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut wal = WalManager::new(temp_dir.path()).unwrap();

        let seq = wal
            .append(Operation::CreateTable {
                table_name: "users".to_string(),
                table: users_table(),
            })
            .unwrap();
        assert_eq!(seq, 1);

        let logs = wal.read_new_entries().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].sequence, 1);

        // Nothing new on the second read
        assert!(wal.read_new_entries().unwrap().is_empty());
    }

    #[test]
    fn test_wal_tail_sees_other_writer() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = WalManager::new(temp_dir.path()).unwrap();
        let mut reader = WalManager::new(temp_dir.path()).unwrap();

        writer
            .append(Operation::CreateTable {
                table_name: "users".to_string(),
                table: users_table(),
            })
            .unwrap();
        assert_eq!(reader.read_new_entries().unwrap().len(), 1);

        writer.append(insert(10, "a")).unwrap();
        writer.append(insert(20, "b")).unwrap();
        let entries = reader.read_new_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(reader.current_sequence(), 3);
    }

    #[test]
    fn test_wal_truncated_frame_is_left_for_later() {
        let temp_dir = TempDir::new().unwrap();
        let mut wal = WalManager::new(temp_dir.path()).unwrap();
        wal.append(insert(10, "a")).unwrap();

        let full = fs::read(wal.path()).unwrap();
        let frame_len = full.len();

        // Append half of a second frame by hand
        let entry = bincode::serialize(&LogEntry::new(2, insert(20, "b"))).unwrap();
        let mut partial = (entry.len() as u32).to_le_bytes().to_vec();
        partial.extend_from_slice(&entry[..entry.len() / 2]);
        let mut file = OpenOptions::new().append(true).open(wal.path()).unwrap();
        file.write_all(&partial).unwrap();

        assert_eq!(wal.read_new_entries().unwrap().len(), 1);
        assert_eq!(wal.read_offset(), frame_len as u64);

        // Writer finishes the frame
        file.write_all(&entry[entry.len() / 2..]).unwrap();
        let entries = wal.read_new_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sequence, 2);
    }

    #[test]
    fn test_wal_apply_operations() {
        let mut db = Database::new("test".to_string());

        let op = Operation::CreateTable {
            table_name: "users".to_string(),
            table: users_table(),
        };
        WalManager::apply_operation(&mut db, &op).unwrap();
        assert!(db.get_table("users").is_some());

        WalManager::apply_operation(&mut db, &insert(10, "a")).unwrap();
        let table = db.get_table("users").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.max_rowtime, 10);

        // Out-of-order rowtime is rejected
        assert!(WalManager::apply_operation(&mut db, &insert(5, "b")).is_err());

        WalManager::apply_operation(
            &mut db,
            &Operation::DropTable { table_name: "users".to_string() },
        )
        .unwrap();
        assert!(db.get_table("users").is_none());
    }
}
