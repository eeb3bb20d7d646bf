// Storage module - data directory and WAL

mod disk;
pub mod wal;

pub use disk::StorageEngine;
pub use wal::{LogEntry, Operation, WalManager, WAL_FILE_NAME};
