// streamql - perpetual incremental SELECT over append-only rowtime tables
// Small embedded SQL engine + polling/rewriting stream core

// Clippy configuration - allow non-critical warnings
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::type_complexity)]

// Core data structures (values, tables, database image)
pub mod core;

// Re-export all core types as types module
pub mod types {
    pub use crate::core::*;
}

// SQL parser (DDL, DML, queries, meta-commands)
pub mod parser;

// Statement execution (SELECT pipeline, INSERT, CREATE/DROP)
pub mod executor;

// Data directory and WAL
pub mod storage;

// Incremental query loop (discovery, watermarks, bound injection, rounds, output)
pub mod stream;

// CLI arguments and layered settings
pub mod config;

// Re-export commonly used types for convenience
pub use crate::core::{Column, DataType, Database, DatabaseError, Row, Table, Value};
pub use parser::{parse_statement, Statement};
pub use executor::{Engine, ExecutionContext, QueryEngine, QueryResult, RowCursor};
pub use storage::StorageEngine;
pub use stream::{OutputFormat, ResultEmitter, RoundScheduler, StreamError, StreamSummary};
