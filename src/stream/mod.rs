//! Perpetual incremental SELECT.
//!
//! A query is run once over everything up to each table's current
//! `max(rowtime)`, then again per table over only the rows appended since,
//! forever:
//!
//! - [`tables`]: which base tables a statement reads
//! - [`watermark`]: per-table `max(rowtime)` snapshots
//! - [`predicate`]: rowtime bounds conjoined into WHERE clauses
//! - [`scheduler`]: the bootstrap / idle / re-check / delta loop
//! - [`emitter`]: rows out as JSON lines

pub mod emitter;
pub mod predicate;
pub mod scheduler;
pub mod tables;
pub mod watermark;

pub use emitter::{OutputFormat, ResultEmitter};
pub use predicate::{Delta, PredicateInjector};
pub use scheduler::{DEFAULT_POLL_INTERVAL, ExecutionIds, RoundScheduler, StreamSummary};
pub use tables::{AliasCollector, TableRef};
pub use watermark::{WatermarkSnapshot, WatermarkTracker};

use crate::types::DatabaseError;
use thiserror::Error;

/// Fatal streaming failures; the loop never retries.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Parse error: {0}")]
    Parse(#[source] DatabaseError),

    #[error("Watermark probe failed for table '{table}': {source}")]
    Probe {
        table: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Query execution failed: {0}")]
    Execution(#[source] DatabaseError),

    #[error("Failed to write output: {0}")]
    Emit(#[from] std::io::Error),
}
