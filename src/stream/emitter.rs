//! Newline-delimited JSON output of result rows.

use super::StreamError;
use crate::executor::QueryResult;
use crate::types::Value;
use serde::Deserialize;
use std::io::{self, Write};

/// Shape of one output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `[v1, v2, ...]`
    #[default]
    Array,
    /// `{"col1": v1, "col2": v2, ...}`
    Object,
}

/// Drains cursors to a sink, one flushed line per row.
pub struct ResultEmitter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> ResultEmitter<W> {
    pub const fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub const fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write every remaining row of `result`; returns how many were written.
    pub fn emit(&mut self, result: &mut QueryResult) -> Result<u64, StreamError> {
        let keys = match self.format {
            OutputFormat::Array => Vec::new(),
            OutputFormat::Object => object_keys(&result.columns),
        };

        let mut count = 0;
        while let Some(row) = result.rows.next_row().map_err(StreamError::Execution)? {
            let record = match self.format {
                OutputFormat::Array => serde_json::Value::Array(row.iter().map(Value::to_json).collect()),
                OutputFormat::Object => serde_json::Value::Object(
                    keys.iter().cloned().zip(row.iter().map(Value::to_json)).collect(),
                ),
            };
            self.write_record(&record)?;
            count += 1;
        }
        Ok(count)
    }

    fn write_record(&mut self, record: &serde_json::Value) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record).map_err(io::Error::from)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Column names as object keys; a repeated name gets its 1-based position appended.
fn object_keys(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if columns[..idx].contains(name) {
                format!("{name}_{}", idx + 1)
            } else {
                name.clone()
            }
        })
        .collect()
}
