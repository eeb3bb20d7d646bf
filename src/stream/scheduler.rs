//! The polling loop: bootstrap, idle waits, re-checks and per-table delta rounds.

use super::emitter::ResultEmitter;
use super::predicate::{Delta, PredicateInjector};
use super::tables::{AliasCollector, TableRef};
use super::watermark::{WatermarkSnapshot, WatermarkTracker};
use super::StreamError;
use crate::executor::{ExecutionContext, QueryEngine};
use crate::parser::{parse_statement, SelectStatement, Statement};
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default pause between re-checks when nothing changed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Strictly increasing execution ids, one per executed statement.
#[derive(Debug)]
pub struct ExecutionIds {
    next: u64,
}

impl ExecutionIds {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_context(&mut self) -> ExecutionContext {
        let ctx = ExecutionContext::new(self.next);
        self.next += 1;
        ctx
    }
}

impl Default for ExecutionIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Bootstrap plus completed or interrupted delta rounds
    pub rounds: u64,
    /// Bounded data queries executed (probes not counted)
    pub queries: u64,
    /// Rows written to the sink
    pub rows: u64,
}

#[derive(Debug)]
enum State {
    Bootstrap,
    IdleWait,
    Recheck,
    Delta(WatermarkSnapshot),
}

pub struct RoundScheduler<E: QueryEngine, W: Write> {
    engine: E,
    emitter: ResultEmitter<W>,
    ids: ExecutionIds,
    poll_interval: Duration,
    token: CancellationToken,
    summary: StreamSummary,
}

impl<E: QueryEngine, W: Write> RoundScheduler<E, W> {
    pub fn new(engine: E, emitter: ResultEmitter<W>, poll_interval: Duration, token: CancellationToken) -> Self {
        Self {
            engine,
            emitter,
            ids: ExecutionIds::new(),
            poll_interval,
            token,
            summary: StreamSummary::default(),
        }
    }

    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_parts(self) -> (E, ResultEmitter<W>) {
        (self.engine, self.emitter)
    }

    /// Parse `sql` and run it: SELECTs stream until cancelled, anything
    /// else executes once.
    pub async fn run(&mut self, sql: &str) -> Result<StreamSummary, StreamError> {
        let statement = parse_statement(sql).map_err(StreamError::Parse)?;
        match statement {
            Statement::Query(query) => self.stream(&query).await,
            _ => {
                let ctx = self.ids.next_context();
                let mut result = self.engine.execute(&ctx, sql).map_err(StreamError::Execution)?;
                self.summary.queries += 1;
                self.summary.rows += self.emitter.emit(&mut result)?;
                info!(tag = %result.tag, "statement executed");
                Ok(self.summary)
            }
        }
    }

    async fn stream(&mut self, query: &SelectStatement) -> Result<StreamSummary, StreamError> {
        let tables = AliasCollector::collect(query);
        info!(tables = tables.len(), "streaming query");

        let mut previous = WatermarkSnapshot::new();
        let mut state = State::Bootstrap;
        loop {
            state = match state {
                State::Bootstrap => {
                    let snapshot = self.snapshot(&tables)?;
                    let bounded = PredicateInjector::bound_statement(query, &snapshot, None);
                    self.summary.rounds += 1;
                    let rows = self.execute(&bounded)?;
                    previous = snapshot;
                    if rows == 0 { State::IdleWait } else { State::Recheck }
                }
                State::IdleWait => {
                    if !self.wait().await {
                        return Ok(self.finish());
                    }
                    State::Recheck
                }
                State::Recheck => {
                    let current = self.snapshot(&tables)?;
                    if current == previous {
                        State::IdleWait
                    } else {
                        State::Delta(current)
                    }
                }
                State::Delta(current) => {
                    self.summary.rounds += 1;
                    for table in &tables {
                        let delta = Delta {
                            table,
                            previous: previous.get(table).unwrap_or(0),
                        };
                        let bounded = PredicateInjector::bound_statement(query, &current, Some(delta));
                        if self.execute(&bounded)? == 0 && !self.wait().await {
                            return Ok(self.finish());
                        }
                    }
                    previous = current;
                    State::Recheck
                }
            };
        }
    }

    fn snapshot(&mut self, tables: &[TableRef]) -> Result<WatermarkSnapshot, StreamError> {
        WatermarkTracker::snapshot(&mut self.engine, &mut self.ids, tables)
    }

    /// Run one bounded statement and emit its rows.
    fn execute(&mut self, bounded: &SelectStatement) -> Result<u64, StreamError> {
        let sql = bounded.to_string();
        let ctx = self.ids.next_context();
        debug!(execution_id = ctx.execution_id, %sql, "bounded query");

        let mut result = self.engine.execute(&ctx, &sql).map_err(StreamError::Execution)?;
        let rows = self.emitter.emit(&mut result)?;
        self.summary.queries += 1;
        self.summary.rows += rows;
        Ok(rows)
    }

    /// Sleep for the poll interval; `false` when cancelled first.
    async fn wait(&self) -> bool {
        tokio::select! {
            biased;
            () = self.token.cancelled() => false,
            () = tokio::time::sleep(self.poll_interval) => true,
        }
    }

    fn finish(&self) -> StreamSummary {
        info!(
            rounds = self.summary.rounds,
            queries = self.summary.queries,
            rows = self.summary.rows,
            "stream cancelled"
        );
        self.summary
    }
}
