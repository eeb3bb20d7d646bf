/// Executor module - handles SQL statement execution
///
/// Structure:
/// - conditions: expression evaluation (WHERE, projections, aggregates)
/// - queries: SELECT operations (joins, group by, order, union)
/// - dml: INSERT
/// - ddl: CREATE/DROP TABLE, SHOW TABLES
///
/// [`Engine`] ties them to a [`StorageEngine`] and exposes the
/// "execute statement, get a row cursor" primitive through [`QueryEngine`].

pub mod conditions;
pub mod ddl;
pub mod dml;
pub mod queries;

pub use conditions::{Binding, EvalContext, ExprEvaluator};
pub use ddl::DdlExecutor;
pub use dml::DmlExecutor;
pub use queries::{QueryExecutor, Relation, DUAL_TABLE};

use crate::parser::{parse_statement, Statement};
use crate::storage::StorageEngine;
use crate::types::{Database, DatabaseError, Value};
use std::path::Path;
use tracing::debug;

/// Per-execution identity handed to the engine with every statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub execution_id: u64,
}

impl ExecutionContext {
    #[must_use]
    pub const fn new(execution_id: u64) -> Self {
        Self { execution_id }
    }
}

/// Single-use cursor over a statement's result rows.
#[derive(Debug)]
pub struct RowCursor {
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl RowCursor {
    #[must_use]
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self { rows: rows.into_iter() }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Next row, or `Ok(None)` once the result is exhausted.
    pub fn next_row(&mut self) -> Result<Option<Vec<Value>>, DatabaseError> {
        Ok(self.rows.next())
    }
}

/// Outcome of one statement: column names, rows and a command tag
/// (`SELECT 3`, `INSERT 0 2`, `CREATE TABLE`, ...).
#[derive(Debug)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: RowCursor,
    pub tag: String,
}

impl QueryResult {
    fn command(tag: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: RowCursor::empty(),
            tag: tag.into(),
        }
    }

    fn relation(relation: Relation) -> Self {
        Self {
            columns: relation.column_names(),
            tag: format!("SELECT {}", relation.rows.len()),
            rows: RowCursor::new(relation.rows),
        }
    }
}

/// Synchronous SQL execution.
pub trait QueryEngine {
    fn execute(&mut self, ctx: &ExecutionContext, sql: &str) -> Result<QueryResult, DatabaseError>;
}

/// In-process engine over a data directory.
///
/// The in-memory database is the WAL replayed up to the last catch-up. A
/// catch-up runs whenever a new execution id is seen, so rows appended by
/// other processes become visible between executions and never within one.
pub struct Engine {
    db: Database,
    storage: StorageEngine,
    last_execution: Option<u64>,
}

impl Engine {
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        let mut storage = StorageEngine::new(data_dir)?;
        let mut db = Database::new("main".to_string());
        let applied = storage.catch_up(&mut db)?;
        debug!(data_dir = %storage.data_dir().display(), applied, "engine opened");

        Ok(Self {
            db,
            storage,
            last_execution: None,
        })
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Apply WAL entries written since the last catch-up.
    pub fn refresh(&mut self) -> Result<usize, DatabaseError> {
        self.storage.catch_up(&mut self.db)
    }

    fn enter(&mut self, ctx: &ExecutionContext) -> Result<(), DatabaseError> {
        if self.last_execution != Some(ctx.execution_id) {
            self.refresh()?;
            self.last_execution = Some(ctx.execution_id);
        }
        Ok(())
    }

    pub fn execute_statement(
        &mut self,
        ctx: &ExecutionContext,
        stmt: &Statement,
    ) -> Result<QueryResult, DatabaseError> {
        self.enter(ctx)?;

        match stmt {
            Statement::CreateTable { name, columns, if_not_exists } => {
                DdlExecutor::create_table(&mut self.db, &mut self.storage, name, columns, *if_not_exists)?;
                Ok(QueryResult::command("CREATE TABLE"))
            }
            Statement::DropTable { name, if_exists } => {
                DdlExecutor::drop_table(&mut self.db, &mut self.storage, name, *if_exists)?;
                Ok(QueryResult::command("DROP TABLE"))
            }
            Statement::Insert { table, columns, rows } => {
                let count = DmlExecutor::insert(
                    &mut self.db,
                    &mut self.storage,
                    table,
                    columns.as_deref(),
                    rows,
                )?;
                Ok(QueryResult::command(format!("INSERT 0 {count}")))
            }
            Statement::ShowTables => Ok(QueryResult::relation(DdlExecutor::show_tables(&self.db))),
            Statement::Query(query) => Ok(QueryResult::relation(QueryExecutor::execute(&self.db, query)?)),
        }
    }
}

impl QueryEngine for Engine {
    fn execute(&mut self, ctx: &ExecutionContext, sql: &str) -> Result<QueryResult, DatabaseError> {
        let stmt = parse_statement(sql)?;
        self.execute_statement(ctx, &stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Session {
        engine: Engine,
        next_id: u64,
    }

    impl Session {
        fn open(dir: &TempDir) -> Self {
            Self { engine: Engine::open(dir.path()).unwrap(), next_id: 0 }
        }

        fn run(&mut self, sql: &str) -> Result<QueryResult, DatabaseError> {
            self.next_id += 1;
            self.engine.execute(&ExecutionContext::new(self.next_id), sql)
        }

        fn rows(&mut self, sql: &str) -> Vec<Vec<Value>> {
            let mut result = self.run(sql).unwrap();
            let mut rows = Vec::new();
            while let Some(row) = result.rows.next_row().unwrap() {
                rows.push(row);
            }
            rows
        }

        fn column_names(&mut self, sql: &str) -> Vec<String> {
            self.run(sql).unwrap().columns
        }
    }

    fn int(i: i64) -> Value {
        Value::Integer(i)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn fixture() -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        let mut s = Session::open(&dir);
        s.run("CREATE TABLE users (id INTEGER NOT NULL, name TEXT, city TEXT)").unwrap();
        s.run("CREATE TABLE orders (user_id INTEGER, amount INTEGER)").unwrap();
        s.run(
            "INSERT INTO users VALUES (10, 1, 'Alice', 'Paris'), (20, 2, 'Bob', 'Oslo'), (30, 3, 'Carol', 'Paris')",
        )
        .unwrap();
        s.run("INSERT INTO orders VALUES (5, 1, 100), (6, 1, 50), (7, 2, 70), (8, 9, 10)").unwrap();
        (dir, s)
    }

    #[test]
    fn test_command_tags() {
        let dir = TempDir::new().unwrap();
        let mut s = Session::open(&dir);
        assert_eq!(s.run("CREATE TABLE t (v INTEGER)").unwrap().tag, "CREATE TABLE");
        assert_eq!(s.run("INSERT INTO t (v) VALUES (1), (2)").unwrap().tag, "INSERT 0 2");
        assert_eq!(s.run("SELECT v FROM t").unwrap().tag, "SELECT 2");
        assert_eq!(s.run("DROP TABLE t").unwrap().tag, "DROP TABLE");
    }

    #[test]
    fn test_select_where_order_limit() {
        let (_dir, mut s) = fixture();
        assert_eq!(
            s.rows("SELECT name FROM users WHERE city = 'Paris' ORDER BY rowtime DESC"),
            vec![vec![text("Carol")], vec![text("Alice")]]
        );
        assert_eq!(
            s.rows("SELECT id FROM users ORDER BY id LIMIT 1 OFFSET 1"),
            vec![vec![int(2)]]
        );
        assert_eq!(s.rows("SELECT DISTINCT city FROM users ORDER BY 1").len(), 2);
    }

    #[test]
    fn test_watermark_probe() {
        let (_dir, mut s) = fixture();
        assert_eq!(s.rows("SELECT COALESCE(max(rowtime), 0) FROM \"users\""), vec![vec![int(30)]]);
        s.run("CREATE TABLE empty (v INTEGER)").unwrap();
        assert_eq!(s.rows("SELECT COALESCE(max(rowtime), 0) FROM \"empty\""), vec![vec![int(0)]]);
    }

    #[test]
    fn test_joins() {
        let (_dir, mut s) = fixture();
        assert_eq!(
            s.rows(
                "SELECT u.name, o.amount FROM users u JOIN orders o ON o.user_id = u.id \
                 ORDER BY o.amount"
            ),
            vec![
                vec![text("Alice"), int(50)],
                vec![text("Bob"), int(70)],
                vec![text("Alice"), int(100)],
            ]
        );
        assert_eq!(
            s.rows(
                "SELECT u.name, o.amount FROM users u LEFT JOIN orders o ON o.user_id = u.id \
                 WHERE o.amount IS NULL"
            ),
            vec![vec![text("Carol"), Value::Null]]
        );
        assert_eq!(
            s.rows(
                "SELECT o.amount FROM users u RIGHT JOIN orders o ON o.user_id = u.id \
                 WHERE u.id IS NULL"
            ),
            vec![vec![int(10)]]
        );
        assert_eq!(s.rows("SELECT * FROM users, orders").len(), 12);
        assert_eq!(s.rows("SELECT * FROM users CROSS JOIN orders").len(), 12);
    }

    #[test]
    fn test_ambiguous_column() {
        let (_dir, mut s) = fixture();
        assert!(matches!(
            s.run("SELECT rowtime FROM users, orders"),
            Err(DatabaseError::AmbiguousColumn(_))
        ));
    }

    #[test]
    fn test_group_by_having() {
        let (_dir, mut s) = fixture();
        assert_eq!(
            s.rows(
                "SELECT user_id, SUM(amount) AS total, COUNT(*) FROM orders \
                 GROUP BY user_id HAVING COUNT(*) >= 1 ORDER BY total DESC"
            ),
            vec![
                vec![int(1), int(150), int(2)],
                vec![int(2), int(70), int(1)],
                vec![int(9), int(10), int(1)],
            ]
        );
        assert_eq!(
            s.column_names("SELECT user_id, SUM(amount) AS total, COUNT(*) FROM orders GROUP BY user_id"),
            vec!["user_id", "total", "count"]
        );
        // Aggregates over an empty input still produce one row
        assert_eq!(
            s.rows("SELECT COUNT(*), SUM(amount) FROM orders WHERE amount > 1000"),
            vec![vec![int(0), Value::Null]]
        );
    }

    #[test]
    fn test_subquery_and_union() {
        let (_dir, mut s) = fixture();
        assert_eq!(
            s.rows("SELECT sub.name FROM (SELECT name, city FROM users WHERE id > 1) sub WHERE sub.city = 'Oslo'"),
            vec![vec![text("Bob")]]
        );
        assert_eq!(
            s.rows("SELECT city FROM users UNION SELECT city FROM users ORDER BY city"),
            vec![vec![text("Oslo")], vec![text("Paris")]]
        );
        assert_eq!(s.rows("SELECT city FROM users UNION ALL SELECT city FROM users").len(), 6);
        assert!(matches!(
            s.run("SELECT id, name FROM users UNION SELECT id FROM users"),
            Err(DatabaseError::ColumnCountMismatch { .. })
        ));
    }

    #[test]
    fn test_dual_and_no_from() {
        let (_dir, mut s) = fixture();
        assert_eq!(s.rows("SELECT 1 + 2 AS three FROM dual"), vec![vec![int(3)]]);
        assert_eq!(s.rows("SELECT 'x' || 'y'"), vec![vec![text("xy")]]);
        assert_eq!(s.column_names("SELECT 1 + 2"), vec!["?column?"]);
    }

    #[test]
    fn test_show_tables() {
        let (_dir, mut s) = fixture();
        assert_eq!(s.column_names("SHOW TABLES"), vec!["table_name"]);
        assert_eq!(s.rows("SHOW TABLES"), vec![vec![text("orders")], vec![text("users")]]);
    }

    #[test]
    fn test_second_engine_sees_appends_on_new_execution() {
        let (dir, mut writer) = fixture();
        let mut reader = Session::open(&dir);
        assert_eq!(reader.rows("SELECT id FROM users").len(), 3);

        writer.run("INSERT INTO users VALUES (40, 4, 'Dan', 'Rome')").unwrap();

        // Same execution id: the view is stable
        let ctx = ExecutionContext::new(reader.next_id);
        let mut same = reader.engine.execute(&ctx, "SELECT id FROM users").unwrap();
        let mut count = 0;
        while same.rows.next_row().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);

        assert_eq!(reader.rows("SELECT id FROM users").len(), 4);
    }

    #[test]
    fn test_reopen_replays_wal() {
        let (dir, s) = fixture();
        drop(s);
        let mut reopened = Session::open(&dir);
        assert_eq!(reopened.rows("SELECT name FROM users WHERE rowtime = 20"), vec![vec![text("Bob")]]);
        assert_eq!(reopened.engine.database().tables.len(), 2);
    }

    #[test]
    fn test_insert_column_list_must_match_values() {
        let dir = TempDir::new().unwrap();
        let mut s = Session::open(&dir);
        s.run("CREATE TABLE t (v INTEGER)").unwrap();
        assert!(matches!(
            s.run("INSERT INTO t (rowtime, v) VALUES (5)"),
            Err(DatabaseError::ColumnCountMismatch { expected: 2, actual: 1 })
        ));
        assert!(s.rows("SELECT v FROM t").is_empty());

        // Only an implicit column list may leave rowtime out
        s.run("INSERT INTO t VALUES (5)").unwrap();
        assert_eq!(s.rows("SELECT v FROM t"), vec![vec![int(5)]]);
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let mut s = Session::open(&dir);
        assert!(matches!(s.run("SELEKT 1"), Err(DatabaseError::ParseError(_))));
    }
}
