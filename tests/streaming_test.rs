// End-to-end: a writer engine appends while a scheduler streams from the same data directory
use std::time::Duration;
use streamql::parser::{parse_statement, Statement};
use streamql::stream::OutputFormat;
use streamql::{Engine, ExecutionContext, QueryEngine, ResultEmitter, RoundScheduler, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(20);

struct Writer {
    engine: Engine,
    next_id: u64,
}

impl Writer {
    fn open(dir: &TempDir) -> Self {
        Self { engine: Engine::open(dir.path()).unwrap(), next_id: 0 }
    }

    fn run(&mut self, sql: &str) -> Vec<Vec<Value>> {
        self.next_id += 1;
        let mut result = self
            .engine
            .execute(&ExecutionContext::new(self.next_id), sql)
            .unwrap();
        let mut rows = Vec::new();
        while let Some(row) = result.rows.next_row().unwrap() {
            rows.push(row);
        }
        rows
    }
}

fn records(bytes: Vec<u8>) -> Vec<serde_json::Value> {
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_every_row_delivered_exactly_once() {
    let dir = TempDir::new().unwrap();
    let mut writer = Writer::open(&dir);
    writer.run("CREATE TABLE events (kind TEXT, v INTEGER)");
    writer.run("INSERT INTO events (kind, v) VALUES ('a', 1), ('b', 2)");

    let token = CancellationToken::new();
    let mut scheduler = RoundScheduler::new(
        Engine::open(dir.path()).unwrap(),
        ResultEmitter::new(Vec::new(), OutputFormat::Array),
        TICK,
        token.clone(),
    );

    let driver = async {
        for batch in 0..3 {
            tokio::time::sleep(TICK * 4).await;
            writer.run(&format!(
                "INSERT INTO events (kind, v) VALUES ('a', {}), ('c', {})",
                batch * 10 + 3,
                batch * 10 + 4
            ));
        }
        tokio::time::sleep(TICK * 10).await;
        token.cancel();
    };
    let (summary, ()) = tokio::join!(
        scheduler.run("SELECT rowtime, v FROM events WHERE kind <> 'c'"),
        driver
    );
    let summary = summary.unwrap();

    let all = writer.run("SELECT rowtime FROM events WHERE kind <> 'c' ORDER BY rowtime");
    let expected: Vec<i64> = all.iter().filter_map(|r| r[0].to_i64()).collect();
    assert_eq!(expected.len(), 5);

    let (_, emitter) = scheduler.into_parts();
    let delivered: Vec<i64> = records(emitter.into_inner())
        .iter()
        .map(|r| r[0].as_i64().unwrap())
        .collect();
    assert_eq!(delivered, expected);
    assert_eq!(summary.rows, 5);
}

#[tokio::test]
async fn test_union_branches_stream_independently() {
    let dir = TempDir::new().unwrap();
    let mut writer = Writer::open(&dir);
    writer.run("CREATE TABLE a (v INTEGER)");
    writer.run("CREATE TABLE b (v INTEGER)");
    writer.run("INSERT INTO a VALUES (10, 1)");
    writer.run("INSERT INTO B VALUES (11, 2)");

    let token = CancellationToken::new();
    let mut scheduler = RoundScheduler::new(
        Engine::open(dir.path()).unwrap(),
        ResultEmitter::new(Vec::new(), OutputFormat::Array),
        TICK,
        token.clone(),
    );

    let driver = async {
        tokio::time::sleep(TICK * 4).await;
        writer.run("INSERT INTO a VALUES (12, 3)");
        tokio::time::sleep(TICK * 4).await;
        writer.run("INSERT INTO b VALUES (13, 4)");
        tokio::time::sleep(TICK * 10).await;
        token.cancel();
    };
    let (summary, ()) = tokio::join!(
        scheduler.run("SELECT rowtime FROM a UNION ALL SELECT rowtime FROM b UNION ALL SELECT rowtime FROM B"),
        driver
    );
    summary.unwrap();

    let (_, emitter) = scheduler.into_parts();
    let mut delivered: Vec<i64> = records(emitter.into_inner())
        .iter()
        .map(|r| r[0].as_i64().unwrap())
        .collect();
    delivered.sort_unstable();
    assert_eq!(delivered, vec![10, 11, 11, 12, 13, 13]);
}

#[tokio::test]
async fn test_object_format_through_subquery() {
    let dir = TempDir::new().unwrap();
    let mut writer = Writer::open(&dir);
    writer.run("CREATE TABLE users (name TEXT NOT NULL, age INTEGER)");
    writer.run("INSERT INTO users VALUES (10, 'ann', 31), (20, 'bo', 17)");

    let token = CancellationToken::new();
    token.cancel();
    let mut scheduler = RoundScheduler::new(
        Engine::open(dir.path()).unwrap(),
        ResultEmitter::new(Vec::new(), OutputFormat::Object),
        TICK,
        token,
    );
    scheduler
        .run("SELECT adults.name FROM (SELECT name FROM users WHERE age >= 18) adults")
        .await
        .unwrap();

    let (_, emitter) = scheduler.into_parts();
    assert_eq!(records(emitter.into_inner()), vec![serde_json::json!({"name": "ann"})]);
}

#[test]
fn test_generated_rowtimes_increase_across_engines() {
    let dir = TempDir::new().unwrap();
    let mut first = Writer::open(&dir);
    first.run("CREATE TABLE t (v INTEGER)");
    first.run("INSERT INTO t (v) VALUES (1), (2)");

    let mut second = Writer::open(&dir);
    second.run("INSERT INTO t (v) VALUES (3)");
    first.run("INSERT INTO t (v) VALUES (4)");

    let rows = second.run("SELECT rowtime, v FROM t");
    let values: Vec<i64> = rows.iter().filter_map(|r| r[1].to_i64()).collect();
    assert_eq!(values, vec![1, 2, 3, 4]);
    let times: Vec<i64> = rows.iter().filter_map(|r| r[0].to_i64()).collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_parse_display_parse_is_stable() {
    for sql in [
        "SELECT DISTINCT a.x, COUNT(*) AS n FROM a LEFT JOIN b ON a.id = b.id WHERE NOT a.x IS NULL GROUP BY a.x HAVING COUNT(*) > 1 ORDER BY n DESC LIMIT 5",
        "SELECT * FROM (SELECT v FROM t WHERE v BETWEEN -1 AND 10) s, u CROSS JOIN w",
        "SELECT x FROM a UNION ALL (SELECT x FROM b) ORDER BY 1",
        "INSERT INTO t (a, b) VALUES (1, 'it''s'), (NULL, 2.5)",
        "CREATE TABLE IF NOT EXISTS t (rowtime BIGINT NOT NULL, v TEXT DEFAULT 'x')",
    ] {
        let first = parse_statement(sql).unwrap();
        let second = parse_statement(&first.to_string()).unwrap();
        assert_eq!(first, second, "{sql}");
    }
    assert!(matches!(parse_statement("SHOW TABLES").unwrap(), Statement::ShowTables));
}
