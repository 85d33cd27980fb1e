use super::*;
use crate::config::SessionConfig;
use crate::dialect::{DialectKind, MSSQL, MYSQL, POSTGRES};
use crate::error::{BuildError, SqlError};
use crate::event::{EventReceiver, StatsReceiver};
use crate::params;
use std::sync::Mutex;
use std::time::Duration;
use tokio_postgres::Row;

/// Runner double that records every statement it is handed.
#[derive(Default)]
struct RecordingRunner {
    statements: Mutex<Vec<(String, usize)>>,
    exec_result: ExecResult,
    returned_id: Option<i64>,
    fail: bool,
}

impl RecordingRunner {
    fn with_last_insert_id(id: i64) -> Self {
        Self {
            exec_result: ExecResult {
                rows_affected: 1,
                last_insert_id: Some(id),
            },
            ..Self::default()
        }
    }

    fn returning_id(id: i64) -> Self {
        Self {
            returned_id: Some(id),
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn record(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<()> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.len()));
        if self.fail {
            return Err(SqlError::Connection("connection reset".to_string()));
        }
        Ok(())
    }

    fn last_sql(&self) -> String {
        self.statements.lock().unwrap().last().unwrap().0.clone()
    }

    fn last_param_count(&self) -> usize {
        self.statements.lock().unwrap().last().unwrap().1
    }
}

impl Runner for RecordingRunner {
    async fn exec(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<ExecResult> {
        self.record(sql, params)?;
        Ok(self.exec_result)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
        self.record(sql, params)?;
        Ok(Vec::new())
    }

    async fn query_id(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> SqlResult<Option<i64>> {
        self.record(sql, params)?;
        Ok(self.returned_id)
    }
}

#[derive(Debug)]
struct Person {
    id: i64,
    name: String,
    email: Option<String>,
}

impl Record for Person {
    fn columns() -> &'static [&'static str] {
        &["id", "name", "email"]
    }

    fn id_column() -> Option<&'static str> {
        Some("id")
    }

    fn value(&self, column: &str) -> Option<Param> {
        match column {
            "id" => Some(Param::new(self.id)),
            "name" => Some(Param::new(self.name.clone())),
            "email" => Some(Param::new(self.email.clone())),
            _ => None,
        }
    }

    fn record_id_mut(&mut self) -> Option<&mut i64> {
        Some(&mut self.id)
    }
}

fn person(name: &str) -> Person {
    Person {
        id: 0,
        name: name.to_string(),
        email: None,
    }
}

fn builder<'a>(
    runner: &'a RecordingRunner,
    dialect: &'static dyn Dialect,
    table: &str,
) -> InsertBuilder<'a, RecordingRunner> {
    InsertBuilder::new(
        runner,
        ExecEnv::with_dialect(dialect),
        InsertStmt::insert_into(table),
    )
}

#[test]
fn test_to_sql_renders_for_builder_dialect() {
    let runner = RecordingRunner::default();
    let built = builder(&runner, &MSSQL, "users")
        .pair("name", "alice")
        .pair("age", 30_i32)
        .to_sql()
        .unwrap();

    assert_eq!(
        built.sql,
        "INSERT INTO [users] ([name],[age]) VALUES (@p1,@p2)"
    );
    assert_eq!(built.params.len(), 2);
}

#[tokio::test]
async fn test_exec_runs_rendered_statement() {
    let runner = RecordingRunner::default();
    builder(&runner, &POSTGRES, "users")
        .columns(&["name", "age"])
        .values(params!["alice", 30_i32])
        .values(params!["bob", 41_i32])
        .exec()
        .await
        .unwrap();

    assert_eq!(
        runner.last_sql(),
        r#"INSERT INTO "users" ("name","age") VALUES ($1,$2), ($3,$4)"#
    );
    assert_eq!(runner.last_param_count(), 4);
}

#[tokio::test]
async fn test_record_id_filled_via_returning() {
    let runner = RecordingRunner::returning_id(42);
    let mut ann = person("ann");

    let res = builder(&runner, &POSTGRES, "people")
        .record(&mut ann)
        .exec()
        .await
        .unwrap();

    assert_eq!(ann.id, 42);
    assert_eq!(res.last_insert_id, Some(42));
    assert_eq!(res.rows_affected, 1);
    assert_eq!(
        runner.last_sql(),
        r#"INSERT INTO "people" ("name","email") VALUES ($1,$2) RETURNING "id""#
    );
}

#[tokio::test]
async fn test_returning_skipped_row_leaves_id_untouched() {
    let runner = RecordingRunner::default();
    let mut ann = person("ann");

    let res = builder(&runner, &POSTGRES, "people")
        .ignore()
        .record(&mut ann)
        .exec()
        .await
        .unwrap();

    assert_eq!(ann.id, 0);
    assert_eq!(res, ExecResult::default());
    assert_eq!(
        runner.last_sql(),
        r#"INSERT INTO "people" ("name","email") VALUES ($1,$2) ON CONFLICT DO NOTHING RETURNING "id""#
    );
}

#[tokio::test]
async fn test_record_id_filled_from_driver() {
    let runner = RecordingRunner::with_last_insert_id(7);
    let mut ann = person("ann");

    builder(&runner, &MYSQL, "people")
        .record(&mut ann)
        .exec()
        .await
        .unwrap();

    assert_eq!(ann.id, 7);
    assert_eq!(
        runner.last_sql(),
        "INSERT INTO `people` (`name`,`email`) VALUES (?,?)"
    );
}

#[tokio::test]
async fn test_explicit_returning_is_not_extended() {
    let runner = RecordingRunner::default();
    let mut ann = person("ann");

    builder(&runner, &POSTGRES, "people")
        .record(&mut ann)
        .returning(&["name"])
        .exec()
        .await
        .unwrap();

    assert_eq!(ann.id, 0);
    assert!(runner.last_sql().ends_with(r#"RETURNING "name""#));
}

#[tokio::test]
async fn test_records_insert_all_rows_without_ids() {
    let runner = RecordingRunner::with_last_insert_id(100);
    let mut people = vec![person("ann"), person("bob"), person("cy")];

    builder(&runner, &MYSQL, "people")
        .records(&mut people)
        .exec()
        .await
        .unwrap();

    assert_eq!(
        runner.last_sql(),
        "INSERT INTO `people` (`name`,`email`) VALUES (?,?), (?,?), (?,?)"
    );
    assert_eq!(runner.last_param_count(), 6);
    assert!(people.iter().all(|p| p.id == 0));
}

#[tokio::test]
async fn test_pre_insert_hooks_run_per_record_in_order() {
    let runner = RecordingRunner::default();
    let mut people = vec![person("ann"), person("bob")];

    let upper: PreInsertHook = Arc::new(|_stmt: &mut InsertStmt, record: &mut dyn Any| {
        if let Some(p) = record.downcast_mut::<Person>() {
            p.name = p.name.to_uppercase();
        }
    });

    let mut b = builder(&runner, &POSTGRES, "people");
    b.set_pre_insert_hooks([upper]);
    b.pre_insert_hook(|_stmt, record| {
        if let Some(p) = record.downcast_mut::<Person>() {
            p.email = Some(format!("{}@example.com", p.name));
        }
    })
    .records(&mut people)
    .exec()
    .await
    .unwrap();

    assert_eq!(people[0].name, "ANN");
    assert_eq!(people[0].email.as_deref(), Some("ANN@example.com"));
    assert_eq!(people[1].email.as_deref(), Some("BOB@example.com"));
}

#[test]
fn test_clear_pre_insert_hooks() {
    let runner = RecordingRunner::default();
    let mut ann = person("ann");

    let mut b = builder(&runner, &POSTGRES, "people").pre_insert_hook(|_stmt, record| {
        if let Some(p) = record.downcast_mut::<Person>() {
            p.name.clear();
        }
    });
    b.clear_pre_insert_hooks();
    let b = b.record(&mut ann);

    assert_eq!(b.stmt().row_count(), 1);
    drop(b);
    assert_eq!(ann.name, "ann");
}

#[test]
fn test_hook_can_adjust_statement() {
    let runner = RecordingRunner::default();
    let mut ann = person("ann");

    let built = builder(&runner, &MYSQL, "people")
        .pre_insert_hook(|stmt, _record| {
            stmt.ignore();
        })
        .record(&mut ann)
        .to_sql()
        .unwrap();

    assert!(built.sql.starts_with("INSERT IGNORE INTO"));
}

#[tokio::test]
async fn test_build_error_is_reported_and_not_executed() {
    let runner = RecordingRunner::default();
    let stats = Arc::new(StatsReceiver::new());
    let env = ExecEnv::new(&SessionConfig::new(), stats.clone());

    let err = InsertBuilder::new(&runner, env, InsertStmt::insert_into("users"))
        .columns(&["a"])
        .values(params![1_i32])
        .values(params![2_i32])
        .pair("b", 3_i32)
        .exec()
        .await
        .unwrap_err();

    assert_eq!(err.as_build_error(), Some(&BuildError::PairMultipleRecords));
    assert!(runner.statements.lock().unwrap().is_empty());
    assert_eq!(stats.snapshot().errors, 1);
    assert_eq!(stats.snapshot().timings, 0);
}

#[tokio::test]
async fn test_runner_error_is_timed_and_reported() {
    let runner = RecordingRunner::failing();
    let stats = Arc::new(StatsReceiver::new());
    let config = SessionConfig::new().dialect(DialectKind::MySql);
    let env = ExecEnv::new(&config, stats.clone());

    let err = InsertBuilder::new(&runner, env, InsertStmt::insert_into("users"))
        .pair("name", "ann")
        .exec()
        .await
        .unwrap_err();

    assert!(matches!(err, SqlError::Connection(_)));
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.timings, 1);
    assert_eq!(snapshot.errors, 1);
}

#[tokio::test]
async fn test_slow_statement_emits_event() {
    let runner = RecordingRunner::default();
    let stats = Arc::new(StatsReceiver::new());
    let config = SessionConfig::new().slow_query_threshold(Duration::ZERO);
    let env = ExecEnv::new(&config, stats.clone());

    InsertBuilder::new(&runner, env, InsertStmt::insert_into("users"))
        .pair("name", "ann")
        .exec()
        .await
        .unwrap();

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.timings, 1);
    assert_eq!(snapshot.events, 1);
    assert_eq!(snapshot.errors, 0);
}

#[tokio::test]
async fn test_load_uses_returning_clause() {
    let runner = RecordingRunner::default();

    let rows: Vec<(i64, String)> = builder(&runner, &POSTGRES, "people")
        .pair("name", "ann")
        .returning(&["id", "name"])
        .load()
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert_eq!(
        runner.last_sql(),
        r#"INSERT INTO "people" ("name") VALUES ($1) RETURNING "id","name""#
    );
}

#[tokio::test]
async fn test_raw_statement_runs_verbatim() {
    let runner = RecordingRunner::default();
    let stmt = InsertStmt::insert_by_sql(
        "INSERT INTO logs (msg, level) VALUES (?, ?)",
        params!["boot", 1_i32],
    );

    InsertBuilder::new(&runner, ExecEnv::with_dialect(&POSTGRES), stmt)
        .exec()
        .await
        .unwrap();

    assert_eq!(
        runner.last_sql(),
        "INSERT INTO logs (msg, level) VALUES ($1, $2)"
    );
    assert_eq!(runner.last_param_count(), 2);
}

struct StalledRunner;

impl Runner for StalledRunner {
    async fn exec(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> SqlResult<ExecResult> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(ExecResult::affected(1))
    }
}

#[tokio::test]
async fn test_query_timeout_aborts_statement() {
    let stats = Arc::new(StatsReceiver::new());
    let config = SessionConfig::new().query_timeout(Duration::from_millis(20));
    let env = ExecEnv::new(&config, stats.clone());

    let err = InsertBuilder::new(&StalledRunner, env, InsertStmt::insert_into("users"))
        .pair("name", "ann")
        .exec()
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(stats.snapshot().errors, 1);
}

struct ExecOnlyRunner {
    sql: Mutex<Vec<String>>,
}

impl Runner for ExecOnlyRunner {
    async fn exec(&self, sql: &str, _params: &[&(dyn ToSql + Sync)]) -> SqlResult<ExecResult> {
        self.sql.lock().unwrap().push(sql.to_string());
        Ok(ExecResult::affected(1))
    }
}

#[tokio::test]
async fn test_exec_only_runner_inserts_without_returning() {
    let runner = ExecOnlyRunner {
        sql: Mutex::new(Vec::new()),
    };
    let stats = Arc::new(StatsReceiver::new());
    let env = ExecEnv::new(&SessionConfig::new(), stats.clone());
    let mut ann = person("ann");

    let res = InsertBuilder::new(&runner, env, InsertStmt::insert_into("people"))
        .record(&mut ann)
        .exec()
        .await
        .unwrap();

    assert_eq!(res, ExecResult::affected(1));
    assert_eq!(ann.id, 0);
    assert_eq!(
        *runner.sql.lock().unwrap(),
        [r#"INSERT INTO "people" ("name","email") VALUES ($1,$2)"#]
    );
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.timings, 1);
    assert_eq!(snapshot.errors, 0);
}

#[tokio::test]
async fn test_load_on_exec_only_runner_is_unsupported() {
    let runner = ExecOnlyRunner {
        sql: Mutex::new(Vec::new()),
    };
    let stats = Arc::new(StatsReceiver::new());
    let env = ExecEnv::new(&SessionConfig::new(), stats.clone());

    let err = InsertBuilder::new(&runner, env, InsertStmt::insert_into("people"))
        .pair("name", "ann")
        .returning(&["id"])
        .load::<(i64,)>()
        .await
        .unwrap_err();

    assert!(matches!(err, SqlError::Unsupported(_)));
    assert!(runner.sql.lock().unwrap().is_empty());
    assert_eq!(stats.snapshot(), crate::event::ReceiverStats::default());
}

/// Receiver that keeps the names of reported errors.
#[derive(Default)]
struct ErrorNames(Mutex<Vec<String>>);

impl EventReceiver for ErrorNames {
    fn event_err(&self, name: &str, _err: &SqlError) {
        self.0.lock().unwrap().push(name.to_string());
    }
}

#[tokio::test]
async fn test_driver_errors_are_named_after_the_timing() {
    let runner = RecordingRunner::failing();
    let names = Arc::new(ErrorNames::default());
    let env = ExecEnv::new(&SessionConfig::new(), names.clone());

    let _ = InsertBuilder::new(&runner, env.clone(), InsertStmt::insert_into("users"))
        .pair("name", "ann")
        .exec()
        .await
        .unwrap_err();
    let _ = InsertBuilder::new(&runner, env.clone(), InsertStmt::insert_into("users"))
        .pair("name", "ann")
        .returning(&["id"])
        .load::<(i64,)>()
        .await
        .unwrap_err();
    let _ = InsertBuilder::new(&runner, env, InsertStmt::insert_into(""))
        .pair("name", "ann")
        .exec()
        .await
        .unwrap_err();

    assert_eq!(
        *names.0.lock().unwrap(),
        ["sqlchain.exec.exec", "sqlchain.query.exec", "sqlchain.exec.build"]
    );
}
