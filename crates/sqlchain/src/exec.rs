//! The build → render → run → report pipeline shared by sessions, transactions and builders.

use crate::buffer::{Builder, BuiltQuery, build_query};
use crate::config::SessionConfig;
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::event::{EventReceiver, Kvs};
use crate::runner::{ExecResult, Runner};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_postgres::Row;

/// Everything a builder needs besides the runner itself.
#[derive(Clone)]
pub(crate) struct ExecEnv {
    pub(crate) dialect: &'static dyn Dialect,
    pub(crate) receiver: Arc<dyn EventReceiver>,
    pub(crate) slow_query_threshold: Option<Duration>,
    pub(crate) query_timeout: Option<Duration>,
    pub(crate) log_params: bool,
}

impl std::fmt::Debug for ExecEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecEnv")
            .field("dialect", &self.dialect.name())
            .field("slow_query_threshold", &self.slow_query_threshold)
            .field("query_timeout", &self.query_timeout)
            .field("log_params", &self.log_params)
            .finish_non_exhaustive()
    }
}

impl ExecEnv {
    pub(crate) fn new(config: &SessionConfig, receiver: Arc<dyn EventReceiver>) -> Self {
        Self {
            dialect: config.dialect_impl(),
            receiver,
            slow_query_threshold: config.slow_query_threshold,
            query_timeout: config.query_timeout,
            log_params: config.log_params,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_dialect(dialect: &'static dyn Dialect) -> Self {
        Self {
            dialect,
            receiver: Arc::new(crate::event::NullEventReceiver),
            slow_query_threshold: None,
            query_timeout: None,
            log_params: false,
        }
    }

    /// Build and render, reporting `sqlchain.exec.build` on failure.
    pub(crate) fn build(&self, builder: &impl Builder) -> SqlResult<BuiltQuery> {
        build_query(builder, self.dialect).inspect_err(|err| {
            let mut kvs = Kvs::new();
            kvs.insert("dialect".to_string(), self.dialect.name().to_string());
            self.receiver.event_err_kv("sqlchain.exec.build", err, &kvs);
        })
    }

    pub(crate) async fn exec<R: Runner>(
        &self,
        runner: &R,
        query: &BuiltQuery,
    ) -> SqlResult<ExecResult> {
        let params = query.params_ref();
        self.observe("sqlchain.exec", query, runner.exec(&query.sql, &params))
            .await
    }

    pub(crate) async fn query<R: Runner>(
        &self,
        runner: &R,
        query: &BuiltQuery,
    ) -> SqlResult<Vec<Row>> {
        let params = query.params_ref();
        self.observe("sqlchain.query", query, runner.query(&query.sql, &params))
            .await
    }

    pub(crate) async fn query_id<R: Runner>(
        &self,
        runner: &R,
        query: &BuiltQuery,
    ) -> SqlResult<Option<i64>> {
        let params = query.params_ref();
        self.observe("sqlchain.exec", query, runner.query_id(&query.sql, &params))
            .await
    }

    /// Time `fut` as `name` and report failures as `<name>.exec`.
    async fn observe<T, F>(&self, name: &str, query: &BuiltQuery, fut: F) -> SqlResult<T>
    where
        F: Future<Output = SqlResult<T>>,
    {
        let start = Instant::now();
        let result = match self.query_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(SqlError::Timeout(timeout)),
            },
            None => fut.await,
        };
        let elapsed = start.elapsed();

        // The runner refused before touching the database.
        if let Err(SqlError::Unsupported(_)) = &result {
            return result;
        }

        let kvs = self.kvs(query);
        self.receiver.timing_kv(name, elapsed, &kvs);

        if let Err(err) = &result {
            self.receiver
                .event_err_kv(&format!("{name}.exec"), err, &kvs);
        }

        if let Some(threshold) = self.slow_query_threshold {
            if elapsed >= threshold {
                let mut kvs = kvs;
                kvs.insert("elapsed_ms".to_string(), elapsed.as_millis().to_string());
                self.receiver.event_kv("sqlchain.exec.slow", &kvs);
            }
        }

        result
    }

    fn kvs(&self, query: &BuiltQuery) -> Kvs {
        let mut kvs = Kvs::new();
        kvs.insert("sql".to_string(), query.sql.clone());
        kvs.insert("dialect".to_string(), self.dialect.name().to_string());
        if self.log_params {
            kvs.insert("params".to_string(), format!("{:?}", query.params));
        }
        kvs
    }
}
