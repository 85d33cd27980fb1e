//! The driver seam: anything that can execute rendered SQL.

use crate::error::{SqlError, SqlResult};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Number of rows the statement touched.
    pub rows_affected: u64,
    /// Id of the inserted row, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }
}

/// A trait that unifies clients, pooled connections and transactions.
///
/// Builders hold a `&R` and never care which one they got, so the same chain works
/// inside and outside a transaction.
pub trait Runner: Send + Sync {
    /// Execute a statement and report affected rows.
    fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<ExecResult>> + Send;

    /// Execute a query and return all rows.
    ///
    /// The default implementation reports [`SqlError::Unsupported`].
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<Vec<Row>>> + Send {
        let _ = (sql, params);
        async { Err(SqlError::unsupported("row loading is not supported by this runner")) }
    }

    /// Execute an `INSERT ... RETURNING <id>` and read the id from the first row.
    ///
    /// Semantics:
    /// - 0 rows: `Ok(None)` (e.g. the row was skipped by `ON CONFLICT DO NOTHING`)
    /// - otherwise: the first column of the first row
    fn query_id(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<Option<i64>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            match rows.first() {
                None => Ok(None),
                Some(row) => row
                    .try_get::<usize, i64>(0)
                    .map(Some)
                    .map_err(|e| SqlError::decode("0", e.to_string())),
            }
        }
    }
}

impl Runner for tokio_postgres::Client {
    async fn exec(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<ExecResult> {
        tokio_postgres::Client::execute(self, sql, params)
            .await
            .map(ExecResult::affected)
            .map_err(SqlError::from_db_error)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
        tokio_postgres::Client::query(self, sql, params)
            .await
            .map_err(SqlError::from_db_error)
    }
}

impl Runner for tokio_postgres::Transaction<'_> {
    async fn exec(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<ExecResult> {
        tokio_postgres::Transaction::execute(self, sql, params)
            .await
            .map(ExecResult::affected)
            .map_err(SqlError::from_db_error)
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
        tokio_postgres::Transaction::query(self, sql, params)
            .await
            .map_err(SqlError::from_db_error)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Runner for deadpool_postgres::Client {
    async fn exec(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<ExecResult> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        let client: &tokio_postgres::Client = self;
        Runner::exec(client, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
        let client: &tokio_postgres::Client = self;
        Runner::query(client, sql, params).await
    }
}

impl<R: Runner> Runner for &R {
    fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<ExecResult>> + Send {
        (**self).exec(sql, params)
    }

    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn query_id(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<Option<i64>>> + Send {
        (**self).query_id(sql, params)
    }
}
