//! Sessions, transactions and the pooled connection they come from.
//!
//! A [`Session`] pairs a runner (client, pooled client, anything implementing [`Runner`])
//! with a dialect and an [`EventReceiver`]. Every builder it hands out inherits both.
//!
//! # Example
//!
//! ```ignore
//! use sqlchain::{Connection, ConnectionConfig, SqlResult};
//!
//! # async fn demo() -> SqlResult<()> {
//! let conn = Connection::open(&ConnectionConfig::from_env()?)?;
//! let mut session = conn.session().await?;
//!
//! sqlchain::transaction!(session, tx, {
//!     tx.insert_into("audit_log")
//!         .pair("action", "signup")
//!         .exec()
//!         .await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

use crate::config::SessionConfig;
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::event::{EventReceiver, NullEventReceiver};
use crate::exec::ExecEnv;
use crate::insert::InsertBuilder;
use crate::insert_stmt::InsertStmt;
use crate::param::Param;
use crate::runner::{ExecResult, Runner};
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Runs the given block inside a transaction started from a [`Session`].
///
/// - Begins a transaction via `$session.begin().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `sqlchain::SqlResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($session:expr, $tx:ident, $body:block) => {{
        let $tx = ($session).begin().await?;

        let __sqlchain_tx_body_result = async { $body }.await;
        match __sqlchain_tx_body_result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::SqlError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

/// A runner that owns a Postgres client and can therefore open transactions.
pub trait Transactional: Runner {
    fn pg_client_mut(&mut self) -> &mut tokio_postgres::Client;
}

impl Transactional for tokio_postgres::Client {
    fn pg_client_mut(&mut self) -> &mut tokio_postgres::Client {
        self
    }
}

#[cfg(feature = "pool")]
impl Transactional for deadpool_postgres::Client {
    fn pg_client_mut(&mut self) -> &mut tokio_postgres::Client {
        // Object -> ClientWrapper -> tokio_postgres::Client
        let client: &mut tokio_postgres::Client = self;
        client
    }
}

/// A runner bound to a dialect and an event receiver.
pub struct Session<C> {
    client: C,
    env: ExecEnv,
}

impl<C: Runner> Session<C> {
    pub fn new(client: C, config: &SessionConfig) -> Self {
        Self {
            client,
            env: ExecEnv::new(config, Arc::new(NullEventReceiver)),
        }
    }

    /// Route this session's events to `receiver`.
    pub fn with_receiver(mut self, receiver: Arc<dyn EventReceiver>) -> Self {
        self.env.receiver = receiver;
        self
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.env.dialect
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Start an INSERT into `table`.
    pub fn insert_into(&self, table: &str) -> InsertBuilder<'_, C> {
        InsertBuilder::new(&self.client, self.env.clone(), InsertStmt::insert_into(table))
    }

    /// Start an INSERT from hand-written SQL using `?` placeholders.
    pub fn insert_by_sql(
        &self,
        query: impl Into<String>,
        values: impl IntoIterator<Item = Param>,
    ) -> InsertBuilder<'_, C> {
        InsertBuilder::new(
            &self.client,
            self.env.clone(),
            InsertStmt::insert_by_sql(query, values),
        )
    }
}

impl<C: Transactional> Session<C> {
    /// Begin a transaction. Builders from the returned [`Tx`] share this session's
    /// dialect and receiver.
    pub async fn begin(&mut self) -> SqlResult<Tx<'_>> {
        let env = self.env.clone();
        match self.client.pg_client_mut().transaction().await {
            Ok(tx) => {
                env.receiver.event("sqlchain.begin");
                Ok(Tx { tx, env })
            }
            Err(e) => {
                let err = SqlError::from_db_error(e);
                env.receiver.event_err("sqlchain.begin.error", &err);
                Err(err)
            }
        }
    }
}

impl<C: Runner> Runner for Session<C> {
    fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<ExecResult>> + Send {
        self.client.exec(sql, params)
    }

    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<Vec<Row>>> + Send {
        self.client.query(sql, params)
    }

    fn query_id(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<Option<i64>>> + Send {
        self.client.query_id(sql, params)
    }
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// An open transaction.
///
/// Dropping a `Tx` without calling [`commit`](Tx::commit) rolls it back.
pub struct Tx<'a> {
    tx: tokio_postgres::Transaction<'a>,
    env: ExecEnv,
}

impl<'a> Tx<'a> {
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.env.dialect
    }

    /// The underlying driver transaction.
    pub fn transaction(&self) -> &tokio_postgres::Transaction<'a> {
        &self.tx
    }

    pub fn insert_into(&self, table: &str) -> InsertBuilder<'_, tokio_postgres::Transaction<'a>> {
        InsertBuilder::new(&self.tx, self.env.clone(), InsertStmt::insert_into(table))
    }

    pub fn insert_by_sql(
        &self,
        query: impl Into<String>,
        values: impl IntoIterator<Item = Param>,
    ) -> InsertBuilder<'_, tokio_postgres::Transaction<'a>> {
        InsertBuilder::new(
            &self.tx,
            self.env.clone(),
            InsertStmt::insert_by_sql(query, values),
        )
    }

    pub async fn commit(self) -> SqlResult<()> {
        let Self { tx, env } = self;
        match tx.commit().await {
            Ok(()) => {
                env.receiver.event("sqlchain.commit");
                Ok(())
            }
            Err(e) => {
                let err = SqlError::from_db_error(e);
                env.receiver.event_err("sqlchain.commit.error", &err);
                Err(err)
            }
        }
    }

    pub async fn rollback(self) -> SqlResult<()> {
        let Self { tx, env } = self;
        match tx.rollback().await {
            Ok(()) => {
                env.receiver.event("sqlchain.rollback");
                Ok(())
            }
            Err(e) => {
                let err = SqlError::from_db_error(e);
                env.receiver.event_err("sqlchain.rollback.error", &err);
                Err(err)
            }
        }
    }
}

impl Runner for Tx<'_> {
    fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<ExecResult>> + Send {
        Runner::exec(&self.tx, sql, params)
    }

    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = SqlResult<Vec<Row>>> + Send {
        Runner::query(&self.tx, sql, params)
    }
}

impl std::fmt::Debug for Tx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx").field("env", &self.env).finish_non_exhaustive()
    }
}

#[cfg(feature = "pool")]
pub use self::pool::Connection;

#[cfg(feature = "pool")]
mod pool {
    use super::Session;
    use crate::config::{ConnectionConfig, SessionConfig};
    use crate::dialect::DialectKind;
    use crate::error::{SqlError, SqlResult};
    use crate::event::{EventReceiver, NullEventReceiver};
    use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
    use std::sync::Arc;
    use tokio_postgres::NoTls;

    /// A pooled Postgres connection that hands out [`Session`]s.
    #[derive(Clone)]
    pub struct Connection {
        pool: Pool,
        config: SessionConfig,
        receiver: Arc<dyn EventReceiver>,
    }

    impl Connection {
        /// Build a pool from `config`. No connection is made until the first session.
        pub fn open(config: &ConnectionConfig) -> SqlResult<Self> {
            if config.dialect != DialectKind::Postgres {
                return Err(SqlError::Config(format!(
                    "pooled connections require the postgres dialect, got {}",
                    config.dialect
                )));
            }

            let pg_config: tokio_postgres::Config = config
                .database_url
                .parse()
                .map_err(|e: tokio_postgres::Error| SqlError::Connection(e.to_string()))?;

            let manager = Manager::from_config(
                pg_config,
                NoTls,
                ManagerConfig {
                    recycling_method: RecyclingMethod::Fast,
                },
            );
            let pool = Pool::builder(manager)
                .max_size(config.max_pool_size)
                .build()
                .map_err(|e| SqlError::Pool(e.to_string()))?;

            Ok(Self::from_pool(pool, config.session_config()))
        }

        /// Wrap an existing pool.
        pub fn from_pool(pool: Pool, config: SessionConfig) -> Self {
            Self {
                pool,
                config,
                receiver: Arc::new(NullEventReceiver),
            }
        }

        pub fn with_receiver(mut self, receiver: Arc<dyn EventReceiver>) -> Self {
            self.receiver = receiver;
            self
        }

        pub fn pool(&self) -> &Pool {
            &self.pool
        }

        /// Check out a client and wrap it in a session.
        pub async fn session(&self) -> SqlResult<Session<deadpool_postgres::Client>> {
            let client = self.pool.get().await.inspect_err(log_pool_error)?;
            Ok(Session::new(client, &self.config).with_receiver(self.receiver.clone()))
        }
    }

    #[cfg(feature = "tracing")]
    fn log_pool_error(err: &deadpool_postgres::PoolError) {
        tracing::warn!(target: "sqlchain.pool", error = %err, "failed to check out a connection");
    }

    #[cfg(not(feature = "tracing"))]
    fn log_pool_error(_err: &deadpool_postgres::PoolError) {}

    impl std::fmt::Debug for Connection {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Connection")
                .field("config", &self.config)
                .field("status", &self.pool.status())
                .finish_non_exhaustive()
        }
    }
}
