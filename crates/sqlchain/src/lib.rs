//! # sqlchain
//!
//! A fluent, dialect-aware SQL statement builder.
//!
//! ## Features
//!
//! - **Method chains**: `insert_into("users").pair("name", "alice").exec()`
//! - **Dialects**: Postgres, MySQL, SQLite and SQL Server quoting, placeholders and `IGNORE`
//! - **Struct mapping**: `#[derive(Record)]` turns a struct into a row, and the generated id is
//!   written back after `exec`
//! - **Pre-insert hooks**: adjust records (timestamps, defaults) right before they are mapped
//! - **Deferred errors**: mistakes made while chaining surface once, from `exec` / `to_sql`
//! - **Events**: timing, errors and slow statements go to a pluggable [`EventReceiver`]
//!
//! ## Example
//!
//! ```ignore
//! use sqlchain::{Record, Session, SessionConfig};
//!
//! #[derive(Record)]
//! struct User {
//!     id: i64,
//!     username: String,
//!     #[sqlchain(column = "email_address")]
//!     email: String,
//! }
//!
//! let session = Session::new(client, &SessionConfig::new());
//!
//! let mut user = User { id: 0, username: "alice".into(), email: "a@example.com".into() };
//! session.insert_into("users").record(&mut user).exec().await?;
//!
//! session
//!     .insert_into("tags")
//!     .columns(&["name", "weight"])
//!     .values(sqlchain::params!["rust", 10_i32])
//!     .values(sqlchain::params!["sql", 3_i32])
//!     .ignore()
//!     .exec()
//!     .await?;
//! ```

pub mod buffer;
pub mod config;
pub mod dialect;
pub mod error;
pub mod event;
pub mod insert;
pub mod insert_stmt;
pub mod param;
pub mod prelude;
pub mod raw;
pub mod record;
pub mod row;
pub mod runner;
pub mod session;

mod exec;

pub use buffer::{Buffer, Builder, BuiltQuery, build_query};
pub use config::{ConnectionConfig, SessionConfig};
pub use dialect::{
    Dialect, DialectKind, IgnoreClause, LastInsertId, MSSQL, MYSQL, MsSql, MySql, POSTGRES,
    PostgreSql, SQLITE3, Sqlite3,
};
pub use error::{BuildError, SqlError, SqlResult};
pub use event::{EventReceiver, Kvs, NullEventReceiver, ReceiverStats, StatsReceiver};
pub use insert::{InsertBuilder, PreInsertHook};
pub use insert_stmt::InsertStmt;
pub use param::{Param, ParamList};
pub use raw::Raw;
pub use record::{Record, record_values};
pub use row::{FromRow, RowExt};
pub use runner::{ExecResult, Runner};
pub use session::{Session, Transactional, Tx};

#[cfg(feature = "pool")]
pub use session::Connection;

#[cfg(feature = "tracing")]
pub use event::TracingEventReceiver;

#[cfg(feature = "derive")]
pub use sqlchain_derive::{FromRow, Record};

// Re-exported so derived code and callers agree on the driver version.
pub use tokio_postgres;
