//! Convenient imports for typical `sqlchain` usage.
//!
//! ```ignore
//! use sqlchain::prelude::*;
//! ```

pub use crate::{
    DialectKind, EventReceiver, ExecResult, FromRow, InsertBuilder, Param, Record, Runner,
    Session, SessionConfig, SqlError, SqlResult, Tx, params,
};

#[cfg(feature = "pool")]
pub use crate::{Connection, ConnectionConfig};

#[cfg(feature = "tracing")]
pub use crate::TracingEventReceiver;
