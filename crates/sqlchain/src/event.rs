//! Event receivers: the logging/instrumentation seam of sessions and builders.
//!
//! Every statement run through a session reports to an [`EventReceiver`]:
//! - `timing_kv("sqlchain.exec" | "sqlchain.query", elapsed, {sql, ...})` after the driver returns
//! - `event_err_kv("sqlchain.exec.build", err, {dialect})` when a statement fails to render
//! - `event_err_kv("<timing name>.exec", err, {sql, ...})` when the driver fails, i.e.
//!   `sqlchain.exec.exec` for [`exec`](crate::InsertBuilder::exec) and `sqlchain.query.exec`
//!   for [`load`](crate::InsertBuilder::load)
//! - `event_kv("sqlchain.exec.slow", {sql, elapsed_ms})` when the slow threshold is crossed
//! - `event("sqlchain.begin" | "sqlchain.commit" | "sqlchain.rollback")` from transactions,
//!   with `event_err("<name>.error")` when the driver call fails
//!
//! A runner answering [`SqlError::Unsupported`] never reached the database, so that
//! error is returned without timing or events.

use crate::error::SqlError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Structured event fields.
pub type Kvs = BTreeMap<String, String>;

/// Receives instrumentation from sessions and builders.
///
/// All methods default to doing nothing; the `*_kv` variants forward to the plain ones.
pub trait EventReceiver: Send + Sync {
    fn event(&self, _name: &str) {}

    fn event_kv(&self, name: &str, _kvs: &Kvs) {
        self.event(name);
    }

    fn event_err(&self, _name: &str, _err: &SqlError) {}

    fn event_err_kv(&self, name: &str, err: &SqlError, _kvs: &Kvs) {
        self.event_err(name, err);
    }

    fn timing(&self, _name: &str, _elapsed: Duration) {}

    fn timing_kv(&self, name: &str, elapsed: Duration, _kvs: &Kvs) {
        self.timing(name, elapsed);
    }
}

/// A receiver that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventReceiver;

impl EventReceiver for NullEventReceiver {}

/// A receiver that counts what it sees.
#[derive(Debug, Default)]
pub struct StatsReceiver {
    events: AtomicU64,
    errors: AtomicU64,
    timings: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

/// Snapshot of a [`StatsReceiver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub events: u64,
    pub errors: u64,
    pub timings: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
}

impl StatsReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ReceiverStats {
        ReceiverStats {
            events: self.events.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            timings: self.timings.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
            max_duration: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
        }
    }

    pub fn reset(&self) {
        self.events.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.timings.store(0, Ordering::Relaxed);
        self.total_nanos.store(0, Ordering::Relaxed);
        self.max_nanos.store(0, Ordering::Relaxed);
    }
}

impl EventReceiver for StatsReceiver {
    fn event(&self, _name: &str) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    fn event_err(&self, _name: &str, _err: &SqlError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn timing(&self, _name: &str, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.timings.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(feature = "tracing")]
pub use tracing_receiver::TracingEventReceiver;

#[cfg(feature = "tracing")]
mod tracing_receiver {
    use super::{EventReceiver, Kvs, truncate_sql_bytes};
    use crate::error::SqlError;
    use std::time::Duration;
    use tracing::Level;

    /// A `tracing`-based receiver.
    ///
    /// Events and timings go to target `sqlchain.sql` at the configured level; errors are
    /// always emitted at `ERROR` on target `sqlchain.event`.
    ///
    /// Enable via the crate feature: `sqlchain = { features = ["tracing"] }`.
    #[derive(Debug, Clone)]
    pub struct TracingEventReceiver {
        /// Tracing event level to emit at.
        pub level: Level,
        /// Truncate long SQL strings (in bytes). `None` means no truncation.
        pub max_sql_length: Option<usize>,
    }

    impl Default for TracingEventReceiver {
        fn default() -> Self {
            Self {
                level: Level::DEBUG,
                max_sql_length: Some(200),
            }
        }
    }

    impl TracingEventReceiver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Override the tracing event level.
        pub fn level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Set maximum SQL length to display.
        pub fn max_sql_length(mut self, len: usize) -> Self {
            self.max_sql_length = Some(len);
            self
        }

        /// Disable SQL truncation.
        pub fn no_truncate(mut self) -> Self {
            self.max_sql_length = None;
            self
        }

        pub(crate) fn render_kvs(&self, kvs: &Kvs) -> String {
            let mut out = String::new();
            for (k, v) in kvs {
                if !out.is_empty() {
                    out.push(' ');
                }
                let v = match self.max_sql_length {
                    Some(max) if k == "sql" && v.len() > max => {
                        format!("{}...", truncate_sql_bytes(v, max))
                    }
                    _ => v.clone(),
                };
                out.push_str(k);
                out.push('=');
                out.push_str(&v);
            }
            out
        }
    }

    /// Dispatch a tracing event at a runtime-determined level.
    macro_rules! emit_at_level {
        ($level:expr, $($field:tt)*) => {
            match $level {
                Level::ERROR => tracing::error!($($field)*),
                Level::WARN  => tracing::warn!($($field)*),
                Level::INFO  => tracing::info!($($field)*),
                Level::DEBUG => tracing::debug!($($field)*),
                _ => tracing::trace!($($field)*),
            }
        };
    }

    impl EventReceiver for TracingEventReceiver {
        fn event(&self, name: &str) {
            emit_at_level!(self.level, target: "sqlchain.event", event = name);
        }

        fn event_kv(&self, name: &str, kvs: &Kvs) {
            let fields = self.render_kvs(kvs);
            emit_at_level!(self.level, target: "sqlchain.event", event = name, fields = %fields);
        }

        fn event_err(&self, name: &str, err: &SqlError) {
            tracing::error!(target: "sqlchain.event", event = name, error = %err);
        }

        fn event_err_kv(&self, name: &str, err: &SqlError, kvs: &Kvs) {
            let fields = self.render_kvs(kvs);
            tracing::error!(target: "sqlchain.event", event = name, error = %err, fields = %fields);
        }

        fn timing(&self, name: &str, elapsed: Duration) {
            emit_at_level!(self.level, target: "sqlchain.sql", event = name, elapsed = ?elapsed);
        }

        fn timing_kv(&self, name: &str, elapsed: Duration, kvs: &Kvs) {
            let fields = self.render_kvs(kvs);
            emit_at_level!(
                self.level,
                target: "sqlchain.sql",
                event = name,
                elapsed = ?elapsed,
                fields = %fields,
            );
        }
    }

}
