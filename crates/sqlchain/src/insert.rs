//! Connection-bound INSERT builder.
//!
//! ```ignore
//! use sqlchain::{Record, Session, SessionConfig};
//!
//! #[derive(Record)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! let mut user = User { id: 0, name: "alice".into() };
//! session.insert_into("users").record(&mut user).exec().await?;
//! assert!(user.id > 0); // filled in from RETURNING "id" on Postgres
//! ```

use crate::buffer::{BuiltQuery, build_query};
use crate::dialect::{Dialect, LastInsertId};
use crate::error::{SqlError, SqlResult};
use crate::exec::ExecEnv;
use crate::insert_stmt::InsertStmt;
use crate::param::Param;
use crate::record::Record;
use crate::row::FromRow;
use crate::runner::{ExecResult, Runner};
use std::any::Any;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// Callback run for every record before its values are read.
///
/// The second argument is the record itself (`&mut T`), so a hook can downcast it and
/// fill fields such as timestamps. Hooks may also adjust the statement.
pub type PreInsertHook = Arc<dyn Fn(&mut InsertStmt, &mut dyn Any) + Send + Sync>;

/// INSERT builder bound to a runner.
pub struct InsertBuilder<'a, R> {
    runner: &'a R,
    env: ExecEnv,
    stmt: InsertStmt,
    record_id: Option<&'a mut i64>,
    id_column: Option<&'static str>,
    pre_insert_hooks: Vec<PreInsertHook>,
}

impl<'a, R: Runner> InsertBuilder<'a, R> {
    pub(crate) fn new(runner: &'a R, env: ExecEnv, stmt: InsertStmt) -> Self {
        Self {
            runner,
            env,
            stmt,
            record_id: None,
            id_column: None,
            pre_insert_hooks: Vec::new(),
        }
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.env.dialect
    }

    /// The statement assembled so far.
    pub fn stmt(&self) -> &InsertStmt {
        &self.stmt
    }

    /// Render the statement for this builder's dialect.
    pub fn to_sql(&self) -> SqlResult<BuiltQuery> {
        build_query(&self.stmt, self.env.dialect)
    }

    /// Add one column/value pair (single-row inserts only).
    pub fn pair<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.stmt.pair(column, value);
        self
    }

    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.stmt.columns(columns);
        self
    }

    /// Append one row of values; see [`params!`](crate::params).
    pub fn values(mut self, row: impl IntoIterator<Item = Param>) -> Self {
        self.stmt.values(row);
        self
    }

    /// Insert `record`, and write the generated id back into it after [`exec`](Self::exec).
    pub fn record<T: Record>(mut self, record: &'a mut T) -> Self {
        self.run_pre_insert_hooks(record);
        self.stmt.record(&*record);
        if let Some(id) = T::record_id_mut(record) {
            self.record_id = Some(id);
            self.id_column = T::id_column();
        }
        self
    }

    /// Insert every element of `records` as its own row. Ids are not written back.
    pub fn records<T: Record>(mut self, records: &mut [T]) -> Self {
        for record in records.iter_mut() {
            self.run_pre_insert_hooks(record);
            self.stmt.record(&*record);
        }
        self
    }

    pub fn ignore(mut self) -> Self {
        self.stmt.ignore();
        self
    }

    pub fn returning<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.stmt.returning(columns);
        self
    }

    /// Chainable form of [`set_pre_insert_hooks`](Self::set_pre_insert_hooks) for one hook.
    pub fn pre_insert_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut InsertStmt, &mut dyn Any) + Send + Sync + 'static,
    {
        self.pre_insert_hooks.push(Arc::new(hook));
        self
    }

    /// Append hooks; they run in registration order.
    pub fn set_pre_insert_hooks(&mut self, hooks: impl IntoIterator<Item = PreInsertHook>) {
        self.pre_insert_hooks.extend(hooks);
    }

    pub fn clear_pre_insert_hooks(&mut self) {
        self.pre_insert_hooks.clear();
    }

    fn run_pre_insert_hooks<T: Record>(&mut self, record: &mut T) {
        for hook in &self.pre_insert_hooks {
            let any: &mut dyn Any = &mut *record;
            hook(&mut self.stmt, any);
        }
    }

    /// Whether the id has to be fetched with `RETURNING <id>`.
    fn id_via_returning(&self) -> Option<&'static str> {
        let column = self.id_column?;
        let single_row = self.stmt.row_count() == 1 && !self.stmt.is_raw();
        let returning_free = self.stmt.returning_columns().is_empty();
        (self.record_id.is_some()
            && single_row
            && returning_free
            && self.env.dialect.last_insert_id() == LastInsertId::Returning)
            .then_some(column)
    }

    /// Execute the statement.
    ///
    /// When a single record with an id field was added, its id is filled in: from
    /// `RETURNING` on dialects that need it, otherwise from the driver's last insert id.
    /// A missing id is not an error.
    ///
    /// Runners that cannot return rows still get the plain `INSERT`; the id is then left
    /// to the driver.
    pub async fn exec(self) -> SqlResult<ExecResult> {
        if let Some(id_column) = self.id_via_returning() {
            let mut stmt = self.stmt.clone();
            stmt.returning(&[id_column]);
            let query = self.env.build(&stmt)?;
            match self.env.query_id(self.runner, &query).await {
                Ok(id) => {
                    if let (Some(slot), Some(id)) = (self.record_id, id) {
                        *slot = id;
                    }
                    return Ok(ExecResult {
                        rows_affected: u64::from(id.is_some()),
                        last_insert_id: id,
                    });
                }
                Err(SqlError::Unsupported(_)) => {}
                Err(err) => return Err(err),
            }
        }

        let query = self.env.build(&self.stmt)?;
        let result = self.env.exec(self.runner, &query).await?;
        if self.stmt.row_count() == 1 {
            if let (Some(slot), Some(id)) = (self.record_id, result.last_insert_id) {
                *slot = id;
            }
        }
        Ok(result)
    }

    /// Execute and map the `RETURNING` rows.
    pub async fn load<T: FromRow>(self) -> SqlResult<Vec<T>> {
        let query = self.env.build(&self.stmt)?;
        let rows = self.env.query(self.runner, &query).await?;
        rows.iter().map(T::from_row).collect()
    }
}

impl<R> std::fmt::Debug for InsertBuilder<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsertBuilder")
            .field("env", &self.env)
            .field("stmt", &self.stmt)
            .field("id_column", &self.id_column)
            .field("pre_insert_hooks", &self.pre_insert_hooks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
