//! Struct-to-row mapping.
//!
//! A [`Record`] knows which columns it maps and can hand out a bind value per column.
//! It is normally derived:
//!
//! ```ignore
//! use sqlchain::Record;
//!
//! #[derive(Record)]
//! struct User {
//!     id: i64,                       // record id, filled in after INSERT
//!     name: String,
//!     #[sqlchain(column = "email_address")]
//!     email: Option<String>,
//!     #[sqlchain(skip)]
//!     cached_score: u32,
//! }
//! ```

use crate::error::BuildError;
use crate::param::Param;

/// A struct whose fields map to table columns.
pub trait Record: Send + Sync + 'static {
    /// All mapped columns, in field declaration order.
    fn columns() -> &'static [&'static str]
    where
        Self: Sized;

    /// Column backing the record id, if the type has one.
    fn id_column() -> Option<&'static str>
    where
        Self: Sized,
    {
        None
    }

    /// Columns inserted when the caller did not name any: everything except the id.
    fn insert_columns() -> Vec<&'static str>
    where
        Self: Sized,
    {
        let id = Self::id_column();
        Self::columns()
            .iter()
            .copied()
            .filter(|c| Some(*c) != id)
            .collect()
    }

    /// Bind value for `column`, or `None` when the column is not mapped.
    fn value(&self, column: &str) -> Option<Param>;

    /// Mutable access to the record id so it can be filled in after INSERT.
    fn record_id_mut(&mut self) -> Option<&mut i64> {
        None
    }
}

/// Extract `record`'s values for `columns`, in order.
pub fn record_values<T: Record>(record: &T, columns: &[String]) -> Result<Vec<Param>, BuildError> {
    columns
        .iter()
        .map(|column| {
            record
                .value(column)
                .ok_or_else(|| BuildError::UnknownColumn {
                    record: short_type_name::<T>().to_string(),
                    column: column.clone(),
                })
        })
        .collect()
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
