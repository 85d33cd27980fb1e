//! Row mapping traits and utilities

use crate::error::{SqlError, SqlResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust struct
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> SqlResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning SqlError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> SqlResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> SqlResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| SqlError::decode(column, e.to_string()))
    }
}

// Positional tuples, handy for `RETURNING id` / `RETURNING id, created_at`.
macro_rules! impl_from_row_tuple {
    ($($idx:tt => $ty:ident),+) => {
        impl<$($ty),+> FromRow for ($($ty,)+)
        where
            $($ty: for<'a> FromSql<'a>),+
        {
            fn from_row(row: &Row) -> SqlResult<Self> {
                Ok(($(
                    row.try_get::<usize, $ty>($idx)
                        .map_err(|e| SqlError::decode(stringify!($idx), e.to_string()))?,
                )+))
            }
        }
    };
}

impl_from_row_tuple!(0 => A);
impl_from_row_tuple!(0 => A, 1 => B);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C, 3 => D);
