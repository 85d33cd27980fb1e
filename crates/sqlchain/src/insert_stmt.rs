//! INSERT statement assembly, independent of any connection.

use crate::buffer::{Buffer, Builder};
use crate::dialect::{Dialect, IgnoreClause};
use crate::error::{BuildError, SqlResult};
use crate::param::Param;
use crate::raw::Raw;
use crate::record::{Record, record_values};
use tokio_postgres::types::ToSql;

/// An INSERT statement.
///
/// Errors found while chaining (e.g. `pair` on a multi-row statement) are kept and
/// reported by [`Builder::build`]; the first one wins.
#[derive(Debug, Clone, Default)]
pub struct InsertStmt {
    raw: Raw,
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Param>>,
    pub(crate) ignored: bool,
    pub(crate) returning: Vec<String>,
    error: Option<BuildError>,
}

impl InsertStmt {
    /// INSERT into `table`.
    pub fn insert_into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// INSERT from hand-written SQL with `?` markers.
    pub fn insert_by_sql(query: impl Into<String>, values: impl IntoIterator<Item = Param>) -> Self {
        Self {
            raw: Raw::new(query, values),
            ..Self::default()
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn returning_columns(&self) -> &[String] {
        &self.returning
    }

    pub fn is_raw(&self) -> bool {
        !self.raw.is_empty()
    }

    /// The first error recorded while chaining, if any.
    pub fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    /// Replace the column list.
    pub fn columns<S: AsRef<str>>(&mut self, columns: &[S]) -> &mut Self {
        self.columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Append one row of values.
    pub fn values(&mut self, row: impl IntoIterator<Item = Param>) -> &mut Self {
        self.rows.push(row.into_iter().collect());
        self
    }

    /// Add a single column/value pair to a one-row statement.
    pub fn pair<T: ToSql + Send + Sync + 'static>(&mut self, column: &str, value: T) -> &mut Self {
        self.pair_param(column, Param::new(value))
    }

    pub fn pair_param(&mut self, column: &str, value: Param) -> &mut Self {
        match self.rows.len() {
            0 => {
                self.columns.push(column.to_string());
                self.rows.push(vec![value]);
            }
            1 => {
                self.columns.push(column.to_string());
                self.rows[0].push(value);
            }
            _ => self.fail(BuildError::PairMultipleRecords),
        }
        self
    }

    /// Append `record` as a row, mapping it onto the current columns.
    ///
    /// With no columns set yet, the record type's insert columns are used.
    pub fn record<T: Record>(&mut self, record: &T) -> &mut Self {
        if self.columns.is_empty() {
            self.columns = T::insert_columns().into_iter().map(str::to_string).collect();
        }
        match record_values(record, &self.columns) {
            Ok(row) => self.rows.push(row),
            Err(e) => self.fail(e),
        }
        self
    }

    /// Skip rows that conflict with existing ones.
    pub fn ignore(&mut self) -> &mut Self {
        self.ignored = true;
        self
    }

    /// Add a RETURNING clause.
    pub fn returning<S: AsRef<str>>(&mut self, columns: &[S]) -> &mut Self {
        self.returning = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    fn fail(&mut self, err: BuildError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Quote a possibly schema-qualified name; every dotted part must be non-empty.
    fn write_ident(dialect: &dyn Dialect, buf: &mut Buffer, ident: &str) -> SqlResult<()> {
        if ident.split('.').any(str::is_empty) {
            return Err(BuildError::EmptyIdent.into());
        }
        buf.write_str(&dialect.quote_ident(ident));
        Ok(())
    }

    fn write_ident_list(dialect: &dyn Dialect, buf: &mut Buffer, idents: &[String]) -> SqlResult<()> {
        for (i, ident) in idents.iter().enumerate() {
            if i > 0 {
                buf.write_char(',');
            }
            Self::write_ident(dialect, buf, ident)?;
        }
        Ok(())
    }
}

impl Builder for InsertStmt {
    fn build(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> SqlResult<()> {
        if let Some(err) = &self.error {
            return Err(err.clone().into());
        }
        if !self.raw.is_empty() {
            return self.raw.build(dialect, buf);
        }
        if self.table.is_empty() {
            return Err(BuildError::TableNotSpecified.into());
        }
        if self.columns.is_empty() || self.rows.is_empty() {
            return Err(BuildError::ColumnNotSpecified.into());
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(BuildError::ValueCountMismatch {
                    row: i,
                    expected: self.columns.len(),
                    got: row.len(),
                }
                .into());
            }
        }
        if !self.returning.is_empty() && !dialect.supports_returning() {
            return Err(BuildError::ReturningUnsupported(dialect.name()).into());
        }

        let ignore = if self.ignored {
            Some(
                dialect
                    .insert_ignore()
                    .ok_or(BuildError::IgnoreUnsupported(dialect.name()))?,
            )
        } else {
            None
        };

        match ignore {
            Some(IgnoreClause::Prefix(prefix)) => buf.write_str(prefix),
            _ => buf.write_str("INSERT"),
        };
        buf.write_str(" INTO ");
        Self::write_ident(dialect, buf, &self.table)?;
        buf.write_str(" (");
        Self::write_ident_list(dialect, buf, &self.columns)?;
        buf.write_str(") VALUES ");

        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                buf.write_str(", ");
            }
            buf.write_char('(');
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    buf.write_char(',');
                }
                buf.write_placeholder(value.clone());
            }
            buf.write_char(')');
        }

        if let Some(IgnoreClause::Suffix(suffix)) = ignore {
            buf.write_char(' ');
            buf.write_str(suffix);
        }

        if !self.returning.is_empty() {
            buf.write_str(" RETURNING ");
            Self::write_ident_list(dialect, buf, &self.returning)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
