//! Statement buffer and placeholder rendering.
//!
//! Builders write SQL with `?` markers into a [`Buffer`] together with the bind values.
//! [`Buffer::finish`] then rewrites every marker into the dialect's placeholder, skipping
//! quoted strings and identifiers.

use crate::dialect::Dialect;
use crate::error::{BuildError, SqlResult};
use crate::param::{Param, ParamList};
use tokio_postgres::types::ToSql;

/// Anything that can write itself into a [`Buffer`].
pub trait Builder {
    fn build(&self, dialect: &dyn Dialect, buf: &mut Buffer) -> SqlResult<()>;
}

/// SQL text with `?` markers plus the values bound to them, in order.
#[derive(Debug, Default, Clone)]
pub struct Buffer {
    sql: String,
    values: ParamList,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.sql.push_str(s);
        self
    }

    pub fn write_char(&mut self, c: char) -> &mut Self {
        self.sql.push(c);
        self
    }

    /// Append values without writing markers (the caller already wrote them).
    pub fn write_values(&mut self, values: impl IntoIterator<Item = Param>) -> &mut Self {
        self.values.extend_params(values);
        self
    }

    /// Write one `?` marker and bind `value` to it.
    pub fn write_placeholder(&mut self, value: Param) -> &mut Self {
        self.sql.push('?');
        self.values.push_param(value);
        self
    }

    /// The raw text, markers included.
    pub fn as_str(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &ParamList {
        &self.values
    }

    /// Render markers into dialect placeholders.
    pub fn finish(self, dialect: &dyn Dialect) -> SqlResult<BuiltQuery> {
        let (sql, placeholders) = render_placeholders(&self.sql, dialect);
        if placeholders != self.values.len() {
            return Err(BuildError::PlaceholderMismatch {
                placeholders,
                values: self.values.len(),
            }
            .into());
        }
        Ok(BuiltQuery {
            sql,
            params: self.values,
        })
    }
}

/// The result of building a statement.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: ParamList,
}

impl BuiltQuery {
    /// Get parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.as_refs()
    }
}

/// Build `builder` for `dialect` and render its placeholders.
pub fn build_query(builder: &impl Builder, dialect: &dyn Dialect) -> SqlResult<BuiltQuery> {
    let mut buf = Buffer::new();
    builder.build(dialect, &mut buf)?;
    buf.finish(dialect)
}

/// Replace `?` markers outside quotes with numbered dialect placeholders.
///
/// String literals (`'` and `"`) and the dialect's own identifier quotes are copied
/// verbatim. A doubled closing quote is an escape and keeps the region open.
///
/// Returns the rendered text and the number of markers seen.
fn render_placeholders(sql: &str, dialect: &dyn Dialect) -> (String, usize) {
    let (open_ident, close_ident) = dialect.quote_chars();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(close) if c == close => {
                out.push(c);
                if chars.peek() == Some(&close) {
                    out.push(close);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            Some(_) => out.push(c),
            None if c == '?' => {
                out.push_str(&dialect.placeholder(count));
                count += 1;
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                } else if c == open_ident {
                    quote = Some(close_ident);
                }
                out.push(c);
            }
        }
    }

    (out, count)
}
