//! SQL dialects: identifier quoting, placeholder style and per-database INSERT quirks.
//!
//! Builders write `?` markers and unquoted identifiers; a [`Dialect`] turns them into the
//! text a particular database accepts.
//!
//! ```ignore
//! use sqlchain::dialect::{Dialect, POSTGRES};
//!
//! assert_eq!(POSTGRES.quote_ident("public.users"), r#""public"."users""#);
//! assert_eq!(POSTGRES.placeholder(0), "$1");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SqlError;

/// Where a dialect puts its "skip conflicting rows" clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreClause {
    /// Replaces `INSERT` with the given keyword run (e.g. `INSERT IGNORE`).
    Prefix(&'static str),
    /// Appended after the VALUES list (e.g. `ON CONFLICT DO NOTHING`).
    Suffix(&'static str),
}

/// How the database reports the id of an inserted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastInsertId {
    /// The driver reports it alongside the affected-row count.
    Driver,
    /// It has to be requested with `RETURNING <id>`.
    Returning,
}

/// A SQL dialect.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Short dialect name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Opening and closing identifier quote characters.
    fn quote_chars(&self) -> (char, char);

    /// Placeholder for the bind value at `index` (0-based).
    fn placeholder(&self, index: usize) -> String;

    /// Whether `INSERT ... RETURNING` is available.
    fn supports_returning(&self) -> bool;

    /// How conflicting rows are skipped, if the dialect can express it.
    fn insert_ignore(&self) -> Option<IgnoreClause>;

    /// How inserted ids are obtained.
    fn last_insert_id(&self) -> LastInsertId;

    /// Quote an identifier, quoting each dotted part separately.
    ///
    /// A closing quote character inside a part is escaped by doubling it.
    fn quote_ident(&self, ident: &str) -> String {
        let (open, close) = self.quote_chars();
        let mut out = String::with_capacity(ident.len() + 2);
        for (i, part) in ident.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push(open);
            for c in part.chars() {
                if c == close {
                    out.push(close);
                }
                out.push(c);
            }
            out.push(close);
        }
        out
    }
}

/// PostgreSQL: `"ident"`, `$1`, `ON CONFLICT DO NOTHING`, `RETURNING`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgreSql;

/// MySQL: `` `ident` ``, `?`, `INSERT IGNORE`, driver-reported ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

/// SQLite 3: `"ident"`, `?`, `INSERT OR IGNORE`, `RETURNING` (3.35+).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite3;

/// SQL Server: `[ident]`, `@p1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSql;

pub static POSTGRES: PostgreSql = PostgreSql;
pub static MYSQL: MySql = MySql;
pub static SQLITE3: Sqlite3 = Sqlite3;
pub static MSSQL: MsSql = MsSql;

impl Dialect for PostgreSql {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn insert_ignore(&self) -> Option<IgnoreClause> {
        Some(IgnoreClause::Suffix("ON CONFLICT DO NOTHING"))
    }

    fn last_insert_id(&self) -> LastInsertId {
        LastInsertId::Returning
    }
}

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn insert_ignore(&self) -> Option<IgnoreClause> {
        Some(IgnoreClause::Prefix("INSERT IGNORE"))
    }

    fn last_insert_id(&self) -> LastInsertId {
        LastInsertId::Driver
    }
}

impl Dialect for Sqlite3 {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn insert_ignore(&self) -> Option<IgnoreClause> {
        Some(IgnoreClause::Prefix("INSERT OR IGNORE"))
    }

    fn last_insert_id(&self) -> LastInsertId {
        LastInsertId::Returning
    }
}

impl Dialect for MsSql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_chars(&self) -> (char, char) {
        ('[', ']')
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index + 1)
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn insert_ignore(&self) -> Option<IgnoreClause> {
        None
    }

    fn last_insert_id(&self) -> LastInsertId {
        LastInsertId::Driver
    }
}

/// Configurable dialect selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DialectKind {
    #[default]
    Postgres,
    MySql,
    Sqlite3,
    MsSql,
}

impl DialectKind {
    /// The static dialect implementation for this kind.
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            DialectKind::Postgres => &POSTGRES,
            DialectKind::MySql => &MYSQL,
            DialectKind::Sqlite3 => &SQLITE3,
            DialectKind::MsSql => &MSSQL,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.dialect().name()
    }
}

impl FromStr for DialectKind {
    type Err = SqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "mysql" => Ok(DialectKind::MySql),
            "sqlite" | "sqlite3" => Ok(DialectKind::Sqlite3),
            "mssql" | "sqlserver" => Ok(DialectKind::MsSql),
            other => Err(SqlError::Config(format!("unknown dialect '{other}'"))),
        }
    }
}

impl TryFrom<String> for DialectKind {
    type Error = SqlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DialectKind> for String {
    fn from(kind: DialectKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
