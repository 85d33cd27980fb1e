//! Error types for sqlchain

use thiserror::Error;

/// Result type alias for sqlchain operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors raised while assembling a statement, before anything reaches the database.
///
/// Builders record the first of these and surface it from `build`/`exec`, so a method
/// chain never panics half-way through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// INSERT without a target table
    #[error("table not specified")]
    TableNotSpecified,

    /// INSERT without columns (or without any value rows)
    #[error("column not specified")]
    ColumnNotSpecified,

    /// `pair` used on a statement that already holds several rows
    #[error("pair only allows one record to insert")]
    PairMultipleRecords,

    /// A record type does not map the requested column
    #[error("record `{record}` has no column `{column}`")]
    UnknownColumn { record: String, column: String },

    /// A value row does not match the column list
    #[error("row {row} has {got} values, expected {expected}")]
    ValueCountMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// Placeholder markers and bound values disagree
    #[error("statement has {placeholders} placeholders but {values} values")]
    PlaceholderMismatch { placeholders: usize, values: usize },

    /// RETURNING requested on a dialect that cannot express it
    #[error("dialect `{0}` does not support RETURNING")]
    ReturningUnsupported(&'static str),

    /// INSERT IGNORE requested on a dialect that cannot express it
    #[error("dialect `{0}` does not support ignoring conflicting rows")]
    IgnoreUnsupported(&'static str),

    /// Empty table or column identifier
    #[error("identifier must not be empty")]
    EmptyIdent,
}

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum SqlError {
    /// Statement could not be built
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Operation not supported by this runner or dialect
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Statement did not finish within the configured timeout
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SqlError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the statement failed before execution
    pub fn is_build_error(&self) -> bool {
        matches!(self, Self::Build(_))
    }

    /// The underlying build error, if any
    pub fn as_build_error(&self) -> Option<&BuildError> {
        match self {
            Self::Build(e) => Some(e),
            _ => None,
        }
    }

    /// Parse a tokio_postgres error into a more specific SqlError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for SqlError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
