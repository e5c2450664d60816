use thiserror::Error;

/// Error type for flowsql operations
#[derive(Debug, Error)]
pub enum FlowSqlError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Backend errors are wrapped verbatim, not classified further.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Malformed call shape: empty IN list, empty insert data,
    /// `run` without a raw statement.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No table specified for query")]
    MissingTable,

    /// Raised only by `first_or_fail` on an empty result set.
    #[error("Query returned no rows")]
    NotFound,

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Result type alias for flowsql operations
pub type Result<T> = std::result::Result<T, FlowSqlError>;
