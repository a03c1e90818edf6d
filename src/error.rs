//! Error types for the Redshift datasource plugin
//!
//! Three failure classes cross the host boundary:
//! - Configuration errors, raised before any network I/O
//! - Connection errors, wrapping the driver's message
//! - Query execution errors, wrapping the driver's message and the statement

use thiserror::Error;

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

/// Errors surfaced to the host runtime
#[derive(Debug, Error)]
pub enum PluginError {
    /// Datasource configuration is missing or invalid; detected before any I/O
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connecting to the warehouse failed, or a metadata query failed
    #[error("connection error: {0}")]
    Connection(String),

    /// A statement failed during execution
    #[error("query execution error: {message}")]
    QueryExecution {
        /// Driver-reported failure message
        message: String,
        /// The statement that failed, for host-side audit logs
        sql: Option<String>,
    },
}

impl PluginError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a connection error wrapping a driver failure
    pub fn connection_from(context: &str, err: &tokio_postgres::Error) -> Self {
        Self::Connection(format!("{}: {}", context, err))
    }

    /// Create a query execution error
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql: None,
        }
    }

    /// Create a query execution error carrying the failed statement
    pub fn query_with_sql(msg: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql: Some(sql.into()),
        }
    }

    /// Whether the host may reasonably retry the operation.
    ///
    /// The plugin itself never retries; a single failure is terminal for that
    /// invocation. Connection failures are flagged so the host's own retry
    /// policy can distinguish them from statement or config errors.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
