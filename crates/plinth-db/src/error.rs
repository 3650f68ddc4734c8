//! Error types for the data access layer.

use thiserror::Error;

/// Errors produced by the [`crate::Db`] context.
///
/// Every statement-level failure — prepare, bind, or execute — collapses
/// into the single `QueryFailed` kind carrying the driver message, so
/// callers have exactly one fatal query error to handle.
#[derive(Debug, Error)]
pub enum DbError {
    /// Could not check a connection out of the pool.
    #[error("database connection unavailable: {0}")]
    Connection(String),

    /// A select was attempted with an empty query string.
    #[error("empty query string")]
    EmptyQuery,

    /// The statement could not be prepared or executed.
    #[error("query execution failed: {0}")]
    QueryFailed(String),
}
