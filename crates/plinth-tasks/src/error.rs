//! Error types for the task store and logger.

/// Errors that can occur while reading or writing tasks and logs.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A database operation failed.
    #[error("task store database error: {0}")]
    Database(#[from] plinth_db::DbError),

    /// A stored value could not be decoded as JSON.
    #[error("task store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
