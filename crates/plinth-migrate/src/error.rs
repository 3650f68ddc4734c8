//! Error types for the migration runner.

use thiserror::Error;

/// Errors that can occur while loading or applying migrations.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The migrations directory could not be read.
    #[error("failed to read migrations directory '{path}': {source}")]
    DirRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The tracker table could not be created.
    #[error("failed to initialize migration tracker: {0}")]
    TrackerInit(#[source] plinth_db::DbError),

    /// Reading migration state (watermark, applied rows) failed.
    #[error("failed to check migration state: {0}")]
    StateQuery(#[source] plinth_db::DbError),

    /// A SQL statement within a migration failed in strict mode.
    #[error("migration '{file_name}' failed: {source}")]
    StatementFailed {
        file_name: String,
        #[source]
        source: plinth_db::DbError,
    },
}
