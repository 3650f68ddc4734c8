//! SQLite connection pool.
//!
//! Connections open with the full-mutex threading mode and are put
//! into WAL journal mode on checkout, so multiple request workers can
//! read while one writes.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Pool and per-connection tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database before
    /// giving up, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on concurrently checked-out connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Builds the pool for the database at `db_path`.
///
/// `:memory:` is accepted for tests, with the caveat that every pooled
/// connection then holds its own private database; file paths are what
/// production configs use.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` when the pool cannot be built, for
/// example when the database file is not creatable.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;

            // In-memory databases report "memory" here, which is fine.
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))?;
            if mode != "wal" && mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!("journal_mode is {mode}, expected wal")),
                ));
            }
            Ok(())
        });

    Ok(Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?)
}
