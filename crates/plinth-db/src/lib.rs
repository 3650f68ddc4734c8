//! Database layer for plinth backends.
//!
//! Provides SQLite connection pooling (via `r2d2`), a request-scoped
//! query context ([`Db`]) with explicit tagged parameter values, query
//! diagnostics (last statement, interpolated text), and a standalone
//! SQL dump utility.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process required.
//!   WAL allows concurrent readers with a single writer, which matches
//!   the request-scoped access pattern of this library.
//! - **Explicit `Db` context**: instead of hidden process-global
//!   connection state, every request or batch job owns a [`Db`] that
//!   lazily checks out one pooled connection and keeps it for its
//!   lifetime. `Db` is intentionally not `Sync`; concurrent workers
//!   each create their own.
//! - **Tagged parameter values**: [`SqlValue`] makes the bind kind
//!   (integer, text, JSON blob, null) a caller decision rather than a
//!   runtime type inspection.

mod access;
mod error;
mod export;
mod interpolate;
mod pool;
mod transform;
mod value;

pub use access::{clear_sql_error_flag, sql_error_flagged, Db, Row};
pub use error::DbError;
pub use export::{export_database, Export, ExportOptions};
pub use interpolate::interpolate;
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use transform::{format_date_column, merge_json_column, parse_json_column};
pub use value::{Params, SqlValue};
