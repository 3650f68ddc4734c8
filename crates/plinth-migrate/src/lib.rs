//! Database migration runner.
//!
//! Migrations are data, not code: each [`Migration`] is a dated,
//! named, ordered list of SQL statements, collected into a
//! [`MigrationSet`] either programmatically or by scanning a directory
//! of `<date>_<name>` SQL files. [`upgrade`] replays every pending
//! migration and records it in a tracker table; a recorded migration
//! is never reconsidered, even if its file changes afterwards.
//!
//! Two failure modes for a failing statement:
//!
//! - strict (default): the whole run aborts immediately — no tracker
//!   row for the failing migration, no later migrations attempted;
//! - forced: remaining statements keep executing and the migration is
//!   recorded as applied despite the error.

mod error;
mod registry;
mod runner;

pub use error::MigrateError;
pub use registry::{Migration, MigrationSet};
pub use runner::{downgrade, upgrade, UpgradeOptions, UpgradeReport, DEFAULT_TRACKER_TABLE};
