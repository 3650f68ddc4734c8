//! Task store and database logger.
//!
//! Convenience read/write/delete over two fixed tables, built on the
//! data access layer:
//!
//! - `running_tasks(data_key, data_value)` — at most one row per key,
//!   values JSON-serialized; writes upsert.
//! - `logs(log_action, log_comment, additional_info, status,
//!   initiator)` — append-only, with hard length caps per field.

mod error;
mod log;
mod tasks;

pub use error::TaskError;
pub use log::{log, recent_logs, LOGS_TABLE};
pub use tasks::{delete_task, read_task, write_task, RUNNING_TASKS_TABLE};

#[cfg(test)]
mod tests;
