//! The append-only `logs` table.

use plinth_db::{Db, Params, Row, SqlValue};
use serde_json::Value;

use crate::error::TaskError;

/// Schema for the log table, applied by the host's migrations.
pub const LOGS_TABLE: &str = "CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    log_action TEXT NOT NULL,
    log_comment TEXT NOT NULL,
    additional_info TEXT NOT NULL,
    status TEXT NOT NULL,
    initiator TEXT NOT NULL
)";

const ACTION_CAP: usize = 32;
const COMMENT_CAP: usize = 128;
const STATUS_CAP: usize = 32;
const INITIATOR_CAP: usize = 32;

/// Appends one log row.
///
/// Field caps: action ≤ 32, comment ≤ 128, status ≤ 32, initiator ≤ 32
/// bytes. An entry exceeding any cap is dropped whole — no row, no
/// error — and the function returns `false`. Returns `true` when the
/// row was written.
pub fn log(
    db: &Db,
    action: &str,
    comment: Option<&str>,
    additional_info: Option<&Value>,
    status: Option<&str>,
    initiator: Option<&str>,
) -> Result<bool, TaskError> {
    let comment = comment.unwrap_or("");
    let status = status.unwrap_or("");
    let initiator = initiator.unwrap_or("");
    let info = additional_info.cloned().unwrap_or_else(|| Value::Array(Vec::new()));

    if action.len() > ACTION_CAP
        || comment.len() > COMMENT_CAP
        || status.len() > STATUS_CAP
        || initiator.len() > INITIATOR_CAP
    {
        tracing::debug!(action, "log entry dropped: field over length cap");
        return Ok(false);
    }

    db.insert_query(
        "INSERT INTO logs (log_action, log_comment, additional_info, status, initiator)
         VALUES (:logAction, :logComment, :logAdditionalInfo, :logStatus, :logInitiator)",
        Params::named([
            ("logAction", SqlValue::from(action)),
            ("logComment", SqlValue::from(comment)),
            ("logAdditionalInfo", SqlValue::Json(info)),
            ("logStatus", SqlValue::from(status)),
            ("logInitiator", SqlValue::from(initiator)),
        ]),
    )?;
    Ok(true)
}

/// Returns the newest `limit` log rows, newest first.
pub fn recent_logs(db: &Db, limit: i64) -> Result<Vec<Row>, TaskError> {
    let rows = db.select_query(
        "SELECT * FROM logs ORDER BY id DESC LIMIT :limit",
        Params::named([("limit", SqlValue::Integer(limit))]),
    )?;
    Ok(rows)
}
