//! The `running_tasks` key/value store.

use plinth_db::{Db, Params, SqlValue};
use serde_json::Value;

use crate::error::TaskError;

/// Schema for the task table, applied by the host's migrations.
pub const RUNNING_TASKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS running_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data_key TEXT NOT NULL UNIQUE,
    data_value TEXT
)";

/// Writes or updates a task value under `key`.
///
/// Returns the generated row id when a new row was inserted, and `0`
/// when an existing row was updated — nonzero therefore means
/// "created". Empty keys and JSON `null` values are ignored (returns 0).
pub fn write_task(db: &Db, key: &str, value: &Value) -> Result<i64, TaskError> {
    if key.is_empty() || value.is_null() {
        return Ok(0);
    }

    if read_task(db, key)?.is_none() {
        let id = db.insert_query(
            "INSERT INTO running_tasks (data_key, data_value) VALUES (:dataKey, :dataValue)",
            Params::named([
                ("dataKey", SqlValue::from(key)),
                ("dataValue", SqlValue::Json(value.clone())),
            ]),
        )?;
        return Ok(id);
    }

    db.update_query(
        "UPDATE running_tasks SET data_value = :dataValue WHERE data_key = :dataKey",
        Params::named([
            ("dataKey", SqlValue::from(key)),
            ("dataValue", SqlValue::Json(value.clone())),
        ]),
    )?;
    Ok(0)
}

/// Reads the JSON-decoded task value under `key`, or `None`.
pub fn read_task(db: &Db, key: &str) -> Result<Option<Value>, TaskError> {
    let rows = db.select_query(
        "SELECT data_value FROM running_tasks WHERE data_key = :dataKey",
        Params::named([("dataKey", SqlValue::from(key))]),
    )?;

    match rows.first().and_then(|row| row.get("data_value")).and_then(SqlValue::as_str) {
        Some(text) => Ok(Some(serde_json::from_str(text)?)),
        None => Ok(None),
    }
}

/// Deletes the task under `key`. Absent keys are a no-op.
pub fn delete_task(db: &Db, key: &str) -> Result<(), TaskError> {
    db.delete_query(
        "DELETE FROM running_tasks WHERE data_key = :dataKey",
        Params::named([("dataKey", SqlValue::from(key))]),
    )?;
    Ok(())
}
