//! Result-set post-processing.
//!
//! Helpers over `Vec<Row>` result sets for the common shapes this
//! library stores: JSON blobs in a text column and ISO-formatted
//! dates. All of them mutate rows in place and leave rows without the
//! target column, or with unparseable content, untouched.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::access::Row;
use crate::value::SqlValue;

/// Flattens a JSON-object column into its row.
///
/// For each row holding a JSON object under `column` (default
/// `"data"`), the object's fields are merged into the row — existing
/// columns win — and the source column is removed.
pub fn merge_json_column(rows: &mut [Row], column: Option<&str>) {
    let column = column.unwrap_or("data");
    for row in rows.iter_mut() {
        let Some(text) = row.get(column).and_then(SqlValue::as_str).map(str::to_string) else {
            continue;
        };
        let Ok(Value::Object(fields)) = serde_json::from_str(&text) else {
            continue;
        };

        row.remove(column);
        for (key, value) in fields {
            if row.contains_key(&key) {
                continue;
            }
            row.insert(key, field_value(value));
        }
    }
}

/// Decodes a JSON text column in place.
///
/// Each row's `column` (default `"data"`) is replaced by its parsed
/// JSON value, so serialization downstream emits structure instead of
/// an escaped string.
pub fn parse_json_column(rows: &mut [Row], column: Option<&str>) {
    let column = column.unwrap_or("data");
    for row in rows.iter_mut() {
        let Some(text) = row.get(column).and_then(SqlValue::as_str) else {
            continue;
        };
        let Ok(parsed) = serde_json::from_str::<Value>(text) else {
            continue;
        };
        row.insert(column.to_string(), SqlValue::Json(parsed));
    }
}

/// Reformats a date or datetime text column in place.
///
/// Values under `column` (default `"date"`) that parse as
/// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` are rendered with `format`
/// (default `"%Y-%m-%d %H:%M:%S"`, chrono strftime syntax).
pub fn format_date_column(rows: &mut [Row], column: Option<&str>, format: Option<&str>) {
    let column = column.unwrap_or("date");
    let format = format.unwrap_or("%Y-%m-%d %H:%M:%S");

    for row in rows.iter_mut() {
        let Some(text) = row.get(column).and_then(SqlValue::as_str) else {
            continue;
        };
        let Some(parsed) = parse_datetime(text) else {
            continue;
        };
        row.insert(
            column.to_string(),
            SqlValue::Text(parsed.format(format).to_string()),
        );
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn field_value(value: Value) -> SqlValue {
    match value {
        Value::String(s) => SqlValue::Text(s),
        Value::Number(n) if n.is_i64() => SqlValue::Integer(n.as_i64().unwrap_or(0)),
        Value::Null => SqlValue::Null,
        other => SqlValue::Json(other),
    }
}
