//! Built-in routes over the plinth route table.
//!
//! Each handler owns a fresh [`Db`] context for the request, per the
//! one-connection-per-worker rule.

use axum::http::StatusCode;
use plinth_db::{Db, DbPool};
use plinth_http::{Halt, Reply, RequestContext, RouteTable};
use plinth_tasks::{delete_task, log, read_task, recent_logs, write_task, TaskError};
use serde_json::{json, Value};

/// Builds the route table for the task and log APIs.
pub fn route_table(pool: DbPool) -> RouteTable {
    let read_pool = pool.clone();
    let write_pool = pool.clone();
    let delete_pool = pool.clone();
    let logs_pool = pool.clone();
    let log_write_pool = pool;

    RouteTable::new()
        .get("/api/tasks/{key}", move |ctx| {
            let db = Db::new(read_pool.clone());
            let key = required(ctx, "key")?;
            match read_task(&db, &key).map_err(halt)? {
                Some(value) => Ok(Reply::send(json!({
                    "message": "OK",
                    "key": key,
                    "value": value,
                }))),
                None => Err(Halt::not_found(Some("no task under this key"))),
            }
        })
        .post("/api/tasks/{key}", move |ctx| {
            let db = Db::new(write_pool.clone());
            let key = required(ctx, "key")?;
            let raw = required(ctx, "value")?;
            // A value that parses as JSON is stored structurally;
            // anything else is stored as a plain string.
            let value: Value =
                serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw.clone()));
            let id = write_task(&db, &key, &value).map_err(halt)?;
            Ok(Reply::send(json!({
                "message": "OK",
                "created": id != 0,
                "id": id,
            })))
        })
        .delete("/api/tasks/{key}", move |ctx| {
            let db = Db::new(delete_pool.clone());
            let key = required(ctx, "key")?;
            delete_task(&db, &key).map_err(halt)?;
            Ok(Reply::ok())
        })
        .get("/api/logs", move |ctx| {
            let db = Db::new(logs_pool.clone());
            let limit = ctx
                .params
                .get("limit")
                .and_then(|v| v.parse().ok())
                .unwrap_or(100);
            let rows = recent_logs(&db, limit).map_err(halt)?;
            Ok(Reply::send(json!({ "message": "OK", "logs": rows })))
        })
        .post("/api/logs", move |ctx| {
            let db = Db::new(log_write_pool.clone());
            let action = required(ctx, "action")?;
            let comment = ctx.params.get("comment").map(str::to_string);
            let status = ctx.params.get("status").map(str::to_string);
            let initiator = ctx.params.get("initiator").map(str::to_string);
            let info: Option<Value> = ctx
                .params
                .get("additional_info")
                .and_then(|raw| serde_json::from_str(raw).ok());

            let recorded = log(
                &db,
                &action,
                comment.as_deref(),
                info.as_ref(),
                status.as_deref(),
                initiator.as_deref(),
            )
            .map_err(halt)?;
            Ok(Reply::send(json!({ "message": "OK", "recorded": recorded })))
        })
}

fn required(ctx: &RequestContext, key: &str) -> Result<String, Halt> {
    ctx.params.get(key).map(str::to_string).ok_or_else(|| {
        Halt::error(
            StatusCode::BAD_REQUEST,
            &format!("missing parameter: {key}"),
        )
    })
}

fn halt(e: TaskError) -> Halt {
    Halt::error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
}
