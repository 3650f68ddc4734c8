use plinth_db::{create_pool, Db, DbRuntimeSettings};
use serde_json::json;

use crate::{delete_task, log, read_task, recent_logs, write_task, LOGS_TABLE, RUNNING_TASKS_TABLE};

fn test_db() -> Db {
    let pool = create_pool(":memory:", DbRuntimeSettings::default()).expect("pool should build");
    let db = Db::new(pool);
    db.execute_query(RUNNING_TASKS_TABLE).expect("task table should create");
    db.execute_query(LOGS_TABLE).expect("log table should create");
    db
}

#[test]
fn write_then_read_returns_deep_equal_value() {
    let db = test_db();
    let value = json!({ "step": 3, "items": ["a", "b"] });

    let id = write_task(&db, "import", &value).expect("write should succeed");
    assert!(id > 0, "first write should report the created row id");

    let read = read_task(&db, "import").expect("read should succeed");
    assert_eq!(read, Some(value));
}

#[test]
fn second_write_updates_in_place() {
    let db = test_db();
    write_task(&db, "import", &json!({ "step": 1 })).expect("write should succeed");

    let id = write_task(&db, "import", &json!({ "step": 2 })).expect("rewrite should succeed");
    assert_eq!(id, 0, "updates report 0, not a row id");

    let read = read_task(&db, "import").expect("read should succeed");
    assert_eq!(read, Some(json!({ "step": 2 })));

    // Upsert, never duplicate rows.
    let rows = db.select_all("running_tasks").expect("select should succeed");
    assert_eq!(rows.len(), 1);
}

#[test]
fn delete_then_read_returns_none() {
    let db = test_db();
    write_task(&db, "import", &json!(1)).expect("write should succeed");
    delete_task(&db, "import").expect("delete should succeed");
    assert_eq!(read_task(&db, "import").expect("read should succeed"), None);

    // Deleting an absent key is a no-op.
    delete_task(&db, "import").expect("second delete should succeed");
}

#[test]
fn missing_task_reads_as_none() {
    let db = test_db();
    assert_eq!(read_task(&db, "nothing").expect("read should succeed"), None);
}

#[test]
fn empty_key_and_null_value_are_ignored() {
    let db = test_db();
    assert_eq!(write_task(&db, "", &json!(1)).expect("write should succeed"), 0);
    assert_eq!(
        write_task(&db, "k", &serde_json::Value::Null).expect("write should succeed"),
        0
    );
    assert_eq!(read_task(&db, "k").expect("read should succeed"), None);
}

#[test]
fn log_at_the_cap_is_inserted() {
    let db = test_db();
    let action = "a".repeat(32);
    let written = log(&db, &action, Some("done"), None, Some("ok"), Some("cli"))
        .expect("log should succeed");
    assert!(written);

    let rows = recent_logs(&db, 10).expect("select should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["log_action"].as_str(), Some(action.as_str()));
    assert_eq!(rows[0]["additional_info"].as_str(), Some("[]"));
}

#[test]
fn oversized_log_is_dropped_silently() {
    let db = test_db();
    let action = "a".repeat(33);
    let written = log(&db, &action, None, None, None, None).expect("log should not error");
    assert!(!written);

    let rows = recent_logs(&db, 10).expect("select should succeed");
    assert!(rows.is_empty(), "no row may be written for an oversized entry");
}

#[test]
fn comment_cap_is_128() {
    let db = test_db();
    assert!(log(&db, "act", Some(&"c".repeat(128)), None, None, None).expect("should insert"));
    assert!(!log(&db, "act", Some(&"c".repeat(129)), None, None, None).expect("should drop"));
}

#[test]
fn recent_logs_come_newest_first() {
    let db = test_db();
    for n in 1..=3 {
        log(&db, &format!("action-{n}"), None, None, None, None).expect("log should succeed");
    }

    let rows = recent_logs(&db, 2).expect("select should succeed");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["log_action"].as_str(), Some("action-3"));
    assert_eq!(rows[1]["log_action"].as_str(), Some("action-2"));
}

#[test]
fn structured_additional_info_round_trips() {
    let db = test_db();
    let info = json!({ "rows": 42 });
    log(&db, "import", None, Some(&info), None, None).expect("log should succeed");

    let rows = recent_logs(&db, 1).expect("select should succeed");
    assert_eq!(rows[0]["additional_info"].as_str(), Some(r#"{"rows":42}"#));
}
