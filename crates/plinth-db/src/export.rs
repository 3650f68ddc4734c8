//! Standalone SQL dump utility.
//!
//! Opens its own connection (deliberately bypassing the shared pool)
//! and renders the database as replayable SQL: one
//! `CREATE TABLE IF NOT EXISTS` per table followed by `INSERT`
//! statements batched 100 rows apiece. String content is escaped and
//! newlines become literal `\n` so the dump stays line-oriented.

use std::path::Path;

use chrono::Local;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::error::DbError;

/// Rows per emitted INSERT statement.
const INSERT_BATCH_SIZE: usize = 100;

/// Options for [`export_database`].
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Restrict the dump to these tables; `None` dumps everything.
    pub tables: Option<Vec<String>>,

    /// File name for the dump; a timestamped name is generated when absent.
    pub backup_name: Option<String>,
}

/// A finished database dump.
#[derive(Debug, Clone)]
pub struct Export {
    /// Suggested download file name.
    pub file_name: String,

    /// The SQL text.
    pub content: String,
}

/// Dumps the database at `db_path` as SQL text.
///
/// # Errors
///
/// `DbError::Connection` if the file cannot be opened,
/// `DbError::QueryFailed` if reading schema or rows fails.
pub fn export_database(db_path: &str, options: &ExportOptions) -> Result<Export, DbError> {
    let conn = Connection::open(db_path).map_err(|e| DbError::Connection(e.to_string()))?;

    let mut content = format!(
        "-- plinth database export\n-- source: {db_path}\n-- generated: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    for table in target_tables(&conn, options.tables.as_deref())? {
        let (name, create_sql) = table;
        content.push_str("\n\n");
        content.push_str(&ensure_if_not_exists(&create_sql));
        content.push_str(";\n");
        dump_rows(&conn, &name, &mut content)?;
        content.push_str("\n\n");
    }

    let file_name = options
        .backup_name
        .clone()
        .unwrap_or_else(|| default_backup_name(db_path));

    Ok(Export { file_name, content })
}

fn target_tables(
    conn: &Connection,
    filter: Option<&[String]>,
) -> Result<Vec<(String, String)>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT name, sql FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(read_failed)?;

    let tables = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(read_failed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_failed)?;

    Ok(match filter {
        Some(wanted) => tables
            .into_iter()
            .filter(|(name, _)| wanted.iter().any(|w| w == name))
            .collect(),
        None => tables,
    })
}

fn dump_rows(conn: &Connection, table: &str, content: &mut String) -> Result<(), DbError> {
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM \"{table}\""))
        .map_err(read_failed)?;
    let column_count = stmt.column_count();

    let mut rendered: Vec<String> = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next().map_err(read_failed)? {
        let mut tuple = String::from("(");
        for i in 0..column_count {
            if i > 0 {
                tuple.push(',');
            }
            render_field(row.get_ref(i).map_err(read_failed)?, &mut tuple);
        }
        tuple.push(')');
        rendered.push(tuple);
    }

    for chunk in rendered.chunks(INSERT_BATCH_SIZE) {
        content.push_str(&format!("\nINSERT INTO {table} VALUES"));
        for (i, tuple) in chunk.iter().enumerate() {
            content.push('\n');
            content.push_str(tuple);
            if i + 1 < chunk.len() {
                content.push(',');
            }
        }
        content.push(';');
    }

    Ok(())
}

/// Every field is emitted double-quoted; NULL becomes an empty string.
fn render_field(value: ValueRef<'_>, out: &mut String) {
    out.push('"');
    match value {
        ValueRef::Null => {}
        ValueRef::Integer(i) => out.push_str(&i.to_string()),
        ValueRef::Real(f) => out.push_str(&f.to_string()),
        ValueRef::Text(t) => out.push_str(&escape(&String::from_utf8_lossy(t))),
        ValueRef::Blob(b) => out.push_str(&escape(&String::from_utf8_lossy(b))),
    }
    out.push('"');
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn ensure_if_not_exists(create_sql: &str) -> String {
    let prefix = "CREATE TABLE";
    if create_sql.len() >= prefix.len()
        && create_sql[..prefix.len()].eq_ignore_ascii_case(prefix)
        && !create_sql[prefix.len()..]
            .trim_start()
            .to_ascii_uppercase()
            .starts_with("IF NOT EXISTS")
    {
        format!("CREATE TABLE IF NOT EXISTS{}", &create_sql[prefix.len()..])
    } else {
        create_sql.to_string()
    }
}

fn default_backup_name(db_path: &str) -> String {
    let stem = Path::new(db_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string());
    let now = Local::now();
    format!(
        "{stem}___({}_{}).sql",
        now.format("%H-%M-%S"),
        now.format("%d-%m-%Y")
    )
}

fn read_failed(e: rusqlite::Error) -> DbError {
    DbError::QueryFailed(e.to_string())
}
