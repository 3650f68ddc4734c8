//! The request-scoped query context.
//!
//! A [`Db`] lazily checks one connection out of the pool on first use
//! and keeps it for its own lifetime. It is the explicit replacement
//! for process-global connection state: request handlers and batch
//! jobs each own their context, and concurrent workers never share one
//! (`Db` is deliberately not `Sync`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::unsync::OnceCell;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Statement;

use crate::error::DbError;
use crate::interpolate::interpolate;
use crate::pool::DbPool;
use crate::value::{Params, SqlValue};

/// One result row, column name to value.
pub type Row = HashMap<String, SqlValue>;

/// Process-wide out-of-band flag recording that a SQL error occurred.
static SQL_ERROR: AtomicBool = AtomicBool::new(false);

/// Returns `true` if any query in this process has failed.
pub fn sql_error_flagged() -> bool {
    SQL_ERROR.load(Ordering::Relaxed)
}

/// Resets the process-wide SQL error flag.
pub fn clear_sql_error_flag() {
    SQL_ERROR.store(false, Ordering::Relaxed);
}

fn query_failed(e: rusqlite::Error) -> DbError {
    SQL_ERROR.store(true, Ordering::Relaxed);
    tracing::error!(error = %e, "sql statement failed");
    DbError::QueryFailed(e.to_string())
}

#[derive(Debug, Default)]
struct Diagnostics {
    last_query: String,
    last_params: Params,
    affected_rows: usize,
}

/// A request- or job-scoped database context.
pub struct Db {
    pool: DbPool,
    conn: OnceCell<PooledConnection<SqliteConnectionManager>>,
    diag: RefCell<Diagnostics>,
}

impl Db {
    /// Creates a context over the given pool. No connection is checked
    /// out until the first query runs.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            conn: OnceCell::new(),
            diag: RefCell::new(Diagnostics::default()),
        }
    }

    /// Returns the context's connection, checking it out on first use.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the pool cannot supply one.
    pub fn connection(&self) -> Result<&PooledConnection<SqliteConnectionManager>, DbError> {
        self.conn
            .get_or_try_init(|| self.pool.get().map_err(|e| DbError::Connection(e.to_string())))
    }

    /// Runs a SELECT and collects every row as a column → value map.
    ///
    /// # Errors
    ///
    /// `DbError::EmptyQuery` for an empty query string, otherwise
    /// `DbError::QueryFailed` carrying the driver message.
    pub fn select_query(&self, query: &str, params: Params) -> Result<Vec<Row>, DbError> {
        if query.is_empty() {
            return Err(DbError::EmptyQuery);
        }
        self.remember(query, &params);

        let conn = self.connection()?;
        let mut stmt = conn.prepare(query).map_err(query_failed)?;
        bind(&mut stmt, &params)?;

        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = stmt.raw_query();
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(query_failed)? {
            let mut map = Row::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                let value = row.get_ref(i).map_err(query_failed)?;
                map.insert(name.clone(), SqlValue::from_column(value));
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Selects every row of a table.
    pub fn select_all(&self, table: &str) -> Result<Vec<Row>, DbError> {
        self.select_query(&format!("SELECT * FROM {table}"), Params::empty())
    }

    /// Selects every row of a table where `column` equals `value`.
    pub fn select_all_by_condition(
        &self,
        table: &str,
        column: &str,
        value: SqlValue,
    ) -> Result<Vec<Row>, DbError> {
        self.select_query(
            &format!("SELECT * FROM {table} WHERE {column} = ?1"),
            Params::Positional(vec![value]),
        )
    }

    /// Returns the column names of a table, in schema order.
    pub fn select_column_names(&self, table: &str) -> Result<Vec<String>, DbError> {
        let rows = self.select_query(
            "SELECT name FROM pragma_table_info(?1)",
            Params::Positional(vec![SqlValue::from(table)]),
        )?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("name").and_then(SqlValue::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Runs an UPDATE statement and returns the affected row count.
    pub fn update_query(&self, query: &str, params: Params) -> Result<usize, DbError> {
        self.run(query, params)
    }

    /// Runs a DELETE statement.
    pub fn delete_query(&self, query: &str, params: Params) -> Result<(), DbError> {
        self.run(query, params).map(|_| ())
    }

    /// Runs an INSERT statement and returns the generated row id.
    pub fn insert_query(&self, query: &str, params: Params) -> Result<i64, DbError> {
        self.run(query, params)?;
        Ok(self.connection()?.last_insert_rowid())
    }

    /// Runs a statement that returns no result set, without parameters.
    pub fn execute_query(&self, query: &str) -> Result<(), DbError> {
        self.run(query, Params::empty()).map(|_| ())
    }

    /// Inserts many rows with a single multi-row INSERT.
    ///
    /// `query_prefix` must end in `VALUES ` (for example
    /// `INSERT INTO t (a, b) VALUES `); one `(?, …)` placeholder group
    /// is appended per row and all values are bound flattened. Returns
    /// the last generated row id, or 0 without touching the database
    /// when `rows` is empty.
    pub fn insert_multiple(&self, query_prefix: &str, rows: &[Vec<SqlValue>]) -> Result<i64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let group = format!("({})", vec!["?"; rows[0].len()].join(","));
        let sql = format!("{}{}", query_prefix, vec![group; rows.len()].join(","));
        let flat: Vec<SqlValue> = rows.iter().flatten().cloned().collect();

        self.run(&sql, Params::Positional(flat))?;
        Ok(self.connection()?.last_insert_rowid())
    }

    /// Returns the row id generated by the most recent INSERT.
    pub fn last_insert_id(&self) -> Result<i64, DbError> {
        Ok(self.connection()?.last_insert_rowid())
    }

    /// Returns the number of rows affected by the most recent
    /// INSERT, UPDATE, or DELETE.
    pub fn affected_rows(&self) -> usize {
        self.diag.borrow().affected_rows
    }

    /// Returns the text of the most recently prepared statement.
    pub fn last_query(&self) -> String {
        self.diag.borrow().last_query.clone()
    }

    /// Returns the parameters bound to the most recent statement.
    pub fn last_params(&self) -> Params {
        self.diag.borrow().last_params.clone()
    }

    /// Returns the last statement with its parameters substituted in.
    ///
    /// For logging only — the result is never re-parsed as SQL.
    pub fn interpolated_query(&self) -> String {
        let diag = self.diag.borrow();
        interpolate(&diag.last_query, &diag.last_params)
    }

    /// Releases the connection explicitly. Dropping the context has the
    /// same effect; this exists for call sites that want the release to
    /// be visible.
    pub fn close(self) {
        drop(self);
    }

    fn remember(&self, query: &str, params: &Params) {
        let mut diag = self.diag.borrow_mut();
        diag.last_query = query.to_string();
        diag.last_params = params.clone();
    }

    fn run(&self, query: &str, params: Params) -> Result<usize, DbError> {
        self.remember(query, &params);

        let conn = self.connection()?;
        let mut stmt = conn.prepare(query).map_err(query_failed)?;
        bind(&mut stmt, &params)?;
        let affected = stmt.raw_execute().map_err(query_failed)?;
        self.diag.borrow_mut().affected_rows = affected;
        Ok(affected)
    }
}

/// Binds parameters onto a prepared statement.
///
/// Positional values bind at 1-based indices; named values resolve
/// their `:name` placeholder index first.
fn bind(stmt: &mut Statement<'_>, params: &Params) -> Result<(), DbError> {
    match params {
        Params::Positional(values) => {
            for (i, value) in values.iter().enumerate() {
                stmt.raw_bind_parameter(i + 1, value).map_err(query_failed)?;
            }
        }
        Params::Named(pairs) => {
            for (key, value) in pairs {
                let name = format!(":{key}");
                let index = stmt
                    .parameter_index(&name)
                    .map_err(query_failed)?
                    .ok_or_else(|| DbError::QueryFailed(format!("unknown parameter {name}")))?;
                stmt.raw_bind_parameter(index, value).map_err(query_failed)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, DbRuntimeSettings};

    fn test_db() -> Db {
        let pool =
            create_pool(":memory:", DbRuntimeSettings::default()).expect("pool should build");
        let db = Db::new(pool);
        db.execute_query("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, qty INTEGER)")
            .expect("table should create");
        db
    }

    #[test]
    fn empty_select_is_rejected() {
        let db = test_db();
        let err = db.select_query("", Params::empty()).unwrap_err();
        assert!(matches!(err, DbError::EmptyQuery));
    }

    #[test]
    fn insert_and_select_round_trip() {
        let db = test_db();
        let id = db
            .insert_query(
                "INSERT INTO items (name, qty) VALUES (?, ?)",
                Params::positional([SqlValue::from("bolt"), SqlValue::Integer(12)]),
            )
            .expect("insert should succeed");
        assert_eq!(id, 1);

        let rows = db.select_all("items").expect("select should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"].as_str(), Some("bolt"));
        assert_eq!(rows[0]["qty"].as_i64(), Some(12));
    }

    #[test]
    fn named_parameters_bind() {
        let db = test_db();
        db.insert_query(
            "INSERT INTO items (name, qty) VALUES (:name, :qty)",
            Params::named([("name", SqlValue::from("nut")), ("qty", SqlValue::Integer(3))]),
        )
        .expect("insert should succeed");

        let rows = db
            .select_query(
                "SELECT qty FROM items WHERE name = :name",
                Params::named([("name", SqlValue::from("nut"))]),
            )
            .expect("select should succeed");
        assert_eq!(rows[0]["qty"].as_i64(), Some(3));
    }

    #[test]
    fn column_names_come_back_in_schema_order() {
        let db = test_db();
        let names = db
            .select_column_names("items")
            .expect("metadata query should succeed");
        assert_eq!(names, vec!["id", "name", "qty"]);

        let none = db
            .select_column_names("missing_table")
            .expect("absent table should not error");
        assert!(none.is_empty());
    }

    #[test]
    fn select_by_condition_parameterizes_value() {
        let db = test_db();
        db.insert_query(
            "INSERT INTO items (name, qty) VALUES (?, ?)",
            Params::positional([SqlValue::from("o'ring"), SqlValue::Integer(1)]),
        )
        .expect("insert should succeed");

        let rows = db
            .select_all_by_condition("items", "name", SqlValue::from("o'ring"))
            .expect("select should succeed");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn insert_multiple_batches_rows() {
        let db = test_db();
        let rows = vec![
            vec![SqlValue::from("a"), SqlValue::Integer(1)],
            vec![SqlValue::from("b"), SqlValue::Integer(2)],
            vec![SqlValue::from("c"), SqlValue::Integer(3)],
        ];
        let last_id = db
            .insert_multiple("INSERT INTO items (name, qty) VALUES ", &rows)
            .expect("batch insert should succeed");
        assert_eq!(last_id, 3);

        let all = db.select_all("items").expect("select should succeed");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn insert_multiple_empty_input_is_a_no_op() {
        let db = test_db();
        let last_id = db
            .insert_multiple("INSERT INTO items (name, qty) VALUES ", &[])
            .expect("empty batch should succeed");
        assert_eq!(last_id, 0);
        assert_ne!(db.last_query(), "INSERT INTO items (name, qty) VALUES ");
    }

    #[test]
    fn update_reports_affected_rows() {
        let db = test_db();
        for name in ["x", "y"] {
            db.insert_query(
                "INSERT INTO items (name, qty) VALUES (?, ?)",
                Params::positional([SqlValue::from(name), SqlValue::Integer(0)]),
            )
            .expect("insert should succeed");
        }

        let affected = db
            .update_query("UPDATE items SET qty = 9", Params::empty())
            .expect("update should succeed");
        assert_eq!(affected, 2);
        assert_eq!(db.affected_rows(), 2);
    }

    #[test]
    fn failures_collapse_to_query_failed_and_set_the_flag() {
        clear_sql_error_flag();
        let db = test_db();
        let err = db
            .select_query("SELECT * FROM missing_table", Params::empty())
            .unwrap_err();
        assert!(matches!(err, DbError::QueryFailed(_)));
        assert!(sql_error_flagged());
        clear_sql_error_flag();
    }

    #[test]
    fn diagnostics_track_last_statement() {
        let db = test_db();
        db.insert_query(
            "INSERT INTO items (name, qty) VALUES (?, ?)",
            Params::positional([SqlValue::from("a"), SqlValue::Integer(1)]),
        )
        .expect("insert should succeed");

        assert_eq!(db.last_query(), "INSERT INTO items (name, qty) VALUES (?, ?)");
        assert_eq!(
            db.interpolated_query(),
            "INSERT INTO items (name, qty) VALUES ('a', 1)"
        );
    }
}
