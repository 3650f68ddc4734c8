//! The upgrade state machine.

use chrono::NaiveDate;
use plinth_db::{Db, Params, SqlValue};

use crate::error::MigrateError;
use crate::registry::{Migration, MigrationSet};

/// Default name of the tracker table.
pub const DEFAULT_TRACKER_TABLE: &str = "migration_tracker";

/// Options for one upgrade run.
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    /// Keep going past failing statements and record partially applied
    /// migrations anyway.
    pub force: bool,

    /// Name of the tracker table.
    pub tracker_table: String,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            force: false,
            tracker_table: DEFAULT_TRACKER_TABLE.to_string(),
        }
    }
}

/// Outcome of an upgrade run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Migrations recorded as applied during this run.
    pub applied: usize,

    /// Statements that failed (nonzero only under forced mode).
    pub statements_failed: usize,
}

/// Replays every pending migration from `set` against `db`.
///
/// Creates the tracker table when a metadata lookup finds it absent.
/// A migration is pending when its date is at or past the watermark
/// (the latest recorded `migration_date`, or the epoch) and no tracker
/// row exists for its `(date, name)` pair. Pending migrations run in
/// set order, statement by statement.
///
/// # Errors
///
/// In strict mode a failing statement aborts the whole run with
/// `MigrateError::StatementFailed`; the failing migration is not
/// recorded and later migrations are not attempted. Under
/// `options.force` statement failures are logged, counted, and
/// swallowed.
pub fn upgrade(
    db: &Db,
    set: &MigrationSet,
    options: &UpgradeOptions,
) -> Result<UpgradeReport, MigrateError> {
    let tracker = options.tracker_table.as_str();
    ensure_tracker(db, tracker)?;

    let watermark = watermark_date(db, tracker)?;
    let pending: Vec<&Migration> = set
        .iter()
        .filter(|m| m.date >= watermark)
        .map(|m| is_recorded(db, tracker, m).map(|recorded| (m, recorded)))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter_map(|(m, recorded)| (!recorded).then_some(m))
        .collect();

    tracing::info!(count = pending.len(), "found pending migration(s)");

    let mut report = UpgradeReport::default();
    for migration in pending {
        tracing::info!(
            migration = migration.file_name,
            statements = migration.statements.len(),
            "applying migration"
        );

        for statement in &migration.statements {
            if let Err(e) = db.execute_query(statement) {
                tracing::error!(migration = migration.file_name, error = %e, "statement failed");

                if !options.force {
                    return Err(MigrateError::StatementFailed {
                        file_name: migration.file_name.clone(),
                        source: e,
                    });
                }
                report.statements_failed += 1;
            }
        }

        record(db, tracker, migration)?;
        report.applied += 1;
    }

    Ok(report)
}

/// Rollback is intentionally out of scope.
pub fn downgrade() {}

fn ensure_tracker(db: &Db, tracker: &str) -> Result<(), MigrateError> {
    let rows = db
        .select_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
            Params::positional([SqlValue::from(tracker)]),
        )
        .map_err(MigrateError::StateQuery)?;

    if rows.is_empty() {
        tracing::info!(table = tracker, "initializing migration tracker");
        db.execute_query(&format!(
            "CREATE TABLE {tracker} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                migration_name TEXT NOT NULL,
                migration_date TEXT,
                file_name TEXT NOT NULL
            )"
        ))
        .map_err(MigrateError::TrackerInit)?;
    }

    Ok(())
}

/// The latest recorded migration date, or the epoch when none is
/// recorded. Dates are stored ISO-formatted, so the lexicographic
/// ORDER BY is chronological.
fn watermark_date(db: &Db, tracker: &str) -> Result<NaiveDate, MigrateError> {
    let rows = db
        .select_query(
            &format!("SELECT migration_date FROM {tracker} ORDER BY migration_date DESC LIMIT 1"),
            Params::empty(),
        )
        .map_err(MigrateError::StateQuery)?;

    // NaiveDate::default() is the epoch, 1970-01-01.
    Ok(rows
        .first()
        .and_then(|row| row.get("migration_date"))
        .and_then(SqlValue::as_str)
        .and_then(|text| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok())
        .unwrap_or_default())
}

fn is_recorded(db: &Db, tracker: &str, migration: &Migration) -> Result<bool, MigrateError> {
    let rows = db
        .select_query(
            &format!(
                "SELECT id FROM {tracker}
                 WHERE migration_date = :mDate AND migration_name = :mName LIMIT 1"
            ),
            Params::named([
                ("mDate", SqlValue::from(migration.date.to_string())),
                ("mName", SqlValue::from(migration.name.as_str())),
            ]),
        )
        .map_err(MigrateError::StateQuery)?;
    Ok(!rows.is_empty())
}

fn record(db: &Db, tracker: &str, migration: &Migration) -> Result<(), MigrateError> {
    db.insert_query(
        &format!(
            "INSERT INTO {tracker} (migration_name, migration_date, file_name)
             VALUES (:mName, :mDate, :fName)"
        ),
        Params::named([
            ("mName", SqlValue::from(migration.name.as_str())),
            ("mDate", SqlValue::from(migration.date.to_string())),
            ("fName", SqlValue::from(migration.file_name.as_str())),
        ]),
    )
    .map_err(MigrateError::StateQuery)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_db::{create_pool, DbRuntimeSettings};

    fn test_db() -> Db {
        let pool =
            create_pool(":memory:", DbRuntimeSettings::default()).expect("pool should build");
        Db::new(pool)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn migration(d: NaiveDate, name: &str, statements: &[&str]) -> Migration {
        Migration::new(d, name, statements.iter().map(|s| s.to_string()).collect())
    }

    fn tracker_rows(db: &Db) -> Vec<plinth_db::Row> {
        db.select_all(DEFAULT_TRACKER_TABLE).expect("tracker should exist")
    }

    fn table_exists(db: &Db, name: &str) -> bool {
        let rows = db
            .select_query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                Params::positional([SqlValue::from(name)]),
            )
            .expect("metadata query should succeed");
        !rows.is_empty()
    }

    #[test]
    fn fresh_database_creates_tracker_and_finds_no_matches() {
        let db = test_db();
        let report = upgrade(&db, &MigrationSet::new(), &UpgradeOptions::default())
            .expect("upgrade should succeed");

        assert_eq!(report, UpgradeReport::default());
        assert!(table_exists(&db, DEFAULT_TRACKER_TABLE));
        assert!(tracker_rows(&db).is_empty());
    }

    #[test]
    fn pending_migrations_apply_in_order_and_are_recorded() {
        let db = test_db();
        let mut set = MigrationSet::new();
        set.push(migration(
            date(2024, 1, 1),
            "create_t",
            &["CREATE TABLE t (a INTEGER);", "INSERT INTO t VALUES (1);"],
        ));
        set.push(migration(
            date(2024, 1, 2),
            "widen_t",
            &["ALTER TABLE t ADD COLUMN b TEXT;"],
        ));

        let report =
            upgrade(&db, &set, &UpgradeOptions::default()).expect("upgrade should succeed");
        assert_eq!(report.applied, 2);
        assert_eq!(report.statements_failed, 0);
        assert!(table_exists(&db, "t"));
        assert_eq!(tracker_rows(&db).len(), 2);
    }

    #[test]
    fn recorded_migrations_are_never_reconsidered() {
        let db = test_db();
        let mut set = MigrationSet::new();
        set.push(migration(
            date(2024, 1, 1),
            "create_t",
            &["CREATE TABLE t (a INTEGER);"],
        ));

        upgrade(&db, &set, &UpgradeOptions::default()).expect("first run should succeed");

        // Same (date, name), different content: still skipped.
        let mut changed = MigrationSet::new();
        changed.push(migration(
            date(2024, 1, 1),
            "create_t",
            &["CREATE TABLE other (x INTEGER);"],
        ));
        let report =
            upgrade(&db, &changed, &UpgradeOptions::default()).expect("second run should succeed");

        assert_eq!(report.applied, 0);
        assert!(!table_exists(&db, "other"));
    }

    #[test]
    fn migrations_older_than_the_watermark_are_skipped() {
        let db = test_db();
        let mut set = MigrationSet::new();
        set.push(migration(
            date(2024, 6, 1),
            "recent",
            &["CREATE TABLE recent (a INTEGER);"],
        ));
        upgrade(&db, &set, &UpgradeOptions::default()).expect("seed run should succeed");

        let mut late = MigrationSet::new();
        late.push(migration(
            date(2024, 5, 1),
            "backdated",
            &["CREATE TABLE backdated (a INTEGER);"],
        ));
        let report =
            upgrade(&db, &late, &UpgradeOptions::default()).expect("late run should succeed");

        assert_eq!(report.applied, 0, "pre-watermark migration must not run");
        assert!(!table_exists(&db, "backdated"));
    }

    #[test]
    fn strict_mode_aborts_on_first_failure() {
        let db = test_db();
        let mut set = MigrationSet::new();
        set.push(migration(
            date(2024, 1, 1),
            "broken",
            &[
                "CREATE TABLE ok_part (a INTEGER);",
                "INSERT INTO missing_table VALUES (1);",
            ],
        ));
        set.push(migration(
            date(2024, 1, 2),
            "never_reached",
            &["CREATE TABLE later (a INTEGER);"],
        ));

        let err = upgrade(&db, &set, &UpgradeOptions::default())
            .expect_err("strict mode should abort");
        match err {
            MigrateError::StatementFailed { file_name, .. } => {
                assert_eq!(file_name, "2024-01-01_broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(tracker_rows(&db).is_empty(), "failing migration must not be recorded");
        assert!(!table_exists(&db, "later"), "later migrations must not be attempted");
    }

    #[test]
    fn forced_mode_records_despite_failures_and_continues() {
        let db = test_db();
        let mut set = MigrationSet::new();
        set.push(migration(
            date(2024, 1, 1),
            "broken",
            &[
                "INSERT INTO missing_table VALUES (1);",
                "CREATE TABLE survives (a INTEGER);",
            ],
        ));
        set.push(migration(
            date(2024, 1, 2),
            "after_broken",
            &["CREATE TABLE later (a INTEGER);"],
        ));

        let options = UpgradeOptions {
            force: true,
            ..UpgradeOptions::default()
        };
        let report = upgrade(&db, &set, &options).expect("forced run should succeed");

        assert_eq!(report.applied, 2);
        assert_eq!(report.statements_failed, 1);
        assert!(table_exists(&db, "survives"), "statements after the failure still run");
        assert!(table_exists(&db, "later"), "later migrations are still attempted");
        assert_eq!(tracker_rows(&db).len(), 2);
    }

    #[test]
    fn custom_tracker_table_name_is_honored() {
        let db = test_db();
        let options = UpgradeOptions {
            force: false,
            tracker_table: "schema_history".to_string(),
        };
        upgrade(&db, &MigrationSet::new(), &options).expect("upgrade should succeed");
        assert!(table_exists(&db, "schema_history"));
        assert!(!table_exists(&db, DEFAULT_TRACKER_TABLE));
    }

    #[test]
    fn downgrade_is_a_no_op() {
        downgrade();
    }
}
