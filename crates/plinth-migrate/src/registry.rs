//! Migration definitions and the directory loader.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::MigrateError;

/// One migration: a dated, named, ordered list of SQL statements.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration date; together with `name` it identifies the migration.
    pub date: NaiveDate,
    /// Migration name, unique per date.
    pub name: String,
    /// Source file name recorded in the tracker.
    pub file_name: String,
    /// Statements, executed in order.
    pub statements: Vec<String>,
}

impl Migration {
    /// Builds a programmatic migration; the recorded file name is
    /// derived as `<date>_<name>`.
    pub fn new(date: NaiveDate, name: impl Into<String>, statements: Vec<String>) -> Self {
        let name = name.into();
        let file_name = format!("{date}_{name}");
        Self {
            date,
            name,
            file_name,
            statements,
        }
    }
}

/// An ordered collection of migrations.
///
/// Order is application order: callers are responsible for
/// chronological naming when loading from a directory (entries are
/// taken in sorted file-name order, so ISO dates sort correctly).
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

impl MigrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a migration; application order is insertion order.
    pub fn push(&mut self, migration: Migration) {
        self.migrations.push(migration);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Migration> {
        self.migrations.iter()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Loads migrations from a directory of `<date>_<name>` SQL files.
    ///
    /// The date prefix must parse as `YYYY-MM-DD`; files without a
    /// `_` separator or with an unparseable date are skipped. A missing
    /// directory yields an empty set with a warning, matching the
    /// "nothing to do" semantics of a fresh deployment.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::DirRead` if the directory exists but
    /// cannot be listed, or a file cannot be read.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self, MigrateError> {
        let path = path.as_ref();
        if !path.is_dir() {
            tracing::warn!(path = %path.display(), "migrations directory is missing");
            return Ok(Self::new());
        }

        let dir_read = |source| MigrateError::DirRead {
            path: path.display().to_string(),
            source,
        };

        let mut file_names: Vec<String> = Vec::new();
        for entry in fs::read_dir(path).map_err(dir_read)? {
            let entry = entry.map_err(dir_read)?;
            if entry.path().is_file() {
                file_names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        file_names.sort();
        tracing::info!(count = file_names.len(), "found migration file(s)");

        let mut set = Self::new();
        for file_name in file_names {
            let Some((date_part, name)) = file_name.split_once('_') else {
                continue;
            };
            let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
                tracing::debug!(file = file_name, "skipping file with unparseable date");
                continue;
            };

            let sql = fs::read_to_string(path.join(&file_name)).map_err(dir_read)?;
            let statements = split_statements(&sql);

            set.push(Migration {
                date,
                name: name.to_string(),
                file_name,
                statements,
            });
        }

        Ok(set)
    }
}

/// Splits file content into individual statements on `;`.
///
/// Statement structure is the migration author's contract, as it was
/// when migrations were loadable code: semicolons inside string
/// literals are not supported.
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{s};"))
        .collect()
}
