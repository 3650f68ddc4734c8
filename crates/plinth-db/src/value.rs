//! Tagged parameter and column values.
//!
//! The bind kind of every parameter is chosen explicitly by the caller
//! through [`SqlValue`] instead of being inferred from a runtime type.
//! JSON values are serialized to their compact text form at bind time.

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;
use serde::{Serialize, Serializer};

/// A single SQL parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// A 64-bit integer, bound as SQL INTEGER.
    Integer(i64),
    /// Arbitrary text, bound as SQL TEXT.
    Text(String),
    /// A structured value, JSON-encoded and bound as SQL TEXT.
    Json(serde_json::Value),
    /// SQL NULL.
    Null,
}

impl SqlValue {
    /// Returns the text content, if this is a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an `Integer` value or a
    /// `Text` value holding an integer literal.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns `true` for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Converts a column value read from SQLite.
    ///
    /// Reals and blobs come back as text; the callers of this layer
    /// treat every column as a string unless they ask for an integer.
    pub(crate) fn from_column(value: ValueRef<'_>) -> SqlValue {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Text(f.to_string()),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlValue::Integer(i) => Ok(ToSqlOutput::from(*i)),
            SqlValue::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            SqlValue::Json(v) => Ok(ToSqlOutput::Owned(Value::Text(v.to_string()))),
            SqlValue::Null => Ok(ToSqlOutput::Owned(Value::Null)),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SqlValue::Integer(i) => serializer.serialize_i64(*i),
            SqlValue::Text(s) => serializer.serialize_str(s),
            SqlValue::Json(v) => v.serialize(serializer),
            SqlValue::Null => serializer.serialize_unit(),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        SqlValue::Json(value)
    }
}

/// Bound parameters for a statement.
///
/// Positional values bind to 1-based placeholder indices (`?1` is the
/// first value). Named values bind to `:name` placeholders; keys are
/// given without the leading colon.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Sequential values for `?` placeholders.
    Positional(Vec<SqlValue>),
    /// `(key, value)` pairs for `:key` placeholders.
    Named(Vec<(String, SqlValue)>),
}

impl Params {
    /// No parameters.
    pub fn empty() -> Self {
        Params::Positional(Vec::new())
    }

    /// Builds positional parameters from anything convertible to [`SqlValue`].
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Builds named parameters; keys are given without the leading colon.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns `true` when no values are bound.
    pub fn is_empty(&self) -> bool {
        match self {
            Params::Positional(v) => v.is_empty(),
            Params::Named(v) => v.is_empty(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::empty()
    }
}
