//! Database Types and Common Structures
//!
//! Types shared by the driver and adapter layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend under benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Live PostgreSQL server (sqlx)
    Postgres,
    /// File-backed SQLite database (sqlx)
    Sqlite,
    /// In-process mocked driver
    Sqlmock,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Postgres,
        BackendKind::Sqlite,
        BackendKind::Sqlmock,
    ];

    /// SQL dialect spoken by the backend
    pub fn dialect(&self) -> Dialect {
        match self {
            BackendKind::Postgres | BackendKind::Sqlmock => Dialect::Postgres,
            BackendKind::Sqlite => Dialect::Sqlite,
        }
    }

    /// Prefix used for benchmark set names in reports
    pub fn set_prefix(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "Libpq",
            BackendKind::Sqlite => "Sqlite",
            BackendKind::Sqlmock => "Sqlmock",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Postgres => write!(f, "postgres"),
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Sqlmock => write!(f, "sqlmock"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "libpq" => Ok(BackendKind::Postgres),
            "sqlite" => Ok(BackendKind::Sqlite),
            "sqlmock" | "mock" => Ok(BackendKind::Sqlmock),
            other => Err(DatabaseError::ConfigurationError(format!(
                "unknown backend: {}",
                other
            ))),
        }
    }
}

/// SQL dialect; differs in placeholder style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// `$1, $2, ...`
    Postgres,
    /// `?, ?, ...`
    Sqlite,
}

/// `strftime` layout of SQLite markers, millisecond precision
pub const SQLITE_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%f";

/// Current UTC time in [`SQLITE_STAMP_FORMAT`]
pub const SQLITE_NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

impl Dialect {
    /// Placeholder for the 1-based parameter `position`
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", position),
            Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Comma separated placeholders for positions `first..first + count`
    pub fn placeholders(&self, first: usize, count: usize) -> String {
        (first..first + count)
            .map(|position| self.placeholder(position))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Expression an UPDATE assigns to the modified marker `column`; `None`
    /// where a trigger stamps it.
    ///
    /// On SQLite the stamp is the current millisecond, or one millisecond past
    /// the stored value when the clock has not moved on.
    pub fn modified_stamp(&self, column: &str) -> Option<String> {
        match self {
            Dialect::Postgres => None,
            Dialect::Sqlite => Some(format!(
                "max({}, strftime('{}', {}, '+0.001 seconds'))",
                SQLITE_NOW, SQLITE_STAMP_FORMAT, column
            )),
        }
    }
}

/// Pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: std::time::Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 4,
            acquire_timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// Database value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }

    /// Short type label used in conversion errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::DateTime(_) => "datetime",
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Columns
    pub columns: Vec<ColumnInfo>,
    /// Row values
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; used by the mocked driver to build canned row sets
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), DatabaseError> {
        if row.len() != self.columns.len() {
            return Err(DatabaseError::ValidationError(format!(
                "row has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the single row of a `RETURNING` result
    pub fn into_single_row(self) -> Result<Vec<Value>, DatabaseError> {
        let count = self.rows.len();
        let mut rows = self.rows.into_iter();
        match (rows.next(), count) {
            (Some(row), 1) => Ok(row),
            _ => Err(DatabaseError::QueryFailed(format!(
                "expected exactly one row, got {}",
                count
            ))),
        }
    }
}

/// Command result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResult {
    /// Rows affected
    pub rows_affected: u64,
    /// Last inserted id (SQLite rowid)
    pub last_insert_id: Option<i64>,
}

/// Database error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Schema statement {index} failed: {message}")]
    SchemaFailed { index: usize, message: String },

    #[error("Unexpected statement: {0}")]
    UnexpectedStatement(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Data conversion error: {0}")]
    ConversionError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_per_dialect() {
        assert_eq!(Dialect::Postgres.placeholders(1, 3), "$1, $2, $3");
        assert_eq!(Dialect::Postgres.placeholders(5, 2), "$5, $6");
        assert_eq!(Dialect::Sqlite.placeholders(5, 2), "?, ?");
    }

    #[test]
    fn test_modified_stamp_per_dialect() {
        assert_eq!(Dialect::Postgres.modified_stamp("modified_tmz"), None);
        let stamp = Dialect::Sqlite.modified_stamp("modified_tmz").unwrap();
        assert!(stamp.starts_with("max("));
        assert!(stamp.contains("'%Y-%m-%d %H:%M:%f'"));
        assert!(stamp.contains("modified_tmz, '+0.001 seconds'"));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("libpq".parse::<BackendKind>().unwrap(), BackendKind::Postgres);
        assert_eq!("SQLITE".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert_eq!("mock".parse::<BackendKind>().unwrap(), BackendKind::Sqlmock);
        assert!("oracle".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut result = QueryResult::new(vec![ColumnInfo::new("pk", "INT4")]);
        assert!(result.push_row(vec![Value::Int(1)]).is_ok());
        assert!(result.push_row(vec![Value::Int(1), Value::Null]).is_err());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_into_single_row() {
        let mut result = QueryResult::new(vec![ColumnInfo::new("pk", "INT4")]);
        assert!(result.clone().into_single_row().is_err());
        result.push_row(vec![Value::Int(7)]).unwrap();
        assert_eq!(result.into_single_row().unwrap(), vec![Value::Int(7)]);
    }
}
