//! SQLite Connection Implementation
//!
//! Provides a file-backed SQLite connection pool with sqlx integration

use crate::database::{
    engine::{ConnectionInfo, DatabaseConnection, DatabaseTransaction, Executor, PreparedStatement},
    types::{
        BackendKind, ColumnInfo, DatabaseError, Dialect, ExecuteResult, PoolSettings, QueryResult,
        Value,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteQueryResult,
    SqliteRow,
};
use sqlx::{Column, Executor as _, Row, Sqlite, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::Arc;

use super::prepared::StatementTarget;
use super::{SqlitePreparedStatement, SqliteTransaction};

/// chrono layout matching the millisecond text the schema defaults write
pub const SQLITE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// SQLite Connection
///
/// Manages a SQLite database file through a sqlx pool
pub struct SqliteConnection {
    pool: Arc<SqlitePool>,
    database_name: String,
    connection_id: String,
    connected_at: DateTime<Utc>,
}

impl SqliteConnection {
    /// Open a pool on `dsn` (`sqlite://path` or a bare path)
    pub async fn connect(dsn: &str, settings: &PoolSettings) -> Result<Self, DatabaseError> {
        let options = Self::connect_options(dsn)?;
        let database_name = options.get_filename().display().to_string();

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        tracing::debug!(database = %database_name, "sqlite pool opened");

        Ok(Self {
            pool: Arc::new(pool),
            database_name,
            connection_id: uuid::Uuid::new_v4().to_string(),
            connected_at: Utc::now(),
        })
    }

    fn connect_options(dsn: &str) -> Result<SqliteConnectOptions, DatabaseError> {
        // The benchmark opens two handles on the same database, which an
        // in-memory database cannot provide.
        if dsn.contains(":memory:") || dsn.contains("mode=memory") {
            return Err(DatabaseError::ConfigurationError(
                "in-memory SQLite databases are not supported, use a file path".to_string(),
            ));
        }

        let url = if dsn.starts_with("sqlite:") {
            dsn.to_string()
        } else {
            format!("sqlite:{}", dsn)
        };

        SqliteConnectOptions::from_str(&url)
            .map(|options| options.create_if_missing(true))
            .map_err(|e| DatabaseError::ConfigurationError(e.to_string()))
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Bind parameters in order
pub(crate) fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.clone()),
            Value::Binary(b) => query.bind(b.clone()),
            Value::DateTime(dt) => query.bind(dt.format(SQLITE_DATETIME_FORMAT).to_string()),
        };
    }
    query
}

pub(crate) fn to_execute_result(result: SqliteQueryResult) -> ExecuteResult {
    ExecuteResult {
        rows_affected: result.rows_affected(),
        last_insert_id: Some(result.last_insert_rowid()),
    }
}

/// Convert sqlx rows to QueryResult
pub(crate) fn rows_to_query_result(rows: Vec<SqliteRow>) -> Result<QueryResult, DatabaseError> {
    let columns = match rows.first() {
        Some(first) => first
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect(),
        None => Vec::new(),
    };

    let mut result = QueryResult::new(columns);
    for row in rows {
        let mut values = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            values.push(extract_value(&row, idx)?);
        }
        result.rows.push(values);
    }

    Ok(result)
}

/// Extract value from SQLite row
fn extract_value(row: &SqliteRow, idx: usize) -> Result<Value, DatabaseError> {
    let value_ref = row.try_get_raw(idx).map_err(|e| {
        DatabaseError::QueryFailed(format!("Failed to get value at index {}: {}", idx, e))
    })?;

    if value_ref.is_null() {
        return Ok(Value::Null);
    }

    // SQLite uses dynamic typing, so we check the storage class of the value itself
    let type_name = value_ref.type_info().name().to_string();

    match type_name.as_str() {
        "INTEGER" => {
            let val: i64 = row.try_get(idx).map_err(|e| {
                DatabaseError::QueryFailed(format!("Failed to get INTEGER: {}", e))
            })?;
            Ok(Value::Int(val))
        }
        "REAL" => {
            let val: f64 = row
                .try_get(idx)
                .map_err(|e| DatabaseError::QueryFailed(format!("Failed to get REAL: {}", e)))?;
            Ok(Value::Float(val))
        }
        "TEXT" => {
            let val: String = row
                .try_get(idx)
                .map_err(|e| DatabaseError::QueryFailed(format!("Failed to get TEXT: {}", e)))?;
            Ok(Value::String(val))
        }
        "BLOB" => {
            let val: Vec<u8> = row
                .try_get(idx)
                .map_err(|e| DatabaseError::QueryFailed(format!("Failed to get BLOB: {}", e)))?;
            Ok(Value::Binary(val))
        }
        _ => {
            if let Ok(val) = row.try_get::<String, _>(idx) {
                Ok(Value::String(val))
            } else if let Ok(val) = row.try_get::<i64, _>(idx) {
                Ok(Value::Int(val))
            } else {
                Err(DatabaseError::ConversionError(format!(
                    "unsupported SQLite type {} at index {}",
                    type_name, idx
                )))
            }
        }
    }
}

#[async_trait]
impl Executor for SqliteConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError> {
        let rows = bind_params(sqlx::query(sql).persistent(false), params)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows_to_query_result(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        let result = bind_params(sqlx::query(sql).persistent(false), params)
            .execute(&*self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(to_execute_result(result))
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, DatabaseError> {
        // Validates the statement and warms the connection's statement cache
        self.pool
            .prepare(sql)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(Box::new(SqlitePreparedStatement::new(
            StatementTarget::Pool(self.pool.clone()),
            sql.to_string(),
        )))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

#[async_trait]
impl DatabaseConnection for SqliteConnection {
    async fn begin_transaction(&self) -> Result<Box<dyn DatabaseTransaction>, DatabaseError> {
        let transaction = SqliteTransaction::begin(self.pool.clone()).await?;
        Ok(Box::new(transaction))
    }

    async fn execute_script(&self, sql: &str) -> Result<(), DatabaseError> {
        sqlx::raw_sql(sql)
            .execute(&*self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.pool.close().await;
        Ok(())
    }

    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            connection_id: self.connection_id.clone(),
            backend: BackendKind::Sqlite,
            database_name: self.database_name.clone(),
            connected_at: self.connected_at,
        }
    }

    fn as_executor(&self) -> &dyn Executor {
        self
    }
}
