//! SQLite Prepared Statement Implementation
//!
//! sqlx keeps prepared statements in a per-connection cache keyed by SQL text,
//! so a prepared statement here is the SQL plus the target it runs against.

use crate::database::{
    engine::PreparedStatement,
    types::{DatabaseError, ExecuteResult, QueryResult, Value},
};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

use super::connection::{bind_params, rows_to_query_result, to_execute_result};
use super::transaction::{finished, SharedTransaction};

pub(crate) enum StatementTarget {
    Pool(Arc<SqlitePool>),
    Transaction(SharedTransaction),
}

/// SQLite Prepared Statement
pub struct SqlitePreparedStatement {
    target: StatementTarget,
    sql: String,
}

impl SqlitePreparedStatement {
    pub(crate) fn new(target: StatementTarget, sql: String) -> Self {
        Self { target, sql }
    }
}

#[async_trait]
impl PreparedStatement for SqlitePreparedStatement {
    async fn query(&self, params: &[Value]) -> Result<QueryResult, DatabaseError> {
        let query = bind_params(sqlx::query(&self.sql), params);
        let rows = match &self.target {
            StatementTarget::Pool(pool) => query.fetch_all(&**pool).await,
            StatementTarget::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let tx = guard.as_mut().ok_or_else(finished)?;
                let rows = query.fetch_all(&mut **tx).await;
                drop(guard);
                rows
            }
        }
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows_to_query_result(rows)
    }

    async fn execute(&self, params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        let query = bind_params(sqlx::query(&self.sql), params);
        let result = match &self.target {
            StatementTarget::Pool(pool) => query.execute(&**pool).await,
            StatementTarget::Transaction(tx) => {
                let mut guard = tx.lock().await;
                let tx = guard.as_mut().ok_or_else(finished)?;
                let result = query.execute(&mut **tx).await;
                drop(guard);
                result
            }
        }
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(to_execute_result(result))
    }

    fn sql(&self) -> &str {
        &self.sql
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        // The cached statement is released with its connection
        Ok(())
    }
}
