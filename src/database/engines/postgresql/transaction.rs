//! PostgreSQL Transaction Implementation

use crate::database::{
    engine::{DatabaseTransaction, Executor, PreparedStatement},
    types::{DatabaseError, Dialect, ExecuteResult, QueryResult, Value},
};
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{Executor as _, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::connection::{bind_params, rows_to_query_result, to_execute_result};
use super::prepared::StatementTarget;
use super::PostgreSqlPreparedStatement;

/// Transaction handle shared with the statements prepared on it
pub(crate) type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

pub(crate) fn finished() -> DatabaseError {
    DatabaseError::TransactionFailed("transaction already finished".to_string())
}

/// PostgreSQL Transaction
pub struct PostgreSqlTransaction {
    tx: SharedTransaction,
}

impl PostgreSqlTransaction {
    /// BEGIN on a pooled connection
    pub async fn begin(pool: Arc<PgPool>) -> Result<Self, DatabaseError> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        Ok(Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        })
    }
}

#[async_trait]
impl Executor for PostgreSqlTransaction {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DatabaseError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;

        let rows = bind_params(sqlx::query(sql).persistent(false), params)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows_to_query_result(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;

        let result = bind_params(sqlx::query(sql).persistent(false), params)
            .execute(&mut **tx)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(to_execute_result(result))
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, DatabaseError> {
        {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or_else(finished)?;
            (&mut **tx)
                .prepare(sql)
                .await
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        }

        Ok(Box::new(PostgreSqlPreparedStatement::new(
            StatementTarget::Transaction(self.tx.clone()),
            sql.to_string(),
        )))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}

#[async_trait]
impl DatabaseTransaction for PostgreSqlTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.rollback()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    fn as_executor(&self) -> &dyn Executor {
        self
    }
}
