//! Mock Connection Implementation
//!
//! In-process driver that answers statements from an ordered queue of
//! expectations. A statement that does not match the head of the queue fails.

use crate::database::{
    engine::{ConnectionInfo, DatabaseConnection, DatabaseTransaction, Executor, PreparedStatement},
    types::{BackendKind, DatabaseError, Dialect, ExecuteResult, QueryResult, Value},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::expectation::{MockExpectation, MockResponse};

#[derive(Debug, Default)]
struct MockState {
    expectations: VecDeque<MockExpectation>,
    executed: Vec<String>,
    prepared: usize,
    commits: usize,
    rollbacks: usize,
    closed: bool,
}

type SharedState = Arc<Mutex<MockState>>;

async fn respond(state: &SharedState, sql: &str) -> Result<MockResponse, DatabaseError> {
    let mut state = state.lock().await;
    if state.closed {
        return Err(DatabaseError::ConnectionFailed(
            "mock connection is closed".to_string(),
        ));
    }

    let head = match state.expectations.front() {
        None => Err(format!("no expectation left for: {}", sql)),
        Some(head) if head.matches(sql) => Ok(()),
        Some(head) => Err(format!(
            "{} does not match expected pattern {}",
            sql,
            head.pattern()
        )),
    };
    head.map_err(DatabaseError::UnexpectedStatement)?;

    let expectation = state
        .expectations
        .pop_front()
        .ok_or_else(|| DatabaseError::UnexpectedStatement(sql.to_string()))?;
    state.executed.push(sql.to_string());
    Ok(expectation.into_response())
}

async fn respond_query(state: &SharedState, sql: &str) -> Result<QueryResult, DatabaseError> {
    match respond(state, sql).await? {
        MockResponse::Rows(rows) => Ok(rows),
        MockResponse::Exec(_) => Err(DatabaseError::UnexpectedStatement(format!(
            "query issued for a command expectation: {}",
            sql
        ))),
        MockResponse::Error(e) => Err(e),
    }
}

async fn respond_execute(state: &SharedState, sql: &str) -> Result<ExecuteResult, DatabaseError> {
    match respond(state, sql).await? {
        MockResponse::Exec(result) => Ok(result),
        MockResponse::Rows(rows) => Ok(ExecuteResult {
            rows_affected: rows.len() as u64,
            last_insert_id: None,
        }),
        MockResponse::Error(e) => Err(e),
    }
}

async fn prepare_on(
    state: &SharedState,
    sql: &str,
) -> Result<Box<dyn PreparedStatement>, DatabaseError> {
    state.lock().await.prepared += 1;
    Ok(Box::new(MockPreparedStatement {
        state: state.clone(),
        sql: sql.to_string(),
    }))
}

/// Mock Connection
pub struct MockConnection {
    state: SharedState,
    info: ConnectionInfo,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            info: ConnectionInfo {
                connection_id: uuid::Uuid::new_v4().to_string(),
                backend: BackendKind::Sqlmock,
                database_name: "sqlmock".to_string(),
                connected_at: Utc::now(),
            },
        }
    }

    /// Queue an expectation behind the ones already registered
    pub async fn expect(&self, expectation: MockExpectation) {
        self.state.lock().await.expectations.push_back(expectation);
    }

    /// Queue a row-returning expectation
    pub async fn expect_query(&self, pattern: &str, rows: QueryResult) -> Result<(), DatabaseError> {
        self.expect(MockExpectation::query(pattern, rows)?).await;
        Ok(())
    }

    /// Queue a command expectation
    pub async fn expect_exec(
        &self,
        pattern: &str,
        result: ExecuteResult,
    ) -> Result<(), DatabaseError> {
        self.expect(MockExpectation::exec(pattern, result)?).await;
        Ok(())
    }

    /// Fails when registered expectations were never consumed
    pub async fn expectations_met(&self) -> Result<(), DatabaseError> {
        let state = self.state.lock().await;
        if state.expectations.is_empty() {
            return Ok(());
        }
        let pending: Vec<&str> = state.expectations.iter().map(|e| e.pattern()).collect();
        Err(DatabaseError::ValidationError(format!(
            "{} expectation(s) not met: {}",
            pending.len(),
            pending.join(", ")
        )))
    }

    /// Statements answered so far, in order
    pub async fn executed(&self) -> Vec<String> {
        self.state.lock().await.executed.clone()
    }

    pub async fn prepared_count(&self) -> usize {
        self.state.lock().await.prepared
    }

    /// (commits, rollbacks)
    pub async fn transaction_counts(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.commits, state.rollbacks)
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for MockConnection {
    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult, DatabaseError> {
        respond_query(&self.state, sql).await
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        respond_execute(&self.state, sql).await
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, DatabaseError> {
        prepare_on(&self.state, sql).await
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}

#[async_trait]
impl DatabaseConnection for MockConnection {
    async fn begin_transaction(&self) -> Result<Box<dyn DatabaseTransaction>, DatabaseError> {
        Ok(Box::new(MockTransaction {
            state: self.state.clone(),
        }))
    }

    async fn execute_script(&self, sql: &str) -> Result<(), DatabaseError> {
        respond_execute(&self.state, sql).await.map(|_| ())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        if self.state.lock().await.closed {
            return Err(DatabaseError::ConnectionFailed(
                "mock connection is closed".to_string(),
            ));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.state.lock().await.closed = true;
        Ok(())
    }

    fn connection_info(&self) -> ConnectionInfo {
        self.info.clone()
    }

    fn as_executor(&self) -> &dyn Executor {
        self
    }
}

/// Mock Transaction; shares the expectation queue of its connection
pub struct MockTransaction {
    state: SharedState,
}

#[async_trait]
impl Executor for MockTransaction {
    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult, DatabaseError> {
        respond_query(&self.state, sql).await
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        respond_execute(&self.state, sql).await
    }

    async fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, DatabaseError> {
        prepare_on(&self.state, sql).await
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}

#[async_trait]
impl DatabaseTransaction for MockTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.state.lock().await.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.state.lock().await.rollbacks += 1;
        Ok(())
    }

    fn as_executor(&self) -> &dyn Executor {
        self
    }
}

/// Mock Prepared Statement
pub struct MockPreparedStatement {
    state: SharedState,
    sql: String,
}

#[async_trait]
impl PreparedStatement for MockPreparedStatement {
    async fn query(&self, _params: &[Value]) -> Result<QueryResult, DatabaseError> {
        respond_query(&self.state, &self.sql).await
    }

    async fn execute(&self, _params: &[Value]) -> Result<ExecuteResult, DatabaseError> {
        respond_execute(&self.state, &self.sql).await
    }

    fn sql(&self) -> &str {
        &self.sql
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::types::ColumnInfo;

    fn one_row() -> QueryResult {
        let mut rows = QueryResult::new(vec![ColumnInfo::new("pk", "INT8")]);
        rows.push_row(vec![Value::Int(1)]).unwrap();
        rows
    }

    #[test]
    fn test_matching_query_returns_rows() {
        tokio_test::block_on(async {
            let conn = MockConnection::new();
            conn.expect_query("select +", one_row()).await.unwrap();

            let result = conn.query("select * from table", &[]).await.unwrap();
            assert_eq!(result.len(), 1);
            assert!(conn.expectations_met().await.is_ok());
            assert_eq!(conn.executed().await, vec!["select * from table".to_string()]);
        });
    }

    #[test]
    fn test_query_hands_out_queued_rows_without_copying() {
        tokio_test::block_on(async {
            let conn = MockConnection::new();
            let rows = one_row();
            let queued = rows.rows.as_ptr();
            conn.expect_query("^select", rows).await.unwrap();

            let result = conn.query("select pk from t", &[]).await.unwrap();
            assert_eq!(result.rows.as_ptr(), queued);
        });
    }

    #[test]
    fn test_unexpected_statement_fails() {
        tokio_test::block_on(async {
            let conn = MockConnection::new();
            let result = conn.query("select 1", &[]).await;
            assert!(matches!(result, Err(DatabaseError::UnexpectedStatement(_))));
        });
    }

    #[test]
    fn test_mismatch_keeps_expectation_queued() {
        tokio_test::block_on(async {
            let conn = MockConnection::new();
            conn.expect_query("^select", one_row()).await.unwrap();

            assert!(conn.execute("delete from t", &[]).await.is_err());
            assert!(conn.expectations_met().await.is_err());
            assert!(conn.query("select pk from t", &[]).await.is_ok());
            assert!(conn.expectations_met().await.is_ok());
        });
    }

    #[test]
    fn test_expectations_consumed_in_order() {
        tokio_test::block_on(async {
            let conn = MockConnection::new();
            conn.expect_exec("^insert", ExecuteResult::default()).await.unwrap();
            conn.expect_query("^select", one_row()).await.unwrap();

            assert!(conn.query("select 1", &[]).await.is_err());
            assert!(conn.execute("insert into t values (1)", &[]).await.is_ok());
            assert!(conn.query("select 1", &[]).await.is_ok());
        });
    }

    #[test]
    fn test_prepared_statement_and_transaction_share_queue() {
        tokio_test::block_on(async {
            let conn = MockConnection::new();
            conn.expect_query("^select", one_row()).await.unwrap();

            let tx = conn.begin_transaction().await.unwrap();
            let stmt = tx.prepare("select pk from t").await.unwrap();
            assert_eq!(stmt.query(&[]).await.unwrap().len(), 1);
            tx.rollback().await.unwrap();

            assert_eq!(conn.prepared_count().await, 1);
            assert_eq!(conn.transaction_counts().await, (0, 1));
        });
    }

    #[test]
    fn test_closed_connection_rejects_statements() {
        tokio_test::block_on(async {
            let conn = MockConnection::new();
            conn.expect_query("^select", one_row()).await.unwrap();
            conn.close().await.unwrap();
            assert!(conn.ping().await.is_err());
            assert!(conn.query("select 1", &[]).await.is_err());
        });
    }
}
