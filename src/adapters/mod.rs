//! Adapter Layer
//!
//! One implementation of the select/insert/update operation set per access
//! strategy. Adapters never retry; a failure ends the enclosing unit.

use crate::database::{
    Backend, DatabaseConnection, DatabaseError, Dialect, Executor, PreparedStatement, Value,
};
use crate::model::{FieldRole, MappingError, Record};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod builder;
pub mod mapper;
pub mod model;
pub mod orm;
pub mod raw;

pub use builder::BuilderAdapter;
pub use mapper::{MapperAdapter, NamedStatement};
pub use model::ModelAdapter;
pub use orm::OrmAdapter;
pub use raw::RawAdapter;

/// Access strategy identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterId {
    /// Hand-written SQL, positional binding and scanning
    Raw,
    /// Named parameters, rows mapped by column name
    Mapper,
    /// Statements assembled with the query builder
    Builder,
    /// Statement set derived from the binding table
    Model,
    /// Own pooled handle, `select *` and multi-row inserts
    Orm,
}

impl AdapterId {
    pub const ALL: [AdapterId; 5] = [
        AdapterId::Raw,
        AdapterId::Mapper,
        AdapterId::Builder,
        AdapterId::Model,
        AdapterId::Orm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterId::Raw => "raw",
            AdapterId::Mapper => "mapper",
            AdapterId::Builder => "builder",
            AdapterId::Model => "model",
            AdapterId::Orm => "orm",
        }
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch flavour, used to choose what [`Adapter::prepare_batch`] prepares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Insert,
    Update,
}

/// Adapter failure
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("row mapping failed: {0}")]
    Mapping(#[from] MappingError),

    #[error("{adapter}: {operation} is not supported ({reason})")]
    Unsupported {
        adapter: AdapterId,
        operation: &'static str,
        reason: String,
    },

    #[error("named parameter :{0} has no bound field")]
    UnboundParameter(String),

    #[error("{returned} row(s) returned for a batch of {batch}")]
    BatchMismatch { returned: usize, batch: usize },

    #[error("returned rows lack column {0}")]
    MissingColumn(&'static str),

    #[error("returned row {index} matches no record of the batch")]
    UnmatchedRow { index: usize },
}

/// Uniform operation set
///
/// `exec` is the adapter's own connection or a transaction opened on it; see
/// [`Adapter::connection`]. Operations on `&mut R` assign the identity and
/// markers returned by the store.
#[async_trait]
pub trait Adapter<R: Record>: Send + Sync {
    fn id(&self) -> AdapterId;

    /// Handle statements must run on; transactions are opened here
    fn connection(&self) -> &Arc<dyn DatabaseConnection>;

    async fn select(&self, exec: &dyn Executor, limit: usize) -> Result<Vec<R>, AdapterError>;

    async fn insert(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError>;

    /// Prepares what a later batch call reuses
    async fn prepare_batch(
        &self,
        _exec: &dyn Executor,
        _kind: BatchKind,
        _cache: &mut StatementCache,
    ) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn insert_batch(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError>;

    async fn update(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError>;

    async fn update_batch(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError>;
}

/// Prepared statements keyed by SQL text
#[derive(Default)]
pub struct StatementCache {
    statements: HashMap<String, Box<dyn PreparedStatement>>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares `sql` on first use, then returns the cached statement
    pub async fn get_or_prepare(
        &mut self,
        exec: &dyn Executor,
        sql: &str,
    ) -> Result<&dyn PreparedStatement, DatabaseError> {
        if !self.statements.contains_key(sql) {
            let statement = exec.prepare(sql).await?;
            tracing::trace!(sql, "statement cached");
            self.statements.insert(sql.to_string(), statement);
        }
        self.statements
            .get(sql)
            .map(|statement| statement.as_ref())
            .ok_or_else(|| DatabaseError::QueryFailed(format!("statement not cached: {}", sql)))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Closes and forgets every statement; the first close error is returned
    pub async fn clear(&mut self) -> Result<(), DatabaseError> {
        let mut first_error = None;
        for (_, statement) in self.statements.drain() {
            if let Err(e) = statement.close().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Every adapter usable on `backend`; the ORM needs the auxiliary handle
pub fn adapters_for<R: Record>(
    backend: &Backend,
    table: &str,
    orm_batch_size: usize,
) -> Vec<Box<dyn Adapter<R>>> {
    let primary = &backend.primary;
    let mut adapters: Vec<Box<dyn Adapter<R>>> = vec![
        Box::new(RawAdapter::new(primary.clone(), table)),
        Box::new(MapperAdapter::new(primary.clone(), table)),
        Box::new(BuilderAdapter::new(primary.clone(), table)),
        Box::new(ModelAdapter::new(primary.clone(), table)),
    ];
    if let Some(aux) = &backend.aux {
        adapters.push(Box::new(OrmAdapter::new(aux.clone(), table, orm_batch_size)));
    }
    adapters
}

/// Key value of `record` for WHERE clauses
pub(crate) fn key_value<R: Record>(adapter: AdapterId, record: &R) -> Result<Value, AdapterError> {
    let key = R::bindings().key().ok_or_else(|| AdapterError::Unsupported {
        adapter,
        operation: "update",
        reason: "record type has no key column".to_string(),
    })?;
    Ok((key.get)(record))
}

/// Runs `statement` once per record with its writable values, applying the inserted row
pub(crate) async fn insert_each<R: Record>(
    statement: &dyn PreparedStatement,
    records: &mut [R],
) -> Result<(), AdapterError> {
    for record in records.iter_mut() {
        let row = statement
            .query(&record.writable_values())
            .await?
            .into_single_row()?;
        record.apply_inserted(row)?;
    }
    Ok(())
}

/// Runs `statement` once per record with its writable values then its key
pub(crate) async fn update_each<R: Record>(
    adapter: AdapterId,
    statement: &dyn PreparedStatement,
    records: &mut [R],
) -> Result<(), AdapterError> {
    for record in records.iter_mut() {
        let mut params = record.writable_values();
        params.push(key_value(adapter, record)?);
        let row = statement.query(&params).await?.into_single_row()?;
        record.apply_updated(row)?;
    }
    Ok(())
}

/// `(column, expression)` stamping the modified marker, for stores without an update trigger
pub(crate) fn modified_stamp<R: Record>(dialect: Dialect) -> Option<(&'static str, String)> {
    let column = R::bindings()
        .fields()
        .iter()
        .find(|f| f.role == FieldRole::ModifiedMarker)?
        .column;
    Some((column, dialect.modified_stamp(column)?))
}

/// Comma separated column list
pub(crate) fn column_list<'a>(columns: impl Iterator<Item = &'a str>) -> String {
    columns.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ColumnInfo, MockConnection, QueryResult};

    #[tokio::test]
    async fn test_statement_cache_prepares_once_per_sql() {
        let conn = MockConnection::new();
        let mut cache = StatementCache::new();

        for _ in 0..3 {
            cache.get_or_prepare(&conn, "select 1").await.unwrap();
        }
        cache.get_or_prepare(&conn, "select 2").await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(conn.prepared_count().await, 2);

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cached_statement_runs_against_executor() {
        let conn = MockConnection::new();
        let mut rows = QueryResult::new(vec![ColumnInfo::new("n", "INT8")]);
        rows.push_row(vec![Value::Int(1)]).unwrap();
        conn.expect_query("^select n", rows).await.unwrap();

        let mut cache = StatementCache::new();
        let statement = cache.get_or_prepare(&conn, "select n from t").await.unwrap();
        assert_eq!(statement.query(&[]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_adapters_for_mock_has_no_orm() {
        let mock = Arc::new(MockConnection::new());
        let backend = Backend {
            kind: crate::database::BackendKind::Sqlmock,
            primary: mock.clone(),
            aux: None,
            mock: Some(mock),
        };
        let ids: Vec<AdapterId> = adapters_for::<crate::model::SaleReport>(&backend, "t", 10)
            .iter()
            .map(|a| a.id())
            .collect();
        assert_eq!(
            ids,
            vec![AdapterId::Raw, AdapterId::Mapper, AdapterId::Builder, AdapterId::Model]
        );
    }
}
