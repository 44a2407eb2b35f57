//! Binding-table model adapter
//!
//! The statement set of a record type is derived once from its field roles:
//! data fields are written, the key selects the row and the store-assigned
//! fields come back through `RETURNING`.

use super::{
    insert_each, key_value, modified_stamp, update_each, Adapter, AdapterError, AdapterId,
    BatchKind, StatementCache,
};
use crate::database::{DatabaseConnection, Dialect, Executor};
use crate::model::Record;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

/// Statements of one record type on one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSet {
    pub select: String,
    pub insert: String,
    pub update: String,
}

impl StatementSet {
    pub fn derive<R: Record>(table: &str, dialect: Dialect) -> Self {
        let bindings = R::bindings();
        let columns = bindings.columns();
        let writable: Vec<&str> = bindings.writable().map(|f| f.column).collect();
        let inserted: Vec<&str> = bindings.returned_on_insert().map(|f| f.column).collect();
        let updated: Vec<&str> = bindings.returned_on_update().map(|f| f.column).collect();
        let key = bindings.key().map(|f| f.column).unwrap_or("pk");

        let mut assignments = Vec::with_capacity(writable.len() + 1);
        for (idx, column) in writable.iter().enumerate() {
            assignments.push(format!("{} = {}", column, dialect.placeholder(idx + 1)));
        }
        if let Some((column, stamp)) = modified_stamp::<R>(dialect) {
            assignments.push(format!("{} = {}", column, stamp));
        }

        Self {
            select: format!("SELECT {} FROM {}", columns.join(", "), table),
            insert: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                table,
                writable.join(", "),
                dialect.placeholders(1, writable.len()),
                inserted.join(", ")
            ),
            update: format!(
                "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
                table,
                assignments.join(", "),
                key,
                dialect.placeholder(writable.len() + 1),
                updated.join(", ")
            ),
        }
    }
}

pub struct ModelAdapter<R> {
    conn: Arc<dyn DatabaseConnection>,
    statements: StatementSet,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> ModelAdapter<R> {
    pub fn new(conn: Arc<dyn DatabaseConnection>, table: &str) -> Self {
        let statements = StatementSet::derive::<R>(table, conn.dialect());
        Self {
            conn,
            statements,
            _record: PhantomData,
        }
    }

    pub fn statements(&self) -> &StatementSet {
        &self.statements
    }
}

#[async_trait]
impl<R: Record> Adapter<R> for ModelAdapter<R> {
    fn id(&self) -> AdapterId {
        AdapterId::Model
    }

    fn connection(&self) -> &Arc<dyn DatabaseConnection> {
        &self.conn
    }

    async fn select(&self, exec: &dyn Executor, limit: usize) -> Result<Vec<R>, AdapterError> {
        let sql = format!("{} LIMIT {}", self.statements.select, limit);
        let result = exec.query(&sql, &[]).await?;
        result
            .rows
            .into_iter()
            .map(|row| R::from_values(row).map_err(AdapterError::from))
            .collect()
    }

    async fn insert(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let row = exec
            .query(&self.statements.insert, &record.writable_values())
            .await?
            .into_single_row()?;
        record.apply_inserted(row)?;
        Ok(())
    }

    async fn prepare_batch(
        &self,
        exec: &dyn Executor,
        kind: BatchKind,
        cache: &mut StatementCache,
    ) -> Result<(), AdapterError> {
        let sql = match kind {
            BatchKind::Insert => &self.statements.insert,
            BatchKind::Update => &self.statements.update,
        };
        cache.get_or_prepare(exec, sql).await?;
        Ok(())
    }

    async fn insert_batch(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError> {
        let statement = cache.get_or_prepare(exec, &self.statements.insert).await?;
        insert_each(statement, records).await
    }

    async fn update(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let mut params = record.writable_values();
        params.push(key_value(AdapterId::Model, record)?);
        let row = exec
            .query(&self.statements.update, &params)
            .await?
            .into_single_row()?;
        record.apply_updated(row)?;
        Ok(())
    }

    async fn update_batch(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError> {
        let statement = cache.get_or_prepare(exec, &self.statements.update).await?;
        update_each(AdapterId::Model, statement, records).await
    }
}
