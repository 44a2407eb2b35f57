//! Raw driver adapter
//!
//! SQL formatted by hand once per dialect; values bound and rows scanned by
//! position. Single operations run as one-shot statements, batches reuse one
//! prepared statement.

use super::{
    column_list, insert_each, key_value, modified_stamp, update_each, Adapter, AdapterError,
    AdapterId, BatchKind, StatementCache,
};
use crate::database::{DatabaseConnection, Executor};
use crate::model::Record;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct RawAdapter<R> {
    conn: Arc<dyn DatabaseConnection>,
    /// `select <columns> from <table> limit `
    select_prefix: String,
    insert_sql: String,
    update_sql: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RawAdapter<R> {
    pub fn new(conn: Arc<dyn DatabaseConnection>, table: &str) -> Self {
        let dialect = conn.dialect();
        let bindings = R::bindings();
        let writable: Vec<&str> = bindings.writable().map(|f| f.column).collect();
        let key = bindings.key().map(|f| f.column).unwrap_or("pk");

        let select_prefix = format!(
            "select {} from {} limit ",
            column_list(bindings.fields().iter().map(|f| f.column)),
            table
        );

        let insert_sql = format!(
            "insert into {} ( {} ) values ( {} ) returning {}",
            table,
            writable.join(", "),
            dialect.placeholders(1, writable.len()),
            column_list(bindings.returned_on_insert().map(|f| f.column))
        );

        let mut assignments: Vec<String> = writable
            .iter()
            .enumerate()
            .map(|(idx, column)| format!("{} = {}", column, dialect.placeholder(idx + 1)))
            .collect();
        if let Some((column, stamp)) = modified_stamp::<R>(dialect) {
            assignments.push(format!("{} = {}", column, stamp));
        }
        let update_sql = format!(
            "update {} set {} where {} = {} returning {}",
            table,
            assignments.join(", "),
            key,
            dialect.placeholder(writable.len() + 1),
            column_list(bindings.returned_on_update().map(|f| f.column))
        );

        Self {
            conn,
            select_prefix,
            insert_sql,
            update_sql,
            _record: PhantomData,
        }
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }
}

#[async_trait]
impl<R: Record> Adapter<R> for RawAdapter<R> {
    fn id(&self) -> AdapterId {
        AdapterId::Raw
    }

    fn connection(&self) -> &Arc<dyn DatabaseConnection> {
        &self.conn
    }

    async fn select(&self, exec: &dyn Executor, limit: usize) -> Result<Vec<R>, AdapterError> {
        let sql = format!("{}{}", self.select_prefix, limit);
        let result = exec.query(&sql, &[]).await?;
        let mut records = Vec::with_capacity(result.rows.len());
        for row in result.rows {
            records.push(R::from_values(row)?);
        }
        Ok(records)
    }

    async fn insert(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let row = exec
            .query(&self.insert_sql, &record.writable_values())
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
            BatchKind::Insert => &self.insert_sql,
            BatchKind::Update => &self.update_sql,
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
        let statement = cache.get_or_prepare(exec, &self.insert_sql).await?;
        insert_each(statement, records).await
    }

    async fn update(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let mut params = record.writable_values();
        params.push(key_value(AdapterId::Raw, record)?);
        let row = exec
            .query(&self.update_sql, &params)
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
        let statement = cache.get_or_prepare(exec, &self.update_sql).await?;
        update_each(AdapterId::Raw, statement, records).await
    }
}
