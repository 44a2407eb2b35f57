//! Query-builder adapter
//!
//! Every call assembles its statement with the query builder. Batches look
//! their statement up in a [`StatementCache`] that `prepare_batch` filled.

use super::{
    key_value, modified_stamp, Adapter, AdapterError, AdapterId, BatchKind, StatementCache,
};
use crate::database::query_builder::{InsertBuilder, SelectBuilder, UpdateBuilder};
use crate::database::{DatabaseConnection, Dialect, Executor, Value};
use crate::model::Record;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct BuilderAdapter<R> {
    conn: Arc<dyn DatabaseConnection>,
    table: String,
    dialect: Dialect,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> BuilderAdapter<R> {
    pub fn new(conn: Arc<dyn DatabaseConnection>, table: &str) -> Self {
        let dialect = conn.dialect();
        Self {
            conn,
            table: table.to_string(),
            dialect,
            _record: PhantomData,
        }
    }

    fn insert_query(&self, record: &R) -> Result<(String, Vec<Value>), AdapterError> {
        self.insert_statement(record.writable_values())
    }

    fn update_query(&self, record: &R) -> Result<(String, Vec<Value>), AdapterError> {
        self.update_statement(
            record.writable_values(),
            key_value(AdapterId::Builder, record)?,
        )
    }

    fn insert_statement(&self, values: Vec<Value>) -> Result<(String, Vec<Value>), AdapterError> {
        let bindings = R::bindings();
        let columns: Vec<&str> = bindings.writable().map(|f| f.column).collect();
        let returning: Vec<&str> = bindings.returned_on_insert().map(|f| f.column).collect();
        let query = InsertBuilder::new(&self.table)
            .columns(&columns)
            .values(values)
            .suffix(&format!("RETURNING {}", returning.join(", ")))
            .placeholder_format(self.dialect)
            .build()?;
        Ok(query)
    }

    /// `values` follow the writable columns in binding order
    fn update_statement(
        &self,
        values: Vec<Value>,
        key_arg: Value,
    ) -> Result<(String, Vec<Value>), AdapterError> {
        let bindings = R::bindings();
        let key = bindings.key().map(|f| f.column).unwrap_or("pk");
        let returning: Vec<&str> = bindings.returned_on_update().map(|f| f.column).collect();

        let mut builder = UpdateBuilder::new(&self.table);
        for (field, value) in bindings.writable().zip(values) {
            builder = builder.set(field.column, value);
        }
        if let Some((column, stamp)) = modified_stamp::<R>(self.dialect) {
            builder = builder.set_expr(column, &stamp);
        }
        let query = builder
            .where_eq(key, key_arg)
            .suffix(&format!("RETURNING {}", returning.join(", ")))
            .placeholder_format(self.dialect)
            .build()?;
        Ok(query)
    }
}

#[async_trait]
impl<R: Record> Adapter<R> for BuilderAdapter<R> {
    fn id(&self) -> AdapterId {
        AdapterId::Builder
    }

    fn connection(&self) -> &Arc<dyn DatabaseConnection> {
        &self.conn
    }

    async fn select(&self, exec: &dyn Executor, limit: usize) -> Result<Vec<R>, AdapterError> {
        let sql = SelectBuilder::new(&self.table)
            .columns(&R::bindings().columns())
            .limit(limit)
            .build();
        let result = exec.query(&sql, &[]).await?;
        let mut records = Vec::with_capacity(result.rows.len());
        for row in result.rows {
            records.push(R::from_values(row)?);
        }
        Ok(records)
    }

    /// The batch SQL does not depend on the record, so it is built from
    /// null arguments and prepared ahead of the first batch
    async fn prepare_batch(
        &self,
        exec: &dyn Executor,
        kind: BatchKind,
        cache: &mut StatementCache,
    ) -> Result<(), AdapterError> {
        let nulls = vec![Value::Null; R::bindings().writable().count()];
        let (sql, _) = match kind {
            BatchKind::Insert => self.insert_statement(nulls)?,
            BatchKind::Update => self.update_statement(nulls, Value::Null)?,
        };
        cache.get_or_prepare(exec, &sql).await?;
        Ok(())
    }

    async fn insert(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let (sql, args) = self.insert_query(record)?;
        let row = exec.query(&sql, &args).await?.into_single_row()?;
        record.apply_inserted(row)?;
        Ok(())
    }

    async fn insert_batch(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError> {
        for record in records.iter_mut() {
            let (sql, args) = self.insert_query(record)?;
            let statement = cache.get_or_prepare(exec, &sql).await?;
            let row = statement.query(&args).await?.into_single_row()?;
            record.apply_inserted(row)?;
        }
        Ok(())
    }

    async fn update(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let (sql, args) = self.update_query(record)?;
        let row = exec.query(&sql, &args).await?.into_single_row()?;
        record.apply_updated(row)?;
        Ok(())
    }

    async fn update_batch(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError> {
        for record in records.iter_mut() {
            let (sql, args) = self.update_query(record)?;
            let statement = cache.get_or_prepare(exec, &sql).await?;
            let row = statement.query(&args).await?.into_single_row()?;
            record.apply_updated(row)?;
        }
        Ok(())
    }
}
