//! Named-parameter mapper adapter
//!
//! Statements are written with `:name` parameters and compiled once to the
//! dialect's placeholders. Arguments are looked up by name in the binding
//! table and result rows are mapped to fields by column name.

use super::{
    column_list, modified_stamp, Adapter, AdapterError, AdapterId, BatchKind, StatementCache,
};
use crate::database::{DatabaseConnection, Dialect, Executor, QueryResult, Value};
use crate::model::Record;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

/// SQL compiled from a `:name` template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStatement {
    sql: String,
    names: Vec<String>,
}

impl NamedStatement {
    /// Replaces every `:name` outside quotes with a positional placeholder.
    /// `::` casts are left alone.
    pub fn compile(template: &str, dialect: Dialect) -> Self {
        let mut sql = String::with_capacity(template.len());
        let mut names = Vec::new();
        let mut chars = template.chars().peekable();
        let mut quoted = false;

        while let Some(c) = chars.next() {
            match c {
                '\'' => {
                    quoted = !quoted;
                    sql.push(c);
                }
                ':' if !quoted && chars.peek() == Some(&':') => {
                    sql.push_str("::");
                    chars.next();
                }
                ':' if !quoted
                    && chars
                        .peek()
                        .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
                {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if !(n.is_ascii_alphanumeric() || n == '_') {
                            break;
                        }
                        name.push(n);
                        chars.next();
                    }
                    names.push(name);
                    sql.push_str(&dialect.placeholder(names.len()));
                }
                _ => sql.push(c),
            }
        }

        Self { sql, names }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Arguments for `record` in placeholder order
    pub fn bind<R: Record>(&self, record: &R) -> Result<Vec<Value>, AdapterError> {
        let bindings = R::bindings();
        self.names
            .iter()
            .map(|name| {
                bindings
                    .lookup(name)
                    .map(|field| (field.get)(record))
                    .ok_or_else(|| AdapterError::UnboundParameter(name.clone()))
            })
            .collect()
    }
}

pub struct MapperAdapter<R> {
    conn: Arc<dyn DatabaseConnection>,
    select_prefix: String,
    insert: NamedStatement,
    update: NamedStatement,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> MapperAdapter<R> {
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

        let parameters: Vec<String> = writable.iter().map(|c| format!(":{}", c)).collect();
        let insert = format!(
            "insert into {} ( {} ) values ( {} ) returning {}",
            table,
            writable.join(", "),
            parameters.join(", "),
            column_list(bindings.returned_on_insert().map(|f| f.column))
        );

        let mut assignments: Vec<String> =
            writable.iter().map(|c| format!("{} = :{}", c, c)).collect();
        if let Some((column, stamp)) = modified_stamp::<R>(dialect) {
            assignments.push(format!("{} = {}", column, stamp));
        }
        let update = format!(
            "update {} set {} where {} = :{} returning {}",
            table,
            assignments.join(", "),
            key,
            key,
            column_list(bindings.returned_on_update().map(|f| f.column))
        );

        Self {
            conn,
            select_prefix,
            insert: NamedStatement::compile(&insert, dialect),
            update: NamedStatement::compile(&update, dialect),
            _record: PhantomData,
        }
    }

    fn apply_row(record: &mut R, result: QueryResult) -> Result<(), AdapterError> {
        let columns = result.columns.clone();
        let row = result.into_single_row()?;
        R::bindings().apply_named(record, &columns, row)?;
        Ok(())
    }
}

#[async_trait]
impl<R: Record> Adapter<R> for MapperAdapter<R> {
    fn id(&self) -> AdapterId {
        AdapterId::Mapper
    }

    fn connection(&self) -> &Arc<dyn DatabaseConnection> {
        &self.conn
    }

    async fn select(&self, exec: &dyn Executor, limit: usize) -> Result<Vec<R>, AdapterError> {
        let sql = format!("{}{}", self.select_prefix, limit);
        let result = exec.query(&sql, &[]).await?;
        let bindings = R::bindings();
        let mut records = Vec::with_capacity(result.rows.len());
        for row in result.rows {
            records.push(bindings.decode_named(&result.columns, row)?);
        }
        Ok(records)
    }

    async fn insert(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let params = self.insert.bind(record)?;
        let result = exec.query(self.insert.sql(), &params).await?;
        Self::apply_row(record, result)
    }

    async fn prepare_batch(
        &self,
        exec: &dyn Executor,
        kind: BatchKind,
        cache: &mut StatementCache,
    ) -> Result<(), AdapterError> {
        let statement = match kind {
            BatchKind::Insert => &self.insert,
            BatchKind::Update => &self.update,
        };
        cache.get_or_prepare(exec, statement.sql()).await?;
        Ok(())
    }

    async fn insert_batch(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError> {
        let statement = cache.get_or_prepare(exec, self.insert.sql()).await?;
        for record in records.iter_mut() {
            let params = self.insert.bind(record)?;
            let result = statement.query(&params).await?;
            Self::apply_row(record, result)?;
        }
        Ok(())
    }

    async fn update(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let params = self.update.bind(record)?;
        let result = exec.query(self.update.sql(), &params).await?;
        Self::apply_row(record, result)
    }

    async fn update_batch(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError> {
        let statement = cache.get_or_prepare(exec, self.update.sql()).await?;
        for record in records.iter_mut() {
            let params = self.update.bind(record)?;
            let result = statement.query(&params).await?;
            Self::apply_row(record, result)?;
        }
        Ok(())
    }
}
