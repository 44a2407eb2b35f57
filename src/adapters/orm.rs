//! ORM-style adapter
//!
//! Runs on its own pooled handle. Reads are `select *` mapped by column name,
//! writes return the whole row. Batch inserts go out as multi-row INSERTs of
//! at most `batch_size` records; batch updates save row by row.
//!
//! `RETURNING` order of a multi-row INSERT is unspecified on SQLite, so
//! inserted rows are paired with records by their written columns.

use super::{key_value, modified_stamp, Adapter, AdapterError, AdapterId, StatementCache};
use crate::database::query_builder::{InsertBuilder, UpdateBuilder};
use crate::database::{DatabaseConnection, Dialect, Executor, QueryResult, Value};
use crate::model::Record;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

const RETURNING_ALL: &str = "RETURNING *";

pub struct OrmAdapter<R> {
    conn: Arc<dyn DatabaseConnection>,
    table: String,
    dialect: Dialect,
    batch_size: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> OrmAdapter<R> {
    pub fn new(conn: Arc<dyn DatabaseConnection>, table: &str, batch_size: usize) -> Self {
        let dialect = conn.dialect();
        Self {
            conn,
            table: table.to_string(),
            dialect,
            batch_size: batch_size.max(1),
            _record: PhantomData,
        }
    }

    fn check_batch(records: &[R], result: &QueryResult) -> Result<(), AdapterError> {
        if result.rows.len() != records.len() {
            return Err(AdapterError::BatchMismatch {
                returned: result.rows.len(),
                batch: records.len(),
            });
        }
        Ok(())
    }

    /// Assigns the single row an UPDATE returned
    fn assign(record: &mut R, result: QueryResult) -> Result<(), AdapterError> {
        Self::check_batch(std::slice::from_ref(record), &result)?;
        let bindings = R::bindings();
        for row in result.rows {
            bindings.apply_named(record, &result.columns, row)?;
        }
        Ok(())
    }

    /// Assigns each inserted row to the record whose writable values it
    /// carries. Records with equal values are interchangeable; the row at
    /// the record's own position is tried first.
    fn assign_inserted(records: &mut [R], result: QueryResult) -> Result<(), AdapterError> {
        Self::check_batch(records, &result)?;
        let bindings = R::bindings();
        let positions = bindings
            .writable()
            .map(|field| {
                result
                    .columns
                    .iter()
                    .position(|c| c.name == field.column)
                    .ok_or(AdapterError::MissingColumn(field.column))
            })
            .collect::<Result<Vec<usize>, AdapterError>>()?;
        let written: Vec<Vec<Value>> = records.iter().map(|r| r.writable_values()).collect();
        let carries = |row: &[Value], slot: usize| {
            positions
                .iter()
                .zip(&written[slot])
                .all(|(&position, value)| row.get(position) == Some(value))
        };

        let mut taken = vec![false; records.len()];
        for (index, row) in result.rows.into_iter().enumerate() {
            let slot = if !taken[index] && carries(&row, index) {
                index
            } else {
                (0..records.len())
                    .find(|&slot| !taken[slot] && carries(&row, slot))
                    .ok_or(AdapterError::UnmatchedRow { index })?
            };
            taken[slot] = true;
            bindings.apply_named(&mut records[slot], &result.columns, row)?;
        }
        Ok(())
    }

    async fn create(&self, exec: &dyn Executor, records: &mut [R]) -> Result<(), AdapterError> {
        let columns: Vec<&str> = R::bindings().writable().map(|f| f.column).collect();
        let mut builder = InsertBuilder::new(&self.table).columns(&columns);
        for record in records.iter() {
            builder = builder.values(record.writable_values());
        }
        let (sql, args) = builder
            .suffix(RETURNING_ALL)
            .placeholder_format(self.dialect)
            .build()?;
        let result = exec.query(&sql, &args).await?;
        Self::assign_inserted(records, result)
    }

    async fn save(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        let bindings = R::bindings();
        let key = bindings.key().map(|f| f.column).unwrap_or("pk");

        let mut builder = UpdateBuilder::new(&self.table);
        for field in bindings.writable() {
            builder = builder.set(field.column, (field.get)(record));
        }
        if let Some((column, stamp)) = modified_stamp::<R>(self.dialect) {
            builder = builder.set_expr(column, &stamp);
        }
        let (sql, args) = builder
            .where_eq(key, key_value(AdapterId::Orm, record)?)
            .suffix(RETURNING_ALL)
            .placeholder_format(self.dialect)
            .build()?;
        let result = exec.query(&sql, &args).await?;
        Self::assign(record, result)
    }
}

#[async_trait]
impl<R: Record> Adapter<R> for OrmAdapter<R> {
    fn id(&self) -> AdapterId {
        AdapterId::Orm
    }

    fn connection(&self) -> &Arc<dyn DatabaseConnection> {
        &self.conn
    }

    async fn select(&self, exec: &dyn Executor, limit: usize) -> Result<Vec<R>, AdapterError> {
        let sql = format!("SELECT * FROM {} LIMIT {}", self.table, limit);
        let result = exec.query(&sql, &[]).await?;
        let bindings = R::bindings();
        let mut records = Vec::with_capacity(result.rows.len());
        for row in result.rows {
            records.push(bindings.decode_named(&result.columns, row)?);
        }
        Ok(records)
    }

    async fn insert(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        self.create(exec, std::slice::from_mut(record)).await
    }

    async fn insert_batch(
        &self,
        exec: &dyn Executor,
        _cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError> {
        for chunk in records.chunks_mut(self.batch_size) {
            self.create(exec, chunk).await?;
        }
        Ok(())
    }

    async fn update(&self, exec: &dyn Executor, record: &mut R) -> Result<(), AdapterError> {
        self.save(exec, record).await
    }

    async fn update_batch(
        &self,
        exec: &dyn Executor,
        _cache: &mut StatementCache,
        records: &mut [R],
    ) -> Result<(), AdapterError> {
        for record in records.iter_mut() {
            self.save(exec, record).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ColumnInfo, MockConnection, Value};
    use crate::model::Address;

    fn address(street: &str) -> Address {
        Address {
            street: street.to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            ..Default::default()
        }
    }

    /// Whole rows as `RETURNING *` yields them, one per `(pk, street)`
    fn returned(rows: &[(i64, &str)]) -> QueryResult {
        let at = chrono::Utc::now();
        let mut result = QueryResult::new(
            ["pk", "created_tmz", "modified_tmz", "street", "city", "state", "zip"]
                .into_iter()
                .map(|c| ColumnInfo::new(c, "TEXT"))
                .collect(),
        );
        for (id, street) in rows {
            result
                .push_row(vec![
                    Value::Int(*id),
                    Value::DateTime(at),
                    Value::DateTime(at),
                    Value::from(*street),
                    Value::from("Springfield"),
                    Value::from("IL"),
                    Value::from("62701"),
                ])
                .unwrap();
        }
        result
    }

    #[tokio::test]
    async fn test_batch_insert_is_chunked() {
        let conn = Arc::new(MockConnection::new());
        conn.expect_query(r"^INSERT INTO t .*\), \(\$5", returned(&[(1, "a"), (2, "b")]))
            .await
            .unwrap();
        conn.expect_query(r"VALUES \(\$1, \$2, \$3, \$4\) RETURNING \*$", returned(&[(3, "c")]))
            .await
            .unwrap();

        let orm: OrmAdapter<Address> = OrmAdapter::new(conn.clone(), "t", 2);
        let mut records = vec![address("a"), address("b"), address("c")];
        let mut cache = StatementCache::new();
        orm.insert_batch(conn.as_ref(), &mut cache, &mut records)
            .await
            .unwrap();

        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(conn.expectations_met().await.is_ok());
        assert_eq!(conn.prepared_count().await, 0);
    }

    #[tokio::test]
    async fn test_batch_insert_pairs_rows_by_written_values() {
        let conn = Arc::new(MockConnection::new());
        conn.expect_query("^INSERT", returned(&[(12, "c"), (10, "a"), (11, "b")]))
            .await
            .unwrap();

        let orm: OrmAdapter<Address> = OrmAdapter::new(conn.clone(), "t", 10);
        let mut records = vec![address("a"), address("b"), address("c")];
        orm.insert_batch(conn.as_ref(), &mut StatementCache::new(), &mut records)
            .await
            .unwrap();

        let ids: Vec<(i64, &str)> = records.iter().map(|r| (r.id, r.street.as_str())).collect();
        assert_eq!(ids, vec![(10, "a"), (11, "b"), (12, "c")]);
    }

    #[tokio::test]
    async fn test_batch_insert_duplicates_each_get_a_row() {
        let conn = Arc::new(MockConnection::new());
        conn.expect_query("^INSERT", returned(&[(2, "a"), (1, "a")]))
            .await
            .unwrap();

        let orm: OrmAdapter<Address> = OrmAdapter::new(conn.clone(), "t", 10);
        let mut records = vec![address("a"), address("a")];
        orm.insert_batch(conn.as_ref(), &mut StatementCache::new(), &mut records)
            .await
            .unwrap();

        let mut ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_foreign_returned_row_is_an_error() {
        let conn = Arc::new(MockConnection::new());
        conn.expect_query("^INSERT", returned(&[(1, "a"), (2, "z")]))
            .await
            .unwrap();

        let orm: OrmAdapter<Address> = OrmAdapter::new(conn.clone(), "t", 10);
        let mut records = vec![address("a"), address("b")];
        let result = orm
            .insert_batch(conn.as_ref(), &mut StatementCache::new(), &mut records)
            .await;
        assert!(matches!(result, Err(AdapterError::UnmatchedRow { index: 1 })));
    }

    #[tokio::test]
    async fn test_short_returning_is_an_error() {
        let conn = Arc::new(MockConnection::new());
        conn.expect_query("^INSERT", returned(&[(1, "a")])).await.unwrap();

        let orm: OrmAdapter<Address> = OrmAdapter::new(conn.clone(), "t", 10);
        let mut records = vec![address("a"), address("b")];
        let result = orm
            .insert_batch(conn.as_ref(), &mut StatementCache::new(), &mut records)
            .await;
        assert!(matches!(result, Err(AdapterError::BatchMismatch { .. })));
    }

    #[tokio::test]
    async fn test_save_returns_whole_row() {
        let conn = Arc::new(MockConnection::new());
        conn.expect_query("^UPDATE t SET", returned(&[(7, "b")])).await.unwrap();

        let orm: OrmAdapter<Address> = OrmAdapter::new(conn.clone(), "t", 10);
        let mut address = Address {
            id: 7,
            ..address("a")
        };
        orm.update(conn.as_ref(), &mut address).await.unwrap();
        assert!(address.modified_time.is_set());
        assert_eq!(address.street, "b");
    }
}
