//! Re-applying the schema leaves an empty table

mod common;

use common::{connect_sqlite, sqlite_config};
use sqlbench::database::schema::{apply_schema, SCHEMA_SQLITE};
use sqlbench::database::{Executor, Value};

#[tokio::test]
async fn test_schema_reapplication_is_idempotent() {
    let (_dir, config) = sqlite_config("SQLITE_SCHEMA_DSN");
    let backend = connect_sqlite(&config).await;
    let table = &config.table_name;
    let count_sql = format!("SELECT COUNT(*) FROM {}", table);

    let insert = format!(
        "INSERT INTO {} (street, city, state, zip) VALUES ('a', 'b', 'c', 'd')",
        table
    );
    backend.primary.execute(&insert, &[]).await.unwrap();
    let count = backend.primary.query(&count_sql, &[]).await.unwrap();
    assert_eq!(count.rows[0][0], Value::Int(1));

    for _ in 0..2 {
        apply_schema(SCHEMA_SQLITE, table, backend.primary.as_ref())
            .await
            .unwrap();
        let count = backend.primary.query(&count_sql, &[]).await.unwrap();
        assert_eq!(count.rows[0][0], Value::Int(0));
    }

    backend.close().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_rebuilds_the_table() {
    let (_dir, config) = sqlite_config("SQLITE_RECONNECT_DSN");
    let count_sql = format!("SELECT COUNT(*) FROM {}", config.table_name);

    let first = connect_sqlite(&config).await;
    let insert = format!(
        "INSERT INTO {} (street, city, state, zip) VALUES ('a', 'b', 'c', 'd')",
        config.table_name
    );
    first.primary.execute(&insert, &[]).await.unwrap();
    first.close().await.unwrap();

    let second = connect_sqlite(&config).await;
    let count = second.primary.query(&count_sql, &[]).await.unwrap();
    assert_eq!(count.rows[0][0], Value::Int(0));
    second.close().await.unwrap();
}
