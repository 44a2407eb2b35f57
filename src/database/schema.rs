//! Schema Bootstrapper
//!
//! Ordered DDL per backend. `{TABLE}` is the only substitution.

use super::engine::DatabaseConnection;
use super::types::{BackendKind, DatabaseError};

pub const TABLE_PLACEHOLDER: &str = "{TABLE}";

/// PostgreSQL: triggers stamp both markers server-side
pub const SCHEMA_POSTGRES: &[&str] = &[
    "DROP TABLE IF EXISTS {TABLE}",
    r#"CREATE TABLE {TABLE} (
    pk serial primary key,
    created_tmz timestamp (6) with time zone not null,
    modified_tmz timestamp (6) with time zone not null,
    street character varying not null,
    city character varying not null,
    state character varying not null,
    zip character varying not null
)"#,
    r#"create or replace function trg_addresses_insert() returns trigger as $BODY$
declare
begin
    new.created_tmz = now();
    new.modified_tmz = now();
    return new;
end;
$BODY$ language plpgsql"#,
    r#"create or replace function trg_addresses_update() returns trigger as $BODY$
declare
begin
    new.modified_tmz = now();
    new.created_tmz = old.created_tmz;
    return new;
end;
$BODY$ language plpgsql"#,
    "create trigger trg_addresses_insert before insert on {TABLE}
for each row execute procedure trg_addresses_insert()",
    "create trigger trg_addresses_update before update on {TABLE}
for each row execute procedure trg_addresses_update()",
];

/// SQLite: column defaults stamp the markers on insert
pub const SCHEMA_SQLITE: &[&str] = &[
    "DROP TABLE IF EXISTS {TABLE}",
    "CREATE TABLE {TABLE} (
    pk integer primary key,
    created_tmz datetime not null default (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    modified_tmz datetime not null default (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    street text not null,
    city text not null,
    state text not null,
    zip text not null
)",
];

/// Statement list for `backend`; the mocked driver has none
pub fn statements_for(backend: BackendKind) -> &'static [&'static str] {
    match backend {
        BackendKind::Postgres => SCHEMA_POSTGRES,
        BackendKind::Sqlite => SCHEMA_SQLITE,
        BackendKind::Sqlmock => &[],
    }
}

/// Runs `statements` in order against `conn`, stopping at the first failure
pub async fn apply_schema(
    statements: &[&str],
    table: &str,
    conn: &dyn DatabaseConnection,
) -> Result<(), DatabaseError> {
    for (index, statement) in statements.iter().enumerate() {
        let sql = statement.replace(TABLE_PLACEHOLDER, table);
        conn.execute_script(&sql).await.map_err(|e| {
            tracing::error!(index, table, error = %e, "schema statement failed");
            DatabaseError::SchemaFailed {
                index,
                message: e.to_string(),
            }
        })?;
    }
    tracing::info!(table, statements = statements.len(), "schema applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::engines::mock::MockConnection;
    use crate::database::types::ExecuteResult;

    #[test]
    fn test_every_schema_starts_with_drop() {
        for statements in [SCHEMA_POSTGRES, SCHEMA_SQLITE] {
            assert!(statements[0].starts_with("DROP TABLE IF EXISTS {TABLE}"));
        }
    }

    #[tokio::test]
    async fn test_substitutes_table_name() {
        let conn = MockConnection::new();
        conn.expect_exec("^DROP TABLE IF EXISTS bench_addresses$", ExecuteResult::default())
            .await
            .unwrap();
        conn.expect_exec("CREATE TABLE bench_addresses", ExecuteResult::default())
            .await
            .unwrap();

        apply_schema(SCHEMA_SQLITE, "bench_addresses", &conn)
            .await
            .unwrap();
        assert!(conn.expectations_met().await.is_ok());
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let conn = MockConnection::new();
        conn.expect_exec("^DROP", ExecuteResult::default())
            .await
            .unwrap();
        conn.expect(
            crate::database::engines::mock::MockExpectation::error(
                "^CREATE",
                DatabaseError::QueryFailed("permission denied".to_string()),
            )
            .unwrap(),
        )
        .await;

        let result = apply_schema(SCHEMA_POSTGRES, "t", &conn).await;
        assert!(matches!(result, Err(DatabaseError::SchemaFailed { index: 1, .. })));
        // Nothing after the failing statement was attempted
        assert_eq!(conn.executed().await.len(), 2);
    }
}
