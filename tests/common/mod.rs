//! Shared helpers for the integration tests

#![allow(dead_code)]

use sqlbench::config::BenchConfig;
use sqlbench::database::{Backend, BackendKind, Connect, ConnectionBroker};
use tempfile::TempDir;

/// A config whose SQLite backend is activated by `var`, pointing at a fresh
/// database file. Every test passes its own `var` so tests can run in parallel.
pub fn sqlite_config(var: &str) -> (TempDir, BenchConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sqlbench.db");
    std::env::set_var(var, path.display().to_string());

    let mut config = BenchConfig::default();
    config.table_name = "bench_addresses".to_string();
    config.row_counts = vec![5];
    config.bench_time_ms = 1;
    config.max_iterations = 3;
    config.sqlite.activation_env = var.to_string();
    config.postgres.activation_env = format!("{}_POSTGRES_UNSET", var);
    (dir, config)
}

pub async fn connect_sqlite(config: &BenchConfig) -> Backend {
    match ConnectionBroker::new(config.clone())
        .connect(BackendKind::Sqlite)
        .await
        .expect("sqlite connect")
    {
        Connect::Ready(backend) => backend,
        Connect::Skipped(reason) => panic!("sqlite skipped: {}", reason),
    }
}
