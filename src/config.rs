use crate::database::types::{BackendKind, PoolSettings};
use crate::error::{Error, Result};
use crate::logging::LogRotation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Benchmark settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BenchConfig {
    /// Table the schema creates (`{TABLE}` substitution)
    pub table_name: String,
    /// Row counts for live select/insert/update units
    pub row_counts: Vec<usize>,
    /// Row counts for the mocked select set
    pub mock_row_counts: Vec<usize>,
    /// Target measuring time per unit
    pub bench_time_ms: u64,
    pub max_iterations: u64,
    /// Rows per multi-row INSERT issued by the ORM adapter
    pub orm_batch_size: usize,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// Rotation of `log_file`: never, hourly or daily
    pub log_rotation: LogRotation,
    /// JSON log lines instead of the text format
    pub log_json: bool,
    pub postgres: BackendConfig,
    pub sqlite: BackendConfig,
}

/// Per-backend settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Environment variable holding the DSN; empty or unset skips the backend
    pub activation_env: String,
    pub max_connections: u32,
    /// Pool size of the ORM's own handle
    pub orm_max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl BackendConfig {
    fn with_env(activation_env: &str) -> Self {
        Self {
            activation_env: activation_env.to_string(),
            max_connections: 4,
            orm_max_connections: 2,
            acquire_timeout_secs: 30,
        }
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }

    pub fn orm_pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.orm_max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            table_name: "sqlh_addresses".to_string(),
            row_counts: vec![5, 50, 100, 500, 1000],
            mock_row_counts: vec![5, 50, 100, 500, 1000, 10000],
            bench_time_ms: 1000,
            max_iterations: 1_000_000,
            orm_batch_size: 500,
            log_level: "info".to_string(),
            log_file: None,
            log_rotation: LogRotation::Never,
            log_json: false,
            postgres: BackendConfig::with_env("TEST_POSTGRES"),
            sqlite: BackendConfig::with_env("TEST_SQLITE"),
        }
    }
}

impl BenchConfig {
    /// Loads the layered configuration
    ///
    /// Defaults, then `path` (or `sqlbench.toml` when present), then
    /// `SQLBENCH_*` variables (`SQLBENCH_POSTGRES__MAX_CONNECTIONS=8`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        // Defaults
        settings = settings.add_source(config::Config::try_from(&BenchConfig::default())?);

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path));
            }
            None if Path::new("sqlbench.toml").exists() => {
                settings = settings.add_source(config::File::from(Path::new("sqlbench.toml")));
            }
            None => {}
        }

        // SQLBENCH_* overrides
        settings = settings.add_source(
            config::Environment::with_prefix("SQLBENCH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("row_counts")
                .with_list_parse_key("mock_row_counts")
                .try_parsing(true),
        );

        let config: BenchConfig = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no run can use
    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(Error::Config("table_name cannot be empty".to_string()));
        }
        for (name, counts) in [
            ("row_counts", &self.row_counts),
            ("mock_row_counts", &self.mock_row_counts),
        ] {
            if counts.is_empty() {
                return Err(Error::Config(format!("{} cannot be empty", name)));
            }
            if counts.contains(&0) {
                return Err(Error::Config(format!("{} cannot contain 0", name)));
            }
        }
        if self.orm_batch_size == 0 {
            return Err(Error::Config("orm_batch_size must be positive".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be positive".to_string()));
        }
        for backend in [&self.postgres, &self.sqlite] {
            if backend.activation_env.is_empty() {
                return Err(Error::Config("activation_env cannot be empty".to_string()));
            }
            if backend.max_connections == 0 || backend.orm_max_connections == 0 {
                return Err(Error::Config(format!(
                    "pool sizes for {} must be positive",
                    backend.activation_env
                )));
            }
        }
        Ok(())
    }

    /// Settings of a live backend; the mocked driver has none
    pub fn backend(&self, kind: BackendKind) -> Option<&BackendConfig> {
        match kind {
            BackendKind::Postgres => Some(&self.postgres),
            BackendKind::Sqlite => Some(&self.sqlite),
            BackendKind::Sqlmock => None,
        }
    }

    pub fn bench_time(&self) -> Duration {
        Duration::from_millis(self.bench_time_ms)
    }

    /// Row counts used by `backend`
    pub fn row_counts_for(&self, backend: BackendKind) -> &[usize] {
        match backend {
            BackendKind::Sqlmock => &self.mock_row_counts,
            _ => &self.row_counts,
        }
    }
}
