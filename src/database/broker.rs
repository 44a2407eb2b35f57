//! Connection Broker
//!
//! Decides per backend whether a benchmark set runs. A backend is activated by
//! an environment variable holding its DSN; an unset or empty variable means
//! "not configured" and yields a skip. Every other failure is an error.

use super::engine::DatabaseConnection;
use super::engines::{MockConnection, PostgreSqlConnection, SqliteConnection};
use super::schema::{apply_schema, statements_for};
use super::types::{BackendKind, DatabaseError, PoolSettings};
use crate::config::BenchConfig;
use std::sync::Arc;

/// Result of [`ConnectionBroker::connect`]
pub enum Connect {
    /// Backend not configured; the reason is reported as-is
    Skipped(String),
    Ready(Backend),
}

impl Connect {
    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            Connect::Skipped(reason) => Some(reason),
            Connect::Ready(_) => None,
        }
    }
}

/// Handles of one backend, shared by every unit of a set
pub struct Backend {
    pub kind: BackendKind,
    /// Handle used by every adapter except the ORM
    pub primary: Arc<dyn DatabaseConnection>,
    /// The ORM's own pool on the same database
    pub aux: Option<Arc<dyn DatabaseConnection>>,
    /// Expectation queue of the mocked driver
    pub mock: Option<Arc<MockConnection>>,
}

impl Backend {
    /// Closes both handles
    pub async fn close(&self) -> Result<(), DatabaseError> {
        if let Some(aux) = &self.aux {
            aux.close().await?;
        }
        self.primary.close().await
    }
}

/// Connection broker
///
/// Builds backend connections from the configuration
pub struct ConnectionBroker {
    config: BenchConfig,
}

impl ConnectionBroker {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    /// Opens, health-checks and bootstraps `kind`
    pub async fn connect(&self, kind: BackendKind) -> Result<Connect, DatabaseError> {
        let Some(backend_config) = self.config.backend(kind) else {
            let mock = Arc::new(MockConnection::new());
            return Ok(Connect::Ready(Backend {
                kind,
                primary: mock.clone(),
                aux: None,
                mock: Some(mock),
            }));
        };

        let var = &backend_config.activation_env;
        let dsn = match std::env::var(var) {
            Ok(dsn) if !dsn.trim().is_empty() => dsn,
            _ => {
                tracing::info!(backend = %kind, env = %var, "backend not configured, skipping");
                return Ok(Connect::Skipped(format!("{} environment variable is empty", var)));
            }
        };

        let primary = open(kind, &dsn, &backend_config.pool_settings()).await?;
        let aux = match open(kind, &dsn, &backend_config.orm_pool_settings()).await {
            Ok(aux) => aux,
            Err(e) => {
                let _ = primary.close().await;
                return Err(e);
            }
        };

        let backend = Backend {
            kind,
            primary,
            aux: Some(aux),
            mock: None,
        };

        if let Err(e) = apply_schema(
            statements_for(kind),
            &self.config.table_name,
            backend.primary.as_ref(),
        )
        .await
        {
            let _ = backend.close().await;
            return Err(e);
        }

        tracing::info!(
            backend = %kind,
            database = %backend.primary.connection_info().database_name,
            "backend ready"
        );
        Ok(Connect::Ready(backend))
    }
}

async fn open(
    kind: BackendKind,
    dsn: &str,
    settings: &PoolSettings,
) -> Result<Arc<dyn DatabaseConnection>, DatabaseError> {
    let conn: Arc<dyn DatabaseConnection> = match kind {
        BackendKind::Postgres => Arc::new(PostgreSqlConnection::connect(dsn, settings).await?),
        BackendKind::Sqlite => Arc::new(SqliteConnection::connect(dsn, settings).await?),
        BackendKind::Sqlmock => Arc::new(MockConnection::new()),
    };

    if let Err(e) = conn.ping().await {
        tracing::error!(backend = %kind, error = %e, "health check failed");
        let _ = conn.close().await;
        return Err(e);
    }
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_env(var: &str) -> BenchConfig {
        let mut config = BenchConfig::default();
        config.postgres.activation_env = var.to_string();
        config.sqlite.activation_env = var.to_string();
        config
    }

    #[tokio::test]
    async fn test_unset_activation_skips() {
        let var = "SQLBENCH_BROKER_UNIT_UNSET";
        std::env::remove_var(var);
        let broker = ConnectionBroker::new(config_with_env(var));

        for kind in [BackendKind::Postgres, BackendKind::Sqlite] {
            let connect = broker.connect(kind).await.unwrap();
            assert_eq!(
                connect.skip_reason(),
                Some("SQLBENCH_BROKER_UNIT_UNSET environment variable is empty")
            );
        }
    }

    #[tokio::test]
    async fn test_mock_is_always_ready() {
        let broker = ConnectionBroker::new(BenchConfig::default());
        match broker.connect(BackendKind::Sqlmock).await.unwrap() {
            Connect::Ready(backend) => {
                assert!(backend.aux.is_none());
                assert!(backend.mock.is_some());
                assert!(backend.primary.ping().await.is_ok());
            }
            Connect::Skipped(reason) => panic!("mock skipped: {}", reason),
        }
    }

    #[tokio::test]
    async fn test_bad_dsn_is_an_error_not_a_skip() {
        let var = "SQLBENCH_BROKER_UNIT_BAD_DSN";
        std::env::set_var(var, "sqlite::memory:");
        let broker = ConnectionBroker::new(config_with_env(var));

        let result = broker.connect(BackendKind::Sqlite).await;
        assert!(matches!(result, Err(DatabaseError::ConfigurationError(_))));
        std::env::remove_var(var);
    }
}
