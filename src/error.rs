//! Error types for the benchmarking harness.

use thiserror::Error;

/// Result type alias for harness setup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or booting the harness
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source could not be read or deserialized
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// Embedded fixtures did not decode
    #[error("Fixture error: {0}")]
    Fixture(#[from] crate::fixtures::FixtureError),

    /// Database error outside a benchmark unit
    #[error("Database error: {0}")]
    Database(#[from] crate::database::types::DatabaseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
