//! Database Engine Implementations
//!
//! Concrete drivers behind the [`DatabaseConnection`](super::engine::DatabaseConnection) trait

pub mod mock;
pub mod postgresql;
pub mod sqlite;

pub use mock::MockConnection;
pub use postgresql::PostgreSqlConnection;
pub use sqlite::SqliteConnection;
