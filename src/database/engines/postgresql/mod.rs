//! PostgreSQL Database Engine
//!
//! sqlx-backed PostgreSQL support: pooled connections, transactions and
//! prepared statements.

pub mod connection;
pub mod prepared;
pub mod transaction;

pub use connection::PostgreSqlConnection;
pub use prepared::PostgreSqlPreparedStatement;
pub use transaction::PostgreSqlTransaction;
