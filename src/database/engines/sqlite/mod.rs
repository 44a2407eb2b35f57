//! SQLite Database Engine
//!
//! File-backed SQLite through sqlx: connection pool, transactions and
//! prepared statements.

pub mod connection;
pub mod prepared;
pub mod transaction;

pub use connection::{SqliteConnection, SQLITE_DATETIME_FORMAT};
pub use prepared::SqlitePreparedStatement;
pub use transaction::SqliteTransaction;
