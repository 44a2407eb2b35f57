//! Database access layer
//!
//! Driver surface shared by every adapter, the concrete backends behind it and
//! the one-time bootstrap (broker, schema) that runs before any measured loop.

pub mod broker;
pub mod engine;
pub mod engines;
pub mod query_builder;
pub mod schema;
pub mod types;

pub use broker::{Backend, Connect, ConnectionBroker};
pub use engine::{
    ConnectionInfo, DatabaseConnection, DatabaseTransaction, Executor, PreparedStatement,
};
pub use engines::mock::MockExpectation;
pub use engines::{MockConnection, PostgreSqlConnection, SqliteConnection};
pub use types::{
    BackendKind, ColumnInfo, DatabaseError, Dialect, ExecuteResult, QueryResult, Value,
};
