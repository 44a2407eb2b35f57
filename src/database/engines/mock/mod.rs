//! Mocked database driver
//!
//! Serves canned rows to adapters without a server, so driver-side overhead
//! can be measured in isolation.

pub mod connection;
pub mod expectation;

pub use connection::{MockConnection, MockPreparedStatement, MockTransaction};
pub use expectation::{MockExpectation, MockResponse};
