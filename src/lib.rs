//! # sqlbench
//!
//! Comparative benchmark of relational-database access strategies.
//!
//! The same select, insert and update workloads run through five adapters
//! (raw statements, a named-parameter mapper, a query builder, a binding-table
//! model and an ORM-style layer) against PostgreSQL, SQLite and a mocked
//! driver. Correctness hooks check every operation with the timing window
//! paused, so only adapter work is measured.

pub mod adapters;
pub mod bench;
pub mod config;
pub mod database;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod model;

pub use config::BenchConfig;
pub use error::{Error, Result};
