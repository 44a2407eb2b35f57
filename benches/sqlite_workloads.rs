//! SQLite workloads
//!
//! Runs when `TEST_SQLITE` (or the configured activation variable) holds a DSN
//! such as `sqlite:///tmp/sqlbench.db`.

use criterion::{criterion_group, criterion_main, Criterion};
use sqlbench::database::BackendKind;

mod common;

fn sqlite_workloads(c: &mut Criterion) {
    common::live_benchmarks(c, BackendKind::Sqlite);
}

criterion_group!(benches, sqlite_workloads);
criterion_main!(benches);
