//! Shared set-up for the criterion entry points
//!
//! Every unit gets one preflight run before it is registered; a failing
//! preflight aborts the bench binary so criterion never times a broken unit.

#![allow(dead_code)]

use criterion::{BenchmarkId, Criterion};
use sqlbench::adapters::adapters_for;
use sqlbench::bench::{prepare_set, workload::set_name, Driver, WorkloadKind};
use sqlbench::config::BenchConfig;
use sqlbench::database::{BackendKind, Connect, ConnectionBroker};
use sqlbench::fixtures::{FixtureContext, FixtureStore};
use sqlbench::model::Address;
use std::time::Duration;
use tokio::runtime::Runtime;

pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
}

pub fn load() -> (BenchConfig, FixtureStore) {
    let config = BenchConfig::load(None).expect("failed to load configuration");
    let fixtures = FixtureStore::embedded().expect("failed to decode embedded fixtures");
    (config, fixtures)
}

fn records(context: &mut FixtureContext, kind: WorkloadKind, rows: usize) -> &mut [Address] {
    if kind == WorkloadKind::Select {
        return &mut [];
    }
    context
        .addresses_mut(rows)
        .unwrap_or_else(|e| panic!("{} rows: {}", rows, e))
}

/// Registers every set of a live backend; prints a skip line when it is not configured
pub fn live_benchmarks(c: &mut Criterion, backend: BackendKind) {
    let rt = runtime();
    let (config, fixtures) = load();
    let broker = ConnectionBroker::new(config.clone());

    for kind in WorkloadKind::ALL {
        let name = set_name(backend, kind);
        let handles = match rt.block_on(broker.connect(backend)) {
            Ok(Connect::Ready(handles)) => handles,
            Ok(Connect::Skipped(reason)) => {
                eprintln!("{}\n--- SKIP: {}", name, reason);
                return;
            }
            Err(e) => panic!("{}: connect failed: {}", name, e),
        };

        let mut context = fixtures.context();
        rt.block_on(prepare_set(&handles, &mut context, kind, &config.table_name))
            .unwrap_or_else(|e| panic!("{}: set preparation failed: {}", name, e));

        let adapters =
            adapters_for::<Address>(&handles, &config.table_name, config.orm_batch_size);
        let mut group = c.benchmark_group(&name);
        group.sample_size(10);
        group.measurement_time(Duration::from_millis(config.bench_time_ms.max(1000)));

        for &rows in &config.row_counts {
            for adapter in &adapters {
                let driver = Driver::new(adapter.as_ref());
                let id = BenchmarkId::new(adapter.id().as_str(), rows);

                rt.block_on(driver.run(kind, records(&mut context, kind, rows), rows, 1))
                    .unwrap_or_else(|e| {
                        panic!("{}/{} {}: preflight failed: {}", name, adapter.id(), rows, e)
                    });

                group.bench_function(id, |b| {
                    b.iter_custom(|iters| {
                        let records = records(&mut context, kind, rows);
                        rt.block_on(driver.run(kind, records, rows, iters))
                            .unwrap_or_else(|e| panic!("{}: {}", name, e))
                            .elapsed
                    })
                });
            }
        }
        group.finish();

        if let Err(e) = rt.block_on(handles.close()) {
            eprintln!("{}: closing backend failed: {}", name, e);
        }
    }
}
