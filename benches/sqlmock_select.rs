//! Mocked-driver select
//!
//! Every adapter selects `rows` sale reports from canned results re-armed
//! outside the timing window. No database is needed.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sqlbench::adapters::adapters_for;
use sqlbench::bench::{runner::mock_select, Driver, WorkloadKind};
use sqlbench::database::{BackendKind, Connect, ConnectionBroker};
use sqlbench::model::SaleReport;

mod common;

fn sqlmock_select(c: &mut Criterion) {
    let rt = common::runtime();
    let (config, fixtures) = common::load();
    let broker = ConnectionBroker::new(config.clone());
    let handles = match rt.block_on(broker.connect(BackendKind::Sqlmock)) {
        Ok(Connect::Ready(handles)) => handles,
        _ => panic!("mocked backend is always available"),
    };
    let mock = handles.mock.clone().expect("mocked backend has an expectation queue");
    let context = fixtures.context();
    let adapters =
        adapters_for::<SaleReport>(&handles, &config.table_name, config.orm_batch_size);

    let mut group = c.benchmark_group("SqlmockSelect");
    for &rows in &config.mock_row_counts {
        let expectation = mock_select(&context, rows).expect("canned rows");
        group.throughput(Throughput::Elements(rows as u64));
        for adapter in &adapters {
            let driver =
                Driver::new(adapter.as_ref()).with_mock(mock.clone(), expectation.clone());
            rt.block_on(driver.run(WorkloadKind::Select, &mut [], rows, 1))
                .unwrap_or_else(|e| {
                    panic!("{} {} rows: preflight failed: {}", adapter.id(), rows, e)
                });

            let driver = &driver;
            let id = BenchmarkId::new(adapter.id().as_str(), rows);
            group.bench_with_input(id, &rows, |b, &rows| {
                b.to_async(&rt).iter_custom(|iters| async move {
                    driver
                        .run(WorkloadKind::Select, &mut [], rows, iters)
                        .await
                        .unwrap_or_else(|e| panic!("{}", e))
                        .elapsed
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, sqlmock_select);
criterion_main!(benches);
