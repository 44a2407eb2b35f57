//! Select workload against the mocked driver

use sqlbench::adapters::{adapters_for, Adapter, AdapterId};
use sqlbench::bench::runner::mock_select;
use sqlbench::bench::{BenchError, Driver, WorkloadKind};
use sqlbench::config::BenchConfig;
use sqlbench::database::{BackendKind, Connect, ConnectionBroker, MockConnection};
use sqlbench::fixtures::FixtureStore;
use sqlbench::model::SaleReport;
use std::sync::Arc;

async fn mock_backend() -> sqlbench::database::Backend {
    match ConnectionBroker::new(BenchConfig::default())
        .connect(BackendKind::Sqlmock)
        .await
        .unwrap()
    {
        Connect::Ready(backend) => backend,
        Connect::Skipped(reason) => panic!("{}", reason),
    }
}

#[tokio::test]
async fn test_every_adapter_selects_exactly_the_canned_rows() {
    let backend = mock_backend().await;
    let mock = backend.mock.clone().unwrap();
    let context = FixtureStore::embedded().unwrap().context();
    let adapters = adapters_for::<SaleReport>(&backend, "sales_report", 500);
    assert_eq!(adapters.len(), 4);

    for rows in [5, 1000, 10_000] {
        let expectation = mock_select(&context, rows).unwrap();
        for adapter in &adapters {
            let driver = Driver::new(adapter.as_ref()).with_mock(mock.clone(), expectation.clone());
            let measurement = driver
                .run(WorkloadKind::Select, &mut [], rows, 2)
                .await
                .unwrap_or_else(|e| panic!("{} {}: {}", adapter.id(), rows, e));
            assert_eq!(measurement.operations, 2);
        }
    }
    assert!(mock.expectations_met().await.is_ok());
}

#[tokio::test]
async fn test_selected_reports_carry_fixture_values() {
    let backend = mock_backend().await;
    let mock = backend.mock.clone().unwrap();
    let context = FixtureStore::embedded().unwrap().context();
    let expected = context.cycled_sales(3);

    for adapter in adapters_for::<SaleReport>(&backend, "sales_report", 500) {
        mock.expect(mock_select(&context, 3).unwrap()).await;
        let selected = adapter
            .select(backend.primary.as_executor(), 3)
            .await
            .unwrap_or_else(|e| panic!("{}: {}", adapter.id(), e));
        assert_eq!(selected, expected, "{}", adapter.id());
    }
}

#[tokio::test]
async fn test_unexpected_statement_fails_the_unit() {
    let mock = Arc::new(MockConnection::new());
    let adapter = sqlbench::adapters::RawAdapter::<SaleReport>::new(mock.clone(), "sales_report");
    assert_eq!(adapter.id(), AdapterId::Raw);

    let expectation =
        sqlbench::database::MockExpectation::query("^delete", Default::default()).unwrap();
    let result = Driver::new(&adapter)
        .with_mock(mock.clone(), expectation)
        .run(WorkloadKind::Select, &mut [], 5, 1)
        .await;
    assert!(matches!(result, Err(BenchError::Adapter { adapter: AdapterId::Raw, .. })));
}
