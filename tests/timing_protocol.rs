//! Timing-window invariants of the driver

use chrono::Utc;
use sqlbench::adapters::{Adapter, ModelAdapter, RawAdapter};
use sqlbench::bench::{Driver, Stopwatch, TimingError, WorkloadKind};
use sqlbench::database::{ColumnInfo, MockConnection, MockExpectation, QueryResult, Value};
use sqlbench::model::{Address, Record};
use std::sync::Arc;
use std::time::Duration;

fn returning(columns: &[&str], values: Vec<Value>) -> QueryResult {
    let mut result = QueryResult::new(columns.iter().map(|c| ColumnInfo::new(*c, "TEXT")).collect());
    result.push_row(values).unwrap();
    result
}

fn inserted_row() -> QueryResult {
    let now = Utc::now();
    returning(
        &["pk", "created_tmz", "modified_tmz"],
        vec![Value::Int(42), Value::DateTime(now), Value::DateTime(now)],
    )
}

#[tokio::test]
async fn test_insert_hooks_run_only_while_paused() {
    let mock = Arc::new(MockConnection::new());
    let adapter: RawAdapter<Address> = RawAdapter::new(mock.clone(), "t");
    let expectation = MockExpectation::query("(?i)^insert into t", inserted_row()).unwrap();
    let mut records = vec![Address::default(); 3];

    let measurement = Driver::new(&adapter)
        .with_mock(mock.clone(), expectation)
        .run(WorkloadKind::Insert, &mut records, 3, 2)
        .await
        .unwrap();

    assert_eq!(measurement.operations, 6);
    // One pre and one post hook per operation, each inside its own pause.
    assert_eq!(measurement.hooks, 12);
    assert_eq!(measurement.pauses, 12);
    assert_eq!(measurement.pauses, measurement.resumes);
    assert_eq!(measurement.elapsed + measurement.paused, measurement.wall);
    assert!(records.iter().all(|r| r.id() == 42));
    assert_eq!(mock.transaction_counts().await, (0, 0));
}

#[tokio::test]
async fn test_prepared_insert_commits_one_batch_per_repetition() {
    let mock = Arc::new(MockConnection::new());
    let adapter: ModelAdapter<Address> = ModelAdapter::new(mock.clone(), "t");
    let mut records = vec![Address::default(); 2];
    for _ in 0..3 {
        for _ in 0..2 {
            mock.expect(MockExpectation::query("^INSERT INTO t", inserted_row()).unwrap())
                .await;
        }
    }

    let measurement = Driver::new(&adapter)
        .run(WorkloadKind::InsertPrepared, &mut records, 2, 3)
        .await
        .unwrap();

    assert_eq!(measurement.operations, 3);
    assert_eq!(measurement.pauses, 6);
    assert_eq!(mock.prepared_count().await, 1);
    assert_eq!(mock.transaction_counts().await, (1, 0));
}

#[tokio::test]
async fn test_update_rolls_back_and_keeps_baseline() {
    let mock = Arc::new(MockConnection::new());
    let adapter: RawAdapter<Address> = RawAdapter::new(mock.clone(), "t");
    let baseline = Utc::now() - chrono::Duration::hours(1);
    let mut records = vec![Address {
        id: 7,
        created_time: sqlbench::model::Timestamp::new(baseline),
        modified_time: sqlbench::model::Timestamp::new(baseline),
        ..Default::default()
    }];
    let updated = returning(
        &["created_tmz", "modified_tmz"],
        vec![Value::DateTime(baseline), Value::DateTime(Utc::now())],
    );
    let expectation = MockExpectation::query("(?i)^update t set", updated).unwrap();

    let measurement = Driver::new(&adapter)
        .with_mock(mock.clone(), expectation)
        .run(WorkloadKind::Update, &mut records, 1, 4)
        .await
        .unwrap();

    assert_eq!(measurement.operations, 4);
    assert_eq!(records[0].modified().get(), Some(baseline));
    assert_eq!(mock.transaction_counts().await, (0, 1));
}

#[test]
fn test_stopwatch_usage_errors() {
    let mut watch = Stopwatch::start();
    assert_eq!(watch.ensure_paused(), Err(TimingError::HookWhileRunning));
    watch.pause().unwrap();
    assert_eq!(watch.pause(), Err(TimingError::AlreadyPaused));
    std::thread::sleep(Duration::from_millis(3));
    watch.resume().unwrap();
    assert_eq!(watch.resume(), Err(TimingError::NotPaused));

    let totals = watch.stop();
    assert_eq!(totals.pauses, 1);
    assert_eq!(totals.resumes, 1);
    assert!(totals.paused >= Duration::from_millis(3));
    assert_eq!(totals.running + totals.paused, totals.wall);
}
