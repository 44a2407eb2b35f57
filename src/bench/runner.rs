//! Calibrating runner
//!
//! Runs benchmark sets, one per workload kind per backend, sequentially. Each
//! set connects, prepares its fixture context and then walks the row-count x
//! adapter matrix, calibrating the repetition count of every unit against the
//! configured bench time.

use super::driver::{Driver, Measurement};
use super::workload::{set_name, WorkloadKind, WorkloadUnit};
use super::BenchError;
use crate::adapters::{adapters_for, Adapter, AdapterId, ModelAdapter, StatementCache};
use crate::config::BenchConfig;
use crate::database::{
    Backend, BackendKind, ColumnInfo, Connect, ConnectionBroker, DatabaseError, MockExpectation,
    QueryResult,
};
use crate::fixtures::{FixtureContext, FixtureStore};
use crate::model::{Address, Record, SaleReport};
use std::fmt;
use std::time::Duration;

/// Statements the mocked driver answers during a select set
pub const MOCK_SELECT_PATTERN: &str = "(?i)^select +";

/// Restricts which sets and units run; empty lists mean "everything"
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub backends: Vec<BackendKind>,
    pub workloads: Vec<WorkloadKind>,
    pub rows: Vec<usize>,
}

impl Filter {
    fn backend(&self, kind: BackendKind) -> bool {
        self.backends.is_empty() || self.backends.contains(&kind)
    }

    fn workload(&self, kind: WorkloadKind) -> bool {
        self.workloads.is_empty() || self.workloads.contains(&kind)
    }

    fn rows(&self, rows: usize) -> bool {
        self.rows.is_empty() || self.rows.contains(&rows)
    }
}

/// How a unit ended
#[derive(Debug)]
pub enum UnitOutcome {
    Measured(Measurement),
    Failed(String),
}

#[derive(Debug)]
pub struct UnitReport {
    pub unit: WorkloadUnit,
    pub outcome: UnitOutcome,
}

impl UnitReport {
    fn new(unit: WorkloadUnit, result: Result<Measurement, BenchError>) -> Self {
        let outcome = match result {
            Ok(measurement) => {
                tracing::info!(
                    unit = %unit.name(),
                    iterations = measurement.iterations,
                    ns_per_op = %measurement.ns_per_op(),
                    "unit finished"
                );
                UnitOutcome::Measured(measurement)
            }
            Err(e) => {
                tracing::error!(unit = %unit.name(), error = %e, "unit failed");
                UnitOutcome::Failed(e.to_string())
            }
        };
        Self { unit, outcome }
    }

    pub fn failed(&self) -> bool {
        matches!(self.outcome, UnitOutcome::Failed(_))
    }
}

impl fmt::Display for UnitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            UnitOutcome::Measured(m) => write!(
                f,
                "{:<64} {:>10} {:>14} ns/op",
                self.unit.name(),
                m.iterations,
                m.ns_per_op()
            ),
            UnitOutcome::Failed(error) => {
                write!(f, "{}\n--- FAIL: {}", self.unit.name(), error)
            }
        }
    }
}

/// How a set ended
#[derive(Debug)]
pub enum SetOutcome {
    Ran(Vec<UnitReport>),
    Skipped(String),
    /// Connect or preparation failed; no unit ran
    Failed(String),
}

#[derive(Debug)]
pub struct SetReport {
    pub name: String,
    pub backend: BackendKind,
    pub kind: WorkloadKind,
    pub outcome: SetOutcome,
}

impl SetReport {
    pub fn failed(&self) -> bool {
        match &self.outcome {
            SetOutcome::Ran(units) => units.iter().any(UnitReport::failed),
            SetOutcome::Skipped(_) => false,
            SetOutcome::Failed(_) => true,
        }
    }

    pub fn units(&self) -> &[UnitReport] {
        match &self.outcome {
            SetOutcome::Ran(units) => units,
            _ => &[],
        }
    }
}

impl fmt::Display for SetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            SetOutcome::Skipped(reason) => write!(f, "{}\n--- SKIP: {}", self.name, reason),
            SetOutcome::Failed(error) => write!(f, "{}\n--- FAIL: {}", self.name, error),
            SetOutcome::Ran(units) => {
                let mut first = true;
                for unit in units {
                    if !first {
                        writeln!(f)?;
                    }
                    write!(f, "{}", unit)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// Benchmark harness
pub struct Harness {
    config: BenchConfig,
    fixtures: FixtureStore,
    broker: ConnectionBroker,
    filter: Filter,
}

impl Harness {
    pub fn new(config: BenchConfig, fixtures: FixtureStore) -> Self {
        let broker = ConnectionBroker::new(config.clone());
        Self {
            config,
            fixtures,
            broker,
            filter: Filter::default(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets to run, in order; the mocked driver only serves selects
    pub fn plan(&self) -> Vec<(BackendKind, WorkloadKind)> {
        BackendKind::ALL
            .iter()
            .flat_map(|backend| WorkloadKind::ALL.iter().map(move |kind| (*backend, *kind)))
            .filter(|(backend, kind)| {
                *backend != BackendKind::Sqlmock || *kind == WorkloadKind::Select
            })
            .filter(|(backend, kind)| self.filter.backend(*backend) && self.filter.workload(*kind))
            .collect()
    }

    pub async fn run(&self) -> Vec<SetReport> {
        let mut reports = Vec::new();
        for (backend, kind) in self.plan() {
            reports.push(self.run_set(backend, kind).await);
        }
        reports
    }

    pub async fn run_set(&self, backend: BackendKind, kind: WorkloadKind) -> SetReport {
        let name = set_name(backend, kind);
        tracing::info!(set = %name, "set starting");

        let outcome = match self.broker.connect(backend).await {
            Ok(Connect::Skipped(reason)) => SetOutcome::Skipped(reason),
            Err(e) => {
                tracing::error!(set = %name, error = %e, "connect failed");
                SetOutcome::Failed(e.to_string())
            }
            Ok(Connect::Ready(handles)) => {
                let outcome = match backend {
                    BackendKind::Sqlmock => self.run_mock_select(&handles).await,
                    _ => self.run_live(&handles, kind).await,
                };
                if let Err(e) = handles.close().await {
                    tracing::warn!(set = %name, error = %e, "closing backend failed");
                }
                outcome
            }
        };

        SetReport {
            name,
            backend,
            kind,
            outcome,
        }
    }

    async fn run_live(&self, handles: &Backend, kind: WorkloadKind) -> SetOutcome {
        let mut context = self.fixtures.context();
        if let Err(e) = prepare_set(handles, &mut context, kind, &self.config.table_name).await {
            tracing::error!(
                backend = %handles.kind,
                workload = %kind,
                error = %e,
                "set preparation failed"
            );
            return SetOutcome::Failed(e.to_string());
        }

        let adapters =
            adapters_for::<Address>(handles, &self.config.table_name, self.config.orm_batch_size);
        let mut units = Vec::new();
        for rows in self.rows_for(handles.kind) {
            for adapter in &adapters {
                let unit = WorkloadUnit {
                    backend: handles.kind,
                    adapter: adapter.id(),
                    kind,
                    rows,
                };
                tracing::debug!(unit = %unit.name(), "unit starting");
                let driver = Driver::new(adapter.as_ref());
                let result = if kind == WorkloadKind::Select {
                    self.calibrate(&driver, kind, &mut [], rows).await
                } else {
                    match context.addresses_mut(rows) {
                        Ok(records) => self.calibrate(&driver, kind, records, rows).await,
                        Err(e) => Err(e.into()),
                    }
                };
                units.push(UnitReport::new(unit, result));
            }
        }
        SetOutcome::Ran(units)
    }

    async fn run_mock_select(&self, handles: &Backend) -> SetOutcome {
        let Some(mock) = handles.mock.clone() else {
            return SetOutcome::Failed("mocked backend has no expectation queue".to_string());
        };
        let context = self.fixtures.context();
        let adapters =
            adapters_for::<SaleReport>(handles, &self.config.table_name, self.config.orm_batch_size);

        let mut units = Vec::new();
        for rows in self.rows_for(BackendKind::Sqlmock) {
            let expectation = mock_select(&context, rows);
            for adapter in &adapters {
                let unit = WorkloadUnit {
                    backend: BackendKind::Sqlmock,
                    adapter: adapter.id(),
                    kind: WorkloadKind::Select,
                    rows,
                };
                let result = match &expectation {
                    Ok(expectation) => {
                        let driver = Driver::new(adapter.as_ref())
                            .with_mock(mock.clone(), expectation.clone());
                        self.calibrate(&driver, WorkloadKind::Select, &mut [], rows)
                            .await
                    }
                    Err(e) => Err(BenchError::Database(e.clone())),
                };
                units.push(UnitReport::new(unit, result));
            }
        }
        SetOutcome::Ran(units)
    }

    fn rows_for(&self, backend: BackendKind) -> Vec<usize> {
        self.config
            .row_counts_for(backend)
            .iter()
            .copied()
            .filter(|rows| self.filter.rows(*rows))
            .collect()
    }

    /// Grows the repetition count until a run reaches the bench time
    async fn calibrate<R: Record>(
        &self,
        driver: &Driver<'_, R>,
        kind: WorkloadKind,
        records: &mut [R],
        rows: usize,
    ) -> Result<Measurement, BenchError> {
        let target = self.config.bench_time();
        let max = self.config.max_iterations;
        let mut iterations = 1;
        loop {
            let measurement = driver.run(kind, records, rows, iterations).await?;
            if measurement.elapsed >= target || iterations >= max {
                return Ok(measurement);
            }
            iterations = next_iterations(iterations, measurement.elapsed, target, max);
        }
    }
}

/// Predicts the repetitions needed to fill `target`, with 20% headroom
///
/// Grows by at least one and at most 100x per round, never beyond `max`.
pub fn next_iterations(previous: u64, elapsed: Duration, target: Duration, max: u64) -> u64 {
    let previous = u128::from(previous.max(1));
    let predicted = target.as_nanos() * previous / elapsed.as_nanos().max(1);
    let predicted = predicted + predicted / 5;
    let next = predicted
        .clamp(previous + 1, previous * 100)
        .min(u128::from(max));
    u64::try_from(next).unwrap_or(max)
}

/// Seeds and perturbs the table a set expects
///
/// Select and update sets start from every fixture address inserted through
/// the model adapter in one committed transaction. Update sets additionally
/// perturb the records and rewind their modified markers.
pub async fn prepare_set(
    handles: &Backend,
    context: &mut FixtureContext,
    kind: WorkloadKind,
    table: &str,
) -> Result<(), BenchError> {
    if !kind.needs_seed() || handles.kind == BackendKind::Sqlmock {
        return Ok(());
    }

    let count = context.addresses().len();
    let seeder: ModelAdapter<Address> = ModelAdapter::new(handles.primary.clone(), table);
    let records = context.addresses_mut(count)?;

    let tx = handles.primary.begin_transaction().await?;
    let mut cache = StatementCache::new();
    let seeded = seeder
        .insert_batch(tx.as_executor(), &mut cache, records)
        .await
        .map_err(|source| BenchError::Adapter {
            adapter: AdapterId::Model,
            source,
        });
    let seeded = match (seeded, cache.clear().await) {
        (Ok(()), Err(e)) => Err(BenchError::from(e)),
        (seeded, _) => seeded,
    };
    match seeded {
        Ok(()) => tx.commit().await?,
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback after failed seeding failed");
            }
            return Err(e);
        }
    }
    tracing::info!(backend = %handles.kind, rows = count, table, "table seeded");

    if kind.is_update() {
        context.prepare_for_update(count)?;
    }
    Ok(())
}

/// Canned result of `rows` cycled sales, columns in binding order
pub fn mock_rows<R: Record>(records: &[R]) -> Result<QueryResult, DatabaseError> {
    let bindings = R::bindings();
    let mut result = QueryResult::new(
        bindings
            .columns()
            .into_iter()
            .map(|column| ColumnInfo::new(column, "TEXT"))
            .collect(),
    );
    for record in records {
        result.push_row(bindings.values(record, bindings.fields().iter()))?;
    }
    Ok(result)
}

/// Expectation answering one select of `rows` sales
pub fn mock_select(context: &FixtureContext, rows: usize) -> Result<MockExpectation, DatabaseError> {
    MockExpectation::query(MOCK_SELECT_PATTERN, mock_rows(&context.cycled_sales(rows))?)
}
