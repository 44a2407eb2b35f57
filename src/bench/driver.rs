//! Benchmark Driver
//!
//! Runs one workload unit `iterations` times. Transactions, statement
//! preparation and mock expectations are set up before the stopwatch starts
//! and torn down after it stops; every hook runs in a paused window.

use super::hooks::{self, HookError};
use super::stopwatch::{Stopwatch, TimingError};
use super::workload::{TxPolicy, WorkloadKind};
use super::BenchError;
use crate::adapters::{Adapter, AdapterError, StatementCache};
use crate::database::{Executor, MockConnection, MockExpectation};
use crate::fixtures::FixtureError;
use crate::model::Record;
use std::sync::Arc;
use std::time::Duration;

/// Result of one driver run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurement {
    pub iterations: u64,
    /// Adapter calls made inside the window
    pub operations: u64,
    /// Running time only
    pub elapsed: Duration,
    pub paused: Duration,
    pub wall: Duration,
    pub pauses: u64,
    pub resumes: u64,
    /// Hook invocations, all made while paused
    pub hooks: u64,
}

impl Measurement {
    pub fn ns_per_op(&self) -> u128 {
        if self.iterations == 0 {
            return 0;
        }
        self.elapsed.as_nanos() / u128::from(self.iterations)
    }
}

pub struct Driver<'a, R: Record> {
    adapter: &'a dyn Adapter<R>,
    mock: Option<(Arc<MockConnection>, MockExpectation)>,
}

impl<'a, R: Record> Driver<'a, R> {
    pub fn new(adapter: &'a dyn Adapter<R>) -> Self {
        Self {
            adapter,
            mock: None,
        }
    }

    /// Re-arms `expectation` on `mock` before every operation
    pub fn with_mock(mut self, mock: Arc<MockConnection>, expectation: MockExpectation) -> Self {
        self.mock = Some((mock, expectation));
        self
    }

    /// Runs `kind` over the first `rows` records
    ///
    /// Select ignores `records`. The unit's transaction is committed or
    /// rolled back per [`WorkloadKind::tx_policy`], and always rolled back
    /// on failure.
    pub async fn run(
        &self,
        kind: WorkloadKind,
        records: &mut [R],
        rows: usize,
        iterations: u64,
    ) -> Result<Measurement, BenchError> {
        let available = records.len();
        let records: &mut [R] = if kind == WorkloadKind::Select {
            &mut []
        } else {
            records.get_mut(..rows).ok_or(FixtureError::Exhausted {
                name: "records",
                requested: rows,
                available,
            })?
        };

        let conn = self.adapter.connection();
        let policy = kind.tx_policy();
        let tx = match policy {
            TxPolicy::None => None,
            TxPolicy::Commit | TxPolicy::Rollback => Some(conn.begin_transaction().await?),
        };

        let outcome = {
            let exec = match &tx {
                Some(tx) => tx.as_executor(),
                None => conn.as_executor(),
            };
            let mut cache = StatementCache::new();
            let outcome = self
                .measure(exec, &mut cache, kind, records, rows, iterations)
                .await;
            let cleared = cache.clear().await;
            match (outcome, cleared) {
                (Ok(measurement), Ok(())) => Ok(measurement),
                (Ok(_), Err(e)) => Err(BenchError::from(e)),
                (Err(e), _) => Err(e),
            }
        };

        let Some(tx) = tx else {
            return outcome;
        };
        match (outcome, policy) {
            (Ok(measurement), TxPolicy::Commit) => {
                tx.commit().await?;
                Ok(measurement)
            }
            (Ok(measurement), _) => {
                tx.rollback().await?;
                Ok(measurement)
            }
            (Err(e), _) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback after failed unit failed");
                }
                Err(e)
            }
        }
    }

    async fn measure(
        &self,
        exec: &dyn Executor,
        cache: &mut StatementCache,
        kind: WorkloadKind,
        records: &mut [R],
        rows: usize,
        iterations: u64,
    ) -> Result<Measurement, BenchError> {
        if let Some(batch) = kind.batch_kind() {
            self.adapter
                .prepare_batch(exec, batch, cache)
                .await
                .map_err(|e| self.failed(e))?;
        }

        let mut hook_count = 0u64;
        let mut operations = 0u64;
        let mut watch = Stopwatch::start();

        for _ in 0..iterations {
            match kind {
                WorkloadKind::Select => {
                    watch.pause()?;
                    self.arm().await;
                    watch.resume()?;
                    let selected = self
                        .adapter
                        .select(exec, rows)
                        .await
                        .map_err(|e| self.failed(e))?;
                    operations += 1;
                    watch.pause()?;
                    hook(&watch, &mut hook_count, || {
                        self.check_selected(selected.len(), rows)
                    })??;
                    watch.resume()?;
                }
                WorkloadKind::Insert => {
                    for (index, record) in records.iter_mut().enumerate() {
                        watch.pause()?;
                        hook(&watch, &mut hook_count, || hooks::pre_insert(&mut *record))?;
                        self.arm().await;
                        watch.resume()?;
                        self.adapter
                            .insert(exec, record)
                            .await
                            .map_err(|e| self.failed(e))?;
                        operations += 1;
                        watch.pause()?;
                        hook(&watch, &mut hook_count, || hooks::post_insert(&*record))?
                            .map_err(|source| BenchError::Hook { index, source })?;
                        watch.resume()?;
                    }
                }
                WorkloadKind::InsertPrepared => {
                    watch.pause()?;
                    hook(&watch, &mut hook_count, || {
                        records.iter_mut().for_each(hooks::pre_insert)
                    })?;
                    self.arm().await;
                    watch.resume()?;
                    self.adapter
                        .insert_batch(exec, cache, records)
                        .await
                        .map_err(|e| self.failed(e))?;
                    operations += 1;
                    watch.pause()?;
                    hook(&watch, &mut hook_count, || {
                        check_each(&*records, hooks::post_insert)
                    })??;
                    watch.resume()?;
                }
                WorkloadKind::Update => {
                    for (index, record) in records.iter_mut().enumerate() {
                        watch.pause()?;
                        let snapshot =
                            hook(&watch, &mut hook_count, || hooks::pre_update(&*record))?;
                        self.arm().await;
                        watch.resume()?;
                        self.adapter
                            .update(exec, record)
                            .await
                            .map_err(|e| self.failed(e))?;
                        operations += 1;
                        watch.pause()?;
                        hook(&watch, &mut hook_count, || {
                            hooks::post_update(&mut *record, snapshot)
                        })?
                        .map_err(|source| BenchError::Hook { index, source })?;
                        watch.resume()?;
                    }
                }
                WorkloadKind::UpdatePrepared => {
                    watch.pause()?;
                    let snapshots: Vec<hooks::Snapshot> = hook(&watch, &mut hook_count, || {
                        records.iter().map(hooks::pre_update).collect()
                    })?;
                    self.arm().await;
                    watch.resume()?;
                    self.adapter
                        .update_batch(exec, cache, records)
                        .await
                        .map_err(|e| self.failed(e))?;
                    operations += 1;
                    watch.pause()?;
                    hook(&watch, &mut hook_count, || {
                        for (index, (record, snapshot)) in
                            records.iter_mut().zip(snapshots).enumerate()
                        {
                            hooks::post_update(record, snapshot)
                                .map_err(|source| BenchError::Hook { index, source })?;
                        }
                        Ok::<(), BenchError>(())
                    })??;
                    watch.resume()?;
                }
            }
        }

        let totals = watch.stop();
        if let Some((mock, _)) = &self.mock {
            mock.expectations_met().await?;
        }

        Ok(Measurement {
            iterations,
            operations,
            elapsed: totals.running,
            paused: totals.paused,
            wall: totals.wall,
            pauses: totals.pauses,
            resumes: totals.resumes,
            hooks: hook_count,
        })
    }

    /// Queues the canned response for the next operation
    async fn arm(&self) {
        if let Some((mock, expectation)) = &self.mock {
            mock.expect(expectation.clone()).await;
        }
    }

    /// The mock always answers `rows`; a live table may hold fewer
    fn check_selected(&self, returned: usize, expected: usize) -> Result<(), BenchError> {
        let exact = self.mock.is_some();
        if returned > expected || (exact && returned != expected) {
            return Err(BenchError::RowCount { returned, expected });
        }
        Ok(())
    }

    fn failed(&self, source: AdapterError) -> BenchError {
        BenchError::Adapter {
            adapter: self.adapter.id(),
            source,
        }
    }
}

/// Runs a hook body, refusing to do so inside running time
fn hook<T>(watch: &Stopwatch, count: &mut u64, body: impl FnOnce() -> T) -> Result<T, TimingError> {
    watch.ensure_paused()?;
    *count += 1;
    Ok(body())
}

fn check_each<R>(
    records: &[R],
    check: impl Fn(&R) -> Result<(), HookError>,
) -> Result<(), BenchError> {
    for (index, record) in records.iter().enumerate() {
        check(record).map_err(|source| BenchError::Hook { index, source })?;
    }
    Ok(())
}
