//! Benchmark protocol
//!
//! Stopwatch, correctness hooks, workload descriptors, the per-unit driver and
//! the calibrating runner that walks the backend x workload x rows x adapter matrix.

use crate::adapters::{AdapterError, AdapterId};
use crate::database::DatabaseError;
use crate::fixtures::FixtureError;

pub mod driver;
pub mod hooks;
pub mod runner;
pub mod stopwatch;
pub mod workload;

pub use driver::{Driver, Measurement};
pub use hooks::{HookError, Snapshot};
pub use runner::{prepare_set, Filter, Harness, SetOutcome, SetReport, UnitOutcome, UnitReport};
pub use stopwatch::{Stopwatch, TimingError, WindowTotals};
pub use workload::{TxPolicy, WorkloadKind, WorkloadUnit};

/// A failed unit (or set preparation)
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("adapter {adapter}: {source}")]
    Adapter {
        adapter: AdapterId,
        #[source]
        source: AdapterError,
    },

    #[error("record {index}: {source}")]
    Hook {
        index: usize,
        #[source]
        source: HookError,
    },

    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("select returned {returned} row(s), expected {expected}")]
    RowCount { returned: usize, expected: usize },
}
