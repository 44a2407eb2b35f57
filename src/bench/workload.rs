//! Workload descriptors

use crate::adapters::{AdapterId, BatchKind};
use crate::database::{BackendKind, DatabaseError};
use std::fmt;
use std::str::FromStr;

/// Workload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Select,
    Insert,
    InsertPrepared,
    Update,
    UpdatePrepared,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 5] = [
        WorkloadKind::Select,
        WorkloadKind::Insert,
        WorkloadKind::InsertPrepared,
        WorkloadKind::Update,
        WorkloadKind::UpdatePrepared,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Select => "select",
            WorkloadKind::Insert => "insert",
            WorkloadKind::InsertPrepared => "insert-prepared",
            WorkloadKind::Update => "update",
            WorkloadKind::UpdatePrepared => "update-prepared",
        }
    }

    /// Set name suffix in reports (`LibpqPreparedInsert`, ...)
    pub fn set_name(&self) -> &'static str {
        match self {
            WorkloadKind::Select => "Select",
            WorkloadKind::Insert => "Insert",
            WorkloadKind::InsertPrepared => "PreparedInsert",
            WorkloadKind::Update => "Update",
            WorkloadKind::UpdatePrepared => "PreparedUpdate",
        }
    }

    /// Transaction wrapped around a unit
    pub fn tx_policy(&self) -> TxPolicy {
        match self {
            WorkloadKind::Select | WorkloadKind::Insert => TxPolicy::None,
            WorkloadKind::InsertPrepared => TxPolicy::Commit,
            WorkloadKind::Update | WorkloadKind::UpdatePrepared => TxPolicy::Rollback,
        }
    }

    /// Batch flavour of the prepared variants
    pub fn batch_kind(&self) -> Option<BatchKind> {
        match self {
            WorkloadKind::InsertPrepared => Some(BatchKind::Insert),
            WorkloadKind::UpdatePrepared => Some(BatchKind::Update),
            _ => None,
        }
    }

    /// Whether the set expects rows already in the table
    pub fn needs_seed(&self) -> bool {
        matches!(
            self,
            WorkloadKind::Select | WorkloadKind::Update | WorkloadKind::UpdatePrepared
        )
    }

    pub fn is_update(&self) -> bool {
        matches!(self, WorkloadKind::Update | WorkloadKind::UpdatePrepared)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "select" => Ok(WorkloadKind::Select),
            "insert" => Ok(WorkloadKind::Insert),
            "insert-prepared" | "prepared-insert" => Ok(WorkloadKind::InsertPrepared),
            "update" => Ok(WorkloadKind::Update),
            "update-prepared" | "prepared-update" => Ok(WorkloadKind::UpdatePrepared),
            other => Err(DatabaseError::ConfigurationError(format!(
                "unknown workload: {}",
                other
            ))),
        }
    }
}

/// What happens to the unit's transaction after timing stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPolicy {
    /// Statements autocommit on the adapter's connection
    None,
    Commit,
    Rollback,
}

/// One cell of the row-count x adapter matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadUnit {
    pub backend: BackendKind,
    pub adapter: AdapterId,
    pub kind: WorkloadKind,
    pub rows: usize,
}

impl WorkloadUnit {
    /// `<Set>/<adapter> <workload> <rows> row(s)`
    pub fn name(&self) -> String {
        format!(
            "{}/{} {} {} row(s)",
            set_name(self.backend, self.kind),
            self.adapter,
            self.kind,
            self.rows
        )
    }
}

/// `LibpqSelect`, `SqliteInsert`, `SqlmockSelect`, ...
pub fn set_name(backend: BackendKind, kind: WorkloadKind) -> String {
    format!("{}{}", backend.set_prefix(), kind.set_name())
}
