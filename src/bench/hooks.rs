//! Correctness Hooks
//!
//! Pre/post checks around every measured operation. They only read and
//! restore record state; they never change what an adapter sends.

use crate::model::{Record, Timestamp};

/// A failed post-condition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("identity {0} was not assigned by the store")]
    IdentityNotAssigned(i64),

    #[error("{0} marker is unset")]
    MarkerUnset(&'static str),

    #[error("created marker {created} is after modified marker {modified}")]
    MarkerOrder {
        created: Timestamp,
        modified: Timestamp,
    },

    #[error("modified marker did not advance past {before} (got {after})")]
    NotAdvanced { before: Timestamp, after: Timestamp },

    #[error("created marker changed from {before} to {after}")]
    CreatedChanged { before: Timestamp, after: Timestamp },
}

/// Markers captured by [`pre_update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    created: Timestamp,
    modified: Timestamp,
}

impl Snapshot {
    pub fn modified(&self) -> Timestamp {
        self.modified
    }
}

/// Resets identity and markers so the insert assigns them again
pub fn pre_insert<R: Record>(record: &mut R) {
    record.clear_generated();
}

pub fn post_insert<R: Record>(record: &R) -> Result<(), HookError> {
    if record.id() <= 0 {
        return Err(HookError::IdentityNotAssigned(record.id()));
    }
    let created = record.created();
    let modified = record.modified();
    if !created.is_set() {
        return Err(HookError::MarkerUnset("created"));
    }
    if !modified.is_set() {
        return Err(HookError::MarkerUnset("modified"));
    }
    if created > modified {
        return Err(HookError::MarkerOrder { created, modified });
    }
    Ok(())
}

pub fn pre_update<R: Record>(record: &R) -> Snapshot {
    Snapshot {
        created: record.created(),
        modified: record.modified(),
    }
}

/// Checks the update advanced the modified marker and left created alone,
/// then puts the snapshot marker back so the next repetition sees the same baseline.
pub fn post_update<R: Record>(record: &mut R, snapshot: Snapshot) -> Result<(), HookError> {
    let after = record.modified();
    if after <= snapshot.modified {
        return Err(HookError::NotAdvanced {
            before: snapshot.modified,
            after,
        });
    }
    if record.created() != snapshot.created {
        return Err(HookError::CreatedChanged {
            before: snapshot.created,
            after: record.created(),
        });
    }
    record.set_modified(snapshot.modified);
    Ok(())
}
