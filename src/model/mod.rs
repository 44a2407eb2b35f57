//! Record types moved through the adapters
//!
//! Every record type carries a static [`FieldBindings`] table describing its
//! columns; everything an adapter needs to build SQL or map rows comes from it.

use crate::database::types::Value;

/// Builds a [`FieldBinding`] for a struct field of a known kind
macro_rules! field {
    ($record:ty, $column:literal, $role:expr, $field:ident: int) => {
        $crate::model::FieldBinding::<$record> {
            column: $column,
            role: $role,
            get: |r| $crate::database::types::Value::Int(r.$field),
            set: |r, v| {
                r.$field = $crate::model::binding::int_field($column, v)?;
                Ok(())
            },
        }
    };
    ($record:ty, $column:literal, $role:expr, $field:ident: text) => {
        $crate::model::FieldBinding::<$record> {
            column: $column,
            role: $role,
            get: |r| $crate::database::types::Value::String(r.$field.clone()),
            set: |r, v| {
                r.$field = $crate::model::binding::text_field($column, v)?;
                Ok(())
            },
        }
    };
    ($record:ty, $column:literal, $role:expr, $field:ident: marker) => {
        $crate::model::FieldBinding::<$record> {
            column: $column,
            role: $role,
            get: |r| r.$field.to_value(),
            set: |r, v| {
                r.$field = $crate::model::binding::marker_field($column, v)?;
                Ok(())
            },
        }
    };
}

pub mod address;
pub mod binding;
pub mod sale;
pub mod timestamp;

pub use address::Address;
pub use binding::{FieldBinding, FieldBindings, FieldRole};
pub use sale::SaleReport;
pub use timestamp::Timestamp;

/// Row mapping failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("no field bound to column {0}")]
    UnknownColumn(String),

    #[error("row has {actual} values, expected {expected}")]
    Arity { expected: usize, actual: usize },

    #[error("column {column}: invalid timestamp {value}")]
    InvalidTimestamp { column: &'static str, value: String },
}

/// A row type with identity and server-assigned markers
pub trait Record: Default + Clone + Send + Sync + 'static {
    fn bindings() -> &'static FieldBindings<Self>;

    fn id(&self) -> i64;
    fn created(&self) -> Timestamp;
    fn modified(&self) -> Timestamp;
    fn set_modified(&mut self, marker: Timestamp);

    /// Resets identity and both markers to their "not assigned" values
    fn clear_generated(&mut self);

    /// Alters every data field so an UPDATE writes new values
    fn perturb(&mut self);

    /// Decodes a full row in binding order
    fn from_values(row: Vec<Value>) -> Result<Self, MappingError> {
        let bindings = Self::bindings();
        let mut record = Self::default();
        bindings.apply_positional(&mut record, bindings.fields().iter(), row)?;
        Ok(record)
    }

    /// Applies the `RETURNING` row of an insert (key, created, modified)
    fn apply_inserted(&mut self, row: Vec<Value>) -> Result<(), MappingError> {
        let bindings = Self::bindings();
        bindings.apply_positional(self, bindings.returned_on_insert(), row)
    }

    /// Applies the `RETURNING` row of an update (created, modified)
    fn apply_updated(&mut self, row: Vec<Value>) -> Result<(), MappingError> {
        let bindings = Self::bindings();
        bindings.apply_positional(self, bindings.returned_on_update(), row)
    }

    /// Data values in binding order
    fn writable_values(&self) -> Vec<Value> {
        let bindings = Self::bindings();
        bindings.values(self, bindings.writable())
    }

    fn rewind_modified(&mut self, by: chrono::Duration) {
        let rewound = self.modified().rewind(by);
        self.set_modified(rewound);
    }
}
