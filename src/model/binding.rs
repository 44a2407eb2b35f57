//! Declarative field-binding tables
//!
//! Each record type declares, once, which column every field maps to and what
//! role it plays. Adapters derive SQL and row mapping from the table instead of
//! inspecting the type at run time.

use super::{MappingError, Timestamp};
use crate::database::types::{ColumnInfo, Value};
use std::collections::HashMap;

/// Role of a field in generated statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Server-assigned identity, returned on insert and used as the update key
    Key,
    /// Set by the store on insert, never written by clients
    CreatedMarker,
    /// Set by the store on insert and advanced on every update
    ModifiedMarker,
    /// Client-written data
    Data,
}

impl FieldRole {
    pub fn returned_on_insert(&self) -> bool {
        !matches!(self, FieldRole::Data)
    }

    pub fn returned_on_update(&self) -> bool {
        matches!(self, FieldRole::CreatedMarker | FieldRole::ModifiedMarker)
    }
}

/// One column binding
pub struct FieldBinding<R> {
    pub column: &'static str,
    pub role: FieldRole,
    pub get: fn(&R) -> Value,
    pub set: fn(&mut R, Value) -> Result<(), MappingError>,
}

/// Binding table of a record type, in declaration order
pub struct FieldBindings<R> {
    fields: Vec<FieldBinding<R>>,
    by_column: HashMap<&'static str, usize>,
}

impl<R> FieldBindings<R> {
    pub fn new(fields: Vec<FieldBinding<R>>) -> Self {
        let by_column = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.column, idx))
            .collect();
        Self { fields, by_column }
    }

    pub fn fields(&self) -> &[FieldBinding<R>] {
        &self.fields
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.column).collect()
    }

    pub fn lookup(&self, column: &str) -> Option<&FieldBinding<R>> {
        self.by_column.get(column).map(|&idx| &self.fields[idx])
    }

    pub fn key(&self) -> Option<&FieldBinding<R>> {
        self.fields.iter().find(|f| f.role == FieldRole::Key)
    }

    /// Fields written by INSERT and UPDATE statements
    pub fn writable(&self) -> impl Iterator<Item = &FieldBinding<R>> {
        self.fields.iter().filter(|f| f.role == FieldRole::Data)
    }

    pub fn returned_on_insert(&self) -> impl Iterator<Item = &FieldBinding<R>> {
        self.fields.iter().filter(|f| f.role.returned_on_insert())
    }

    pub fn returned_on_update(&self) -> impl Iterator<Item = &FieldBinding<R>> {
        self.fields.iter().filter(|f| f.role.returned_on_update())
    }

    /// Assigns `row` to `fields` by position
    pub fn apply_positional<'a>(
        &'a self,
        record: &mut R,
        fields: impl Iterator<Item = &'a FieldBinding<R>>,
        row: Vec<Value>,
    ) -> Result<(), MappingError>
    where
        R: 'a,
    {
        let fields: Vec<&FieldBinding<R>> = fields.collect();
        if fields.len() != row.len() {
            return Err(MappingError::Arity {
                expected: fields.len(),
                actual: row.len(),
            });
        }
        for (field, value) in fields.into_iter().zip(row) {
            (field.set)(record, value)?;
        }
        Ok(())
    }

    /// Assigns `row` to the fields named by `columns`
    pub fn apply_named(
        &self,
        record: &mut R,
        columns: &[ColumnInfo],
        row: Vec<Value>,
    ) -> Result<(), MappingError> {
        if columns.len() != row.len() {
            return Err(MappingError::Arity {
                expected: columns.len(),
                actual: row.len(),
            });
        }
        for (column, value) in columns.iter().zip(row) {
            let field = self
                .lookup(&column.name)
                .ok_or_else(|| MappingError::UnknownColumn(column.name.clone()))?;
            (field.set)(record, value)?;
        }
        Ok(())
    }

    pub fn decode_named(&self, columns: &[ColumnInfo], row: Vec<Value>) -> Result<R, MappingError>
    where
        R: Default,
    {
        let mut record = R::default();
        self.apply_named(&mut record, columns, row)?;
        Ok(record)
    }

    pub fn values<'a>(
        &'a self,
        record: &R,
        fields: impl Iterator<Item = &'a FieldBinding<R>>,
    ) -> Vec<Value>
    where
        R: 'a,
    {
        fields.map(|f| (f.get)(record)).collect()
    }
}

pub fn int_field(column: &'static str, value: Value) -> Result<i64, MappingError> {
    match value {
        Value::Int(i) => Ok(i),
        Value::String(ref s) => s.parse().map_err(|_| MappingError::TypeMismatch {
            column,
            expected: "int",
            actual: "string",
        }),
        other => Err(MappingError::TypeMismatch {
            column,
            expected: "int",
            actual: other.type_name(),
        }),
    }
}

pub fn text_field(column: &'static str, value: Value) -> Result<String, MappingError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(MappingError::TypeMismatch {
            column,
            expected: "string",
            actual: other.type_name(),
        }),
    }
}

pub fn marker_field(column: &'static str, value: Value) -> Result<Timestamp, MappingError> {
    Timestamp::from_value(column, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Pair {
        id: i64,
        name: String,
    }

    fn bindings() -> FieldBindings<Pair> {
        FieldBindings::new(vec![
            FieldBinding {
                column: "pk",
                role: FieldRole::Key,
                get: |p| Value::Int(p.id),
                set: |p, v| {
                    p.id = int_field("pk", v)?;
                    Ok(())
                },
            },
            FieldBinding {
                column: "name",
                role: FieldRole::Data,
                get: |p| Value::String(p.name.clone()),
                set: |p, v| {
                    p.name = text_field("name", v)?;
                    Ok(())
                },
            },
        ])
    }

    #[test]
    fn test_decode_named_ignores_column_order() {
        let table = bindings();
        let columns = vec![ColumnInfo::new("name", "TEXT"), ColumnInfo::new("pk", "INT8")];
        let pair = table
            .decode_named(&columns, vec![Value::from("x"), Value::Int(4)])
            .unwrap();
        assert_eq!(pair.id, 4);
        assert_eq!(pair.name, "x");
    }

    #[test]
    fn test_unknown_column() {
        let table = bindings();
        let columns = vec![ColumnInfo::new("nope", "TEXT")];
        assert!(matches!(
            table.decode_named(&columns, vec![Value::from("x")]),
            Err(MappingError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_positional_arity() {
        let table = bindings();
        let mut pair = Pair::default();
        let result = table.apply_positional(&mut pair, table.returned_on_insert(), vec![]);
        assert!(matches!(result, Err(MappingError::Arity { expected: 1, actual: 0 })));
    }

    #[test]
    fn test_roles() {
        let table = bindings();
        assert_eq!(table.key().map(|f| f.column), Some("pk"));
        assert_eq!(table.writable().map(|f| f.column).collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(table.returned_on_update().count(), 0);
    }
}
