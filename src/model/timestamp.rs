//! Opaque created/modified marker

use super::MappingError;
use crate::database::types::Value;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

const TEXT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Server-assigned marker. Only compared for equality and order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(Option<DateTime<Utc>>);

impl Timestamp {
    /// The "not yet assigned" marker
    pub const UNSET: Timestamp = Timestamp(None);

    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Some(at))
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// Moves the marker back by `by`; an unset marker stays unset
    pub fn rewind(&self, by: Duration) -> Self {
        Self(self.0.map(|at| at - by))
    }

    /// Decodes the driver representations: native timestamps, `YYYY-MM-DD HH:MM:SS[.fff]`
    /// text (SQLite defaults), RFC 3339 text and unix seconds.
    pub fn from_value(column: &'static str, value: Value) -> Result<Self, MappingError> {
        match value {
            Value::Null => Ok(Self::UNSET),
            Value::DateTime(at) => Ok(Self::new(at)),
            Value::String(text) => Self::parse(&text).ok_or_else(|| MappingError::InvalidTimestamp {
                column,
                value: text,
            }),
            Value::Int(secs) => DateTime::from_timestamp(secs, 0)
                .map(Self::new)
                .ok_or_else(|| MappingError::InvalidTimestamp {
                    column,
                    value: secs.to_string(),
                }),
            other => Err(MappingError::TypeMismatch {
                column,
                expected: "timestamp",
                actual: other.type_name(),
            }),
        }
    }

    fn parse(text: &str) -> Option<Self> {
        for format in TEXT_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Some(Self::new(naive.and_utc()));
            }
        }
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|at| Self::new(at.with_timezone(&Utc)))
    }

    pub fn to_value(&self) -> Value {
        match self.0 {
            Some(at) => Value::DateTime(at),
            None => Value::Null,
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(at) => write!(f, "{}", at.to_rfc3339()),
            None => write!(f, "unset"),
        }
    }
}
