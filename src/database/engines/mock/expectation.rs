//! Mock expectations
//!
//! An expectation pairs a statement pattern with the canned response the
//! mocked driver returns when the next statement matches it.

use crate::database::types::{DatabaseError, ExecuteResult, QueryResult};
use regex::Regex;

/// Canned response for a matched statement
///
/// Owned outright: queuing a clone copies the row set, and answering a
/// statement moves it out.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Rows(QueryResult),
    Exec(ExecuteResult),
    Error(DatabaseError),
}

/// One registered expectation
#[derive(Debug, Clone)]
pub struct MockExpectation {
    pattern: Regex,
    response: MockResponse,
}

impl MockExpectation {
    /// Expect a row-returning statement matching `pattern`
    pub fn query(pattern: &str, rows: QueryResult) -> Result<Self, DatabaseError> {
        Self::new(pattern, MockResponse::Rows(rows))
    }

    /// Expect a command matching `pattern`
    pub fn exec(pattern: &str, result: ExecuteResult) -> Result<Self, DatabaseError> {
        Self::new(pattern, MockResponse::Exec(result))
    }

    /// Expect a statement matching `pattern` and fail it with `error`
    pub fn error(pattern: &str, error: DatabaseError) -> Result<Self, DatabaseError> {
        Self::new(pattern, MockResponse::Error(error))
    }

    fn new(pattern: &str, response: MockResponse) -> Result<Self, DatabaseError> {
        let pattern = Regex::new(pattern).map_err(|e| {
            DatabaseError::ConfigurationError(format!("invalid mock pattern {}: {}", pattern, e))
        })?;
        Ok(Self { pattern, response })
    }

    pub fn matches(&self, sql: &str) -> bool {
        self.pattern.is_match(sql)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub(crate) fn into_response(self) -> MockResponse {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        let expectation = MockExpectation::query("(?i)^select +", QueryResult::default()).unwrap();
        assert!(expectation.matches("select * from sales_report"));
        assert!(expectation.matches("SELECT pk FROM t"));
        assert!(!expectation.matches("update t set a = 1"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = MockExpectation::exec("(unclosed", ExecuteResult::default());
        assert!(matches!(result, Err(DatabaseError::ConfigurationError(_))));
    }
}
