//! Query builders
//!
//! SELECT / INSERT / UPDATE statements assembled from parts, with placeholders rendered
//! for the target dialect. Builders return the SQL text together with the ordered
//! arguments to bind.

use super::types::{DatabaseError, Dialect, Value};

/// SELECT builder
///
/// Only the projection and a row limit; benchmark selects never filter.
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    limit: Option<usize>,
}

impl SelectBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            limit: None,
        }
    }

    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns = columns.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// An empty projection selects `*`
    pub fn build(self) -> String {
        let projection = match self.columns.is_empty() {
            true => "*".to_string(),
            false => self.columns.join(", "),
        };
        match self.limit {
            Some(limit) => format!("SELECT {} FROM {} LIMIT {}", projection, self.table, limit),
            None => format!("SELECT {} FROM {}", projection, self.table),
        }
    }
}

/// INSERT builder
///
/// Multiple `values` calls produce a multi-row `VALUES` list.
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    suffix: Option<String>,
    dialect: Dialect,
}

impl InsertBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            suffix: None,
            dialect: Dialect::Sqlite,
        }
    }

    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns = columns.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn values(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    pub fn placeholder_format(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn build(self) -> Result<(String, Vec<Value>), DatabaseError> {
        if self.columns.is_empty() {
            return Err(DatabaseError::ValidationError(format!(
                "insert into {} has no columns",
                self.table
            )));
        }
        if self.rows.is_empty() {
            return Err(DatabaseError::ValidationError(format!(
                "insert into {} has no values",
                self.table
            )));
        }

        let width = self.columns.len();
        let mut groups = Vec::with_capacity(self.rows.len());
        let mut args = Vec::with_capacity(self.rows.len() * width);
        for row in self.rows {
            if row.len() != width {
                return Err(DatabaseError::ValidationError(format!(
                    "insert into {} has {} columns but {} values",
                    self.table,
                    width,
                    row.len()
                )));
            }
            groups.push(format!(
                "({})",
                self.dialect.placeholders(args.len() + 1, width)
            ));
            args.extend(row);
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            self.columns.join(", "),
            groups.join(", ")
        );
        if let Some(suffix) = self.suffix {
            sql.push(' ');
            sql.push_str(&suffix);
        }

        Ok((sql, args))
    }
}

/// UPDATE builder
pub struct UpdateBuilder {
    table: String,
    sets: Vec<(String, Value)>,
    raw_sets: Vec<(String, String)>,
    conditions: Vec<(String, Value)>,
    suffix: Option<String>,
    dialect: Dialect,
}

impl UpdateBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            sets: Vec::new(),
            raw_sets: Vec::new(),
            conditions: Vec::new(),
            suffix: None,
            dialect: Dialect::Sqlite,
        }
    }

    pub fn set(mut self, column: &str, value: Value) -> Self {
        self.sets.push((column.to_string(), value));
        self
    }

    /// Assigns an SQL expression instead of a bound value
    pub fn set_expr(mut self, column: &str, expr: &str) -> Self {
        self.raw_sets.push((column.to_string(), expr.to_string()));
        self
    }

    /// Adds an equality condition; conditions are joined with AND
    pub fn where_eq(mut self, column: &str, value: Value) -> Self {
        self.conditions.push((column.to_string(), value));
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    pub fn placeholder_format(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn build(self) -> Result<(String, Vec<Value>), DatabaseError> {
        if self.sets.is_empty() {
            return Err(DatabaseError::ValidationError(format!(
                "update {} has no SET clauses",
                self.table
            )));
        }

        let mut args = Vec::with_capacity(self.sets.len() + self.conditions.len());
        let mut assignments = Vec::with_capacity(self.sets.len());
        for (column, value) in self.sets {
            args.push(value);
            assignments.push(format!("{} = {}", column, self.dialect.placeholder(args.len())));
        }
        for (column, expr) in self.raw_sets {
            assignments.push(format!("{} = {}", column, expr));
        }

        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));

        if !self.conditions.is_empty() {
            let mut predicates = Vec::with_capacity(self.conditions.len());
            for (column, value) in self.conditions {
                args.push(value);
                predicates.push(format!("{} = {}", column, self.dialect.placeholder(args.len())));
            }
            sql.push_str(&format!(" WHERE {}", predicates.join(" AND ")));
        }

        if let Some(suffix) = self.suffix {
            sql.push(' ');
            sql.push_str(&suffix);
        }

        Ok((sql, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_builder() {
        let sql = SelectBuilder::new("sqlh_addresses")
            .columns(&["pk", "street"])
            .limit(50)
            .build();
        assert_eq!(sql, "SELECT pk, street FROM sqlh_addresses LIMIT 50");
        assert_eq!(SelectBuilder::new("t").build(), "SELECT * FROM t");
    }

    #[test]
    fn test_insert_builder_dollar_placeholders() {
        let (sql, args) = InsertBuilder::new("sqlh_addresses")
            .columns(&["street", "city"])
            .values(vec!["Main".into(), "Springfield".into()])
            .suffix("RETURNING pk")
            .placeholder_format(Dialect::Postgres)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO sqlh_addresses (street, city) VALUES ($1, $2) RETURNING pk"
        );
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_insert_builder_multi_row() {
        let (sql, args) = InsertBuilder::new("t")
            .columns(&["a", "b"])
            .values(vec![Value::Int(1), Value::Int(2)])
            .values(vec![Value::Int(3), Value::Int(4)])
            .placeholder_format(Dialect::Postgres)
            .build()
            .unwrap();
        assert_eq!(sql, "INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn test_insert_builder_rejects_ragged_rows() {
        let result = InsertBuilder::new("t")
            .columns(&["a", "b"])
            .values(vec![Value::Int(1)])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_update_builder_question_placeholders() {
        let (sql, args) = UpdateBuilder::new("t")
            .set("street", "Elm".into())
            .set("city", "Shelbyville".into())
            .where_eq("pk", Value::Int(9))
            .suffix("RETURNING modified_tmz")
            .placeholder_format(Dialect::Sqlite)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE t SET street = ?, city = ? WHERE pk = ? RETURNING modified_tmz"
        );
        assert_eq!(args.last(), Some(&Value::Int(9)));
    }

    #[test]
    fn test_update_builder_expression_set() {
        let (sql, args) = UpdateBuilder::new("t")
            .set("zip", "62701".into())
            .set_expr("modified_tmz", "CURRENT_TIMESTAMP")
            .where_eq("pk", Value::Int(2))
            .placeholder_format(Dialect::Postgres)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE t SET zip = $1, modified_tmz = CURRENT_TIMESTAMP WHERE pk = $2"
        );
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_update_builder_requires_set() {
        assert!(UpdateBuilder::new("t").where_eq("pk", Value::Int(1)).build().is_err());
    }
}
