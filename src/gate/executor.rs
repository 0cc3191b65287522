//! Target Database Executor
//!
//! The gate only needs "a live executable connection or tell me there is
//! none". Each allowed statement runs inside its own transaction, committed
//! or rolled back before the call returns.

use parking_lot::Mutex;
use rusqlite::Connection;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no live database connection")]
    NoConnection,
    #[error("SQL error: {0}")]
    Sql(String),
}

/// Raw execution result before it becomes a decision outcome.
#[derive(Debug, Clone)]
pub enum ExecOutput {
    /// Result-set rows as JSON objects
    Rows(Vec<Value>),
    /// Affected-row count for non-returning statements
    Affected(usize),
}

/// Connection capability consumed by the decision gate.
pub trait SqlExecutor: Send + Sync {
    fn execute(&self, sql: &str) -> Result<ExecOutput, ExecError>;
}

/// Stand-in when no target database is configured; every execution
/// reports the no-connection condition.
#[derive(Debug, Default)]
pub struct NullExecutor;

impl SqlExecutor for NullExecutor {
    fn execute(&self, _sql: &str) -> Result<ExecOutput, ExecError> {
        Err(ExecError::NoConnection)
    }
}

/// SQLite-backed executor. One statement per scoped transaction.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    pub fn open(path: &std::path::Path) -> Result<Self, ExecError> {
        let conn = Connection::open(path).map_err(|e| ExecError::Sql(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, ExecError> {
        let conn = Connection::open_in_memory().map_err(|e| ExecError::Sql(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn column_value(row: &rusqlite::Row<'_>, index: usize) -> Value {
        use rusqlite::types::ValueRef;
        match row.get_ref(index) {
            Ok(ValueRef::Null) => Value::Null,
            Ok(ValueRef::Integer(i)) => Value::from(i),
            Ok(ValueRef::Real(r)) => Value::from(r),
            Ok(ValueRef::Text(t)) => Value::from(String::from_utf8_lossy(t).into_owned()),
            Ok(ValueRef::Blob(b)) => Value::from(hex::encode(b)),
            Err(_) => Value::Null,
        }
    }
}

impl SqlExecutor for SqliteExecutor {
    fn execute(&self, sql: &str) -> Result<ExecOutput, ExecError> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| ExecError::Sql(e.to_string()))?;

        let output = {
            let mut stmt = tx.prepare(sql).map_err(|e| ExecError::Sql(e.to_string()))?;
            if stmt.column_count() > 0 {
                let columns: Vec<String> =
                    stmt.column_names().iter().map(|c| c.to_string()).collect();
                let mut rows_out = Vec::new();
                let mut rows = stmt.query([]).map_err(|e| ExecError::Sql(e.to_string()))?;
                while let Some(row) = rows.next().map_err(|e| ExecError::Sql(e.to_string()))? {
                    let mut object = serde_json::Map::new();
                    for (index, column) in columns.iter().enumerate() {
                        object.insert(column.clone(), Self::column_value(row, index));
                    }
                    rows_out.push(Value::Object(object));
                }
                ExecOutput::Rows(rows_out)
            } else {
                let affected = stmt.execute([]).map_err(|e| ExecError::Sql(e.to_string()))?;
                ExecOutput::Affected(affected)
            }
        };

        tx.commit().map_err(|e| ExecError::Sql(e.to_string()))?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_db() -> SqliteExecutor {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE customer (customer_id INTEGER PRIMARY KEY, first_name TEXT);
             INSERT INTO customer VALUES (1, 'MARY'), (2, 'PATRICIA'), (3, 'LINDA');",
        )
        .unwrap();
        SqliteExecutor::from_connection(conn)
    }

    #[test]
    fn test_select_returns_rows() {
        let executor = sample_db();
        let output = executor.execute("SELECT * FROM customer ORDER BY customer_id").unwrap();
        let ExecOutput::Rows(rows) = output else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["first_name"], "MARY");
    }

    #[test]
    fn test_non_returning_statement_reports_count() {
        let executor = sample_db();
        let output = executor
            .execute("UPDATE customer SET first_name = 'X' WHERE customer_id <= 2")
            .unwrap();
        let ExecOutput::Affected(n) = output else {
            panic!("expected affected count");
        };
        assert_eq!(n, 2);
    }

    #[test]
    fn test_invalid_sql_is_an_error_not_a_panic() {
        let executor = sample_db();
        let result = executor.execute("SELECT * FORM customer");
        assert!(matches!(result, Err(ExecError::Sql(_))));
    }

    #[test]
    fn test_failed_statement_rolls_back() {
        let executor = sample_db();
        // Violates the primary key; the transaction must roll back.
        let result = executor.execute("INSERT INTO customer VALUES (1, 'DUP')");
        assert!(result.is_err());

        let output = executor.execute("SELECT COUNT(*) AS n FROM customer").unwrap();
        let ExecOutput::Rows(rows) = output else {
            panic!("expected rows");
        };
        assert_eq!(rows[0]["n"], 3);
    }

    #[test]
    fn test_null_executor_reports_no_connection() {
        let result = NullExecutor.execute("SELECT 1");
        assert!(matches!(result, Err(ExecError::NoConnection)));
    }
}
