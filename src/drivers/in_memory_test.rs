use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::{FlowSqlError, Result};
use crate::traits::DatabaseDriver;
use crate::types::{RawQueryResult, SqlValue};

/// A recorded statement execution for verification. Transaction control
/// statements are recorded as `BEGIN` / `COMMIT` / `ROLLBACK` with no
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// An in-memory database driver for testing.
///
/// Allows configuring expected responses and verifying executed statements.
/// Speaks the SQLite dialect by default, so compiled SQL keeps its `?`
/// placeholders verbatim; use `with_dialect` to exercise PostgreSQL
/// finalization.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use flowsql::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
///
/// let driver = Arc::new(
///     InMemoryTestDriver::new().with_response(
///         InMemoryTestResponseBuilder::new()
///             .columns(&["id", "name"])
///             .row(&["1", "Alice"])
///             .build(),
///     ),
/// );
/// ```
pub struct InMemoryTestDriver {
    responses: Mutex<VecDeque<RawQueryResult>>,
    errors: Mutex<VecDeque<String>>,
    recorded_queries: Mutex<Vec<RecordedQuery>>,
    default_response: RawQueryResult,
    rows_affected: u64,
    last_insert_id: i64,
    dialect: Dialect,
}

impl InMemoryTestDriver {
    /// Create a new in-memory test driver with no pre-configured responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            errors: Mutex::new(VecDeque::new()),
            recorded_queries: Mutex::new(Vec::new()),
            default_response: RawQueryResult::empty(),
            rows_affected: 0,
            last_insert_id: 0,
            dialect: Dialect::Sqlite,
        }
    }

    /// Add a response to be returned by the next query.
    /// Responses are returned in FIFO order.
    pub fn with_response(self, response: RawQueryResult) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Add multiple responses to be returned by subsequent queries.
    pub fn with_responses(self, responses: impl IntoIterator<Item = RawQueryResult>) -> Self {
        let mut queue = self.responses.lock().unwrap();
        for response in responses {
            queue.push_back(response);
        }
        drop(queue);
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: RawQueryResult) -> Self {
        self.default_response = response;
        self
    }

    /// Queue an error; the next `query` or `execute` call fails with it
    /// instead of producing a response.
    pub fn with_error(self, message: &str) -> Self {
        self.errors.lock().unwrap().push_back(message.to_string());
        self
    }

    /// Set the rows-affected count reported by `execute`.
    pub fn with_rows_affected(mut self, rows_affected: u64) -> Self {
        self.rows_affected = rows_affected;
        self
    }

    /// Set the identifier reported by `last_insert_id`.
    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = id;
        self
    }

    /// Set the dialect this driver reports to the compiler.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Get all recorded statements that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.recorded_queries.lock().unwrap().clone()
    }

    /// Get the last recorded statement, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.recorded_queries.lock().unwrap().last().cloned()
    }

    /// Clear all recorded statements.
    pub fn clear_recorded_queries(&self) {
        self.recorded_queries.lock().unwrap().clear();
    }

    /// Assert that the last statement matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n statements were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.recorded_queries.lock().unwrap().len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    fn record(&self, sql: &str, params: &[SqlValue]) {
        self.recorded_queries.lock().unwrap().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }

    fn take_error(&self) -> Option<FlowSqlError> {
        self.errors
            .lock()
            .unwrap()
            .pop_front()
            .map(FlowSqlError::QueryFailed)
    }
}

impl Default for InMemoryTestDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for InMemoryTestDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        self.record(sql, params);

        if let Some(err) = self.take_error() {
            return Err(err);
        }

        // Return next queued response or default
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());

        Ok(response)
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.record(sql, params);

        if let Some(err) = self.take_error() {
            return Err(err);
        }

        Ok(self.rows_affected)
    }

    async fn exec_raw(&self, sql: &str) -> Result<()> {
        self.record(sql, &[]);
        Ok(())
    }

    async fn last_insert_id(&self) -> Result<i64> {
        Ok(self.last_insert_id)
    }

    async fn begin(&self) -> Result<()> {
        self.record("BEGIN", &[]);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.record("COMMIT", &[]);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.record("ROLLBACK", &[]);
        Ok(())
    }
}

/// Builder for creating test responses easily.
pub struct InMemoryTestResponseBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of text values.
    pub fn row(mut self, values: &[&str]) -> Self {
        self.rows
            .push(values.iter().map(|s| SqlValue::from(*s)).collect());
        self
    }

    /// Add a row of typed values.
    pub fn row_values(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    /// Build the RawQueryResult.
    pub fn build(self) -> RawQueryResult {
        RawQueryResult::new(self.columns, self.rows)
    }
}

impl Default for InMemoryTestResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
