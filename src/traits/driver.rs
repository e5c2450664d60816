use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::types::{RawQueryResult, SqlValue};

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Connecting to the database
/// - Converting SqlValue parameters to native types
/// - Executing statements and converting results to RawQueryResult
///
/// Statements arrive already compiled for the driver's dialect; drivers never
/// inspect or rewrite SQL text.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// The SQL dialect this driver speaks. Consulted only by the statement
    /// compiler (placeholder syntax, random ordering).
    fn dialect(&self) -> Dialect;

    /// Prepare the statement, bind parameters positionally, execute, and
    /// fetch all resulting rows.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult>;

    /// Prepare, bind, and execute a statement that returns no rows.
    /// Returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Execute an unparameterized statement directly, without a prepare step.
    async fn exec_raw(&self, sql: &str) -> Result<()>;

    /// Identifier generated by the most recent INSERT on this connection.
    async fn last_insert_id(&self) -> Result<i64>;

    async fn begin(&self) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;
}
