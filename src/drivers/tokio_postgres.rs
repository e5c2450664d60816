use async_trait::async_trait;
use tokio_postgres::{types::ToSql, Client, NoTls};
use tracing::error;

use crate::dialect::Dialect;
use crate::error::{FlowSqlError, Result};
use crate::traits::DatabaseDriver;
use crate::types::{RawQueryResult, SqlValue};

/// PostgreSQL driver implementation using tokio-postgres.
pub struct TokioPostgresDriver {
    client: Client,
}

impl TokioPostgresDriver {
    /// Connect to a PostgreSQL database.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| FlowSqlError::ConnectionFailed(e.to_string()))?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Self { client })
    }

    async fn batch(&self, sql: &str) -> Result<()> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| FlowSqlError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        let converted_params: Vec<Box<dyn ToSql + Sync + Send>> =
            params.iter().map(sql_value_to_tosql).collect();

        let param_refs: Vec<&(dyn ToSql + Sync)> = converted_params
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = self
            .client
            .query(sql, &param_refs)
            .await
            .map_err(|e| FlowSqlError::QueryFailed(e.to_string()))?;

        let columns: Vec<String> = if rows.is_empty() {
            Vec::new()
        } else {
            rows[0]
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        };

        let result_rows: Vec<Vec<SqlValue>> = rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|i| row_value(row, i))
                    .collect()
            })
            .collect();

        Ok(RawQueryResult::new(columns, result_rows))
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let converted_params: Vec<Box<dyn ToSql + Sync + Send>> =
            params.iter().map(sql_value_to_tosql).collect();

        let param_refs: Vec<&(dyn ToSql + Sync)> = converted_params
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        self.client
            .execute(sql, &param_refs)
            .await
            .map_err(|e| FlowSqlError::QueryFailed(e.to_string()))
    }

    async fn exec_raw(&self, sql: &str) -> Result<()> {
        self.batch(sql).await
    }

    /// PostgreSQL has no connection-level last-insert-id accessor; `lastval()`
    /// reports the most recent sequence value on this session.
    async fn last_insert_id(&self) -> Result<i64> {
        let row = self
            .client
            .query_one("SELECT lastval()", &[])
            .await
            .map_err(|e| FlowSqlError::QueryFailed(e.to_string()))?;
        row.try_get(0)
            .map_err(|e| FlowSqlError::QueryFailed(e.to_string()))
    }

    async fn begin(&self) -> Result<()> {
        self.batch("BEGIN").await
    }

    async fn commit(&self) -> Result<()> {
        self.batch("COMMIT").await
    }

    async fn rollback(&self) -> Result<()> {
        self.batch("ROLLBACK").await
    }
}

/// Convert a SqlValue to a boxed ToSql trait object.
fn sql_value_to_tosql(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null => Box::new(None::<String>),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Int32(i) => Box::new(*i),
        SqlValue::Int64(i) => Box::new(*i),
        SqlValue::Float(f) => Box::new(*f),
        SqlValue::Bool(b) => Box::new(*b),
    }
}

/// Convert the row value at a given index to a SqlValue by probing common
/// types.
fn row_value(row: &tokio_postgres::Row, index: usize) -> SqlValue {
    if let Ok(val) = row.try_get::<_, i32>(index) {
        return SqlValue::Int32(val);
    }

    if let Ok(val) = row.try_get::<_, i64>(index) {
        return SqlValue::Int64(val);
    }

    if let Ok(val) = row.try_get::<_, f64>(index) {
        return SqlValue::Float(val);
    }

    if let Ok(val) = row.try_get::<_, bool>(index) {
        return SqlValue::Bool(val);
    }

    if let Ok(val) = row.try_get::<_, Option<String>>(index) {
        return match val {
            Some(s) => SqlValue::Text(s),
            None => SqlValue::Null,
        };
    }

    SqlValue::Null
}
