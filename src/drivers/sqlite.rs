use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;

use crate::dialect::Dialect;
use crate::error::{FlowSqlError, Result};
use crate::traits::DatabaseDriver;
use crate::types::{RawQueryResult, SqlValue};

/// Embedded SQLite driver implementation using rusqlite.
///
/// SQLite work is blocking and runs inline on the calling task, guarded by a
/// mutex on the connection.
pub struct SqliteDriver {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDriver {
    /// Open (creating if needed) a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| FlowSqlError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FlowSqlError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| FlowSqlError::QueryFailed("connection mutex poisoned".to_string()))
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(query_failed)?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let values: Vec<Value> = params.iter().map(to_sqlite_value).collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(values))
            .map_err(query_failed)?;

        let mut result_rows = Vec::new();
        while let Some(row) = rows.next().map_err(query_failed)? {
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let cell = row.get_ref(i).map_err(query_failed)?;
                cells.push(from_sqlite_value(cell));
            }
            result_rows.push(cells);
        }

        Ok(RawQueryResult::new(columns, result_rows))
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let conn = self.lock()?;
        let values: Vec<Value> = params.iter().map(to_sqlite_value).collect();
        let affected = conn
            .execute(sql, rusqlite::params_from_iter(values))
            .map_err(query_failed)?;
        Ok(affected as u64)
    }

    async fn exec_raw(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql).map_err(query_failed)
    }

    async fn last_insert_id(&self) -> Result<i64> {
        Ok(self.lock()?.last_insert_rowid())
    }

    async fn begin(&self) -> Result<()> {
        self.lock()?.execute_batch("BEGIN").map_err(query_failed)
    }

    async fn commit(&self) -> Result<()> {
        self.lock()?.execute_batch("COMMIT").map_err(query_failed)
    }

    async fn rollback(&self) -> Result<()> {
        self.lock()?.execute_batch("ROLLBACK").map_err(query_failed)
    }
}

fn query_failed(err: rusqlite::Error) -> FlowSqlError {
    FlowSqlError::QueryFailed(err.to_string())
}

fn to_sqlite_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Int32(v) => Value::Integer(i64::from(*v)),
        SqlValue::Int64(v) => Value::Integer(*v),
        SqlValue::Float(v) => Value::Real(*v),
        SqlValue::Bool(v) => Value::Integer(i64::from(*v)),
    }
}

// Blob columns have no SqlValue counterpart and come back as Null.
fn from_sqlite_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Int64(v),
        ValueRef::Real(v) => SqlValue::Float(v),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => SqlValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_round_trip_mapping() {
        assert_eq!(to_sqlite_value(&SqlValue::Bool(true)), Value::Integer(1));
        assert_eq!(
            to_sqlite_value(&SqlValue::Text("x".to_string())),
            Value::Text("x".to_string())
        );
        assert_eq!(from_sqlite_value(ValueRef::Integer(7)), SqlValue::Int64(7));
        assert_eq!(from_sqlite_value(ValueRef::Null), SqlValue::Null);
    }
}
