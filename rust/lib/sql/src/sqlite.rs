use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::info;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
///
/// The connection lives behind a mutex, so every statement is serialized.
/// After [`SqliteStore::close`] all calls fail with [`SQLError::Connection`].
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path).map_err(|e| SQLError::Connection(e.to_string()))?;

        // WAL for concurrent readers; wait on a locked file instead of failing at once.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        info!("sqlite store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) -> Result<(), SQLError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        if let Some(conn) = guard.take() {
            conn.close()
                .map_err(|(_, e)| SQLError::Connection(e.to_string()))?;
            info!("sqlite store closed");
        }
        Ok(())
    }

    /// Whether [`SqliteStore::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.conn.lock().map(|g| g.is_none()).unwrap_or(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, SQLError> {
        self.conn
            .lock()
            .map_err(|e| SQLError::Connection(e.to_string()))
    }
}

fn closed() -> SQLError {
    SQLError::Connection("database is closed".into())
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<&dyn rusqlite::types::ToSql> {
    params
        .iter()
        .map(|v| -> &dyn rusqlite::types::ToSql {
            match v {
                Value::Null => &rusqlite::types::Null,
                Value::Integer(i) => i,
                Value::Real(f) => f,
                Value::Text(s) => s,
                Value::Blob(b) => b,
            }
        })
        .collect()
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(closed)?;

        let mut stmt = conn.prepare(sql).map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> =
            stmt.column_names().iter().map(|s| s.to_string()).collect();

        let rows = stmt
            .query_map(bind_params(params).as_slice(), |row| {
                let mut columns = Vec::with_capacity(column_names.len());
                for (i, name) in column_names.iter().enumerate() {
                    columns.push((name.clone(), row_value_at(row, i)?));
                }
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| SQLError::Query(e.to_string()))
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(closed)?;

        let affected = conn
            .execute(sql, bind_params(params).as_slice())
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        Ok(affected as u64)
    }

    fn exec_batch(&self, sql: &str) -> Result<(), SQLError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(closed)?;
        conn.execute_batch(sql)
            .map_err(|e| SQLError::Execution(e.to_string()))
    }
}

/// Extract a Value from a rusqlite row according to the column's storage class.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Value> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    })
}
