//! DuckDB-backed document store, the server-side cache tier.
//!
//! Entries live in a single `cache_entries` table keyed by
//! `(collection, key)`; payloads are stored as JSON text and timestamps as
//! epoch milliseconds. Writes are upserts, so the last writer wins.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use duckdb::{params, types::ValueRef, Connection as DuckDbConnection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{CacheEntry, CacheStore, Collection};
use crate::error::Result;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache_entries (\
     collection VARCHAR NOT NULL, \
     key VARCHAR NOT NULL, \
     payload VARCHAR NOT NULL, \
     written_at_ms BIGINT NOT NULL, \
     PRIMARY KEY (collection, key))";

/// Per-collection summary returned by [`DocumentStore::stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub collection: String,
    pub entries: i64,
    pub oldest_written_at: Option<DateTime<Utc>>,
    pub newest_written_at: Option<DateTime<Utc>>,
}

/// Wraps a DuckDB connection holding cached documents.
///
/// The connection is not `Sync`, so it sits behind a mutex; every call holds
/// the lock only for the duration of one statement batch.
pub struct DocumentStore {
    conn: Mutex<DuckDbConnection>,
}

impl DocumentStore {
    /// Open (or create) a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(DuckDbConnection::open(path)?)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(DuckDbConnection::open_in_memory()?)
    }

    fn init(conn: DuckDbConnection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, DuckDbConnection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    /// Automatically converts DuckDB types to `serde_json::Value`.
    pub fn execute(&self, sql: &str, params: &[String]) -> Result<Vec<HashMap<String, Value>>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        // Column metadata is only available after execution.
        let column_names: Vec<String> = rows
            .as_ref()
            .map(|s| {
                s.column_names()
                    .into_iter()
                    .map(|n| n.to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = HashMap::new();
            for (i, name) in column_names.iter().enumerate() {
                map.insert(name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }

    /// Entry count and timestamp range for each collection that has entries.
    pub fn stats(&self) -> Result<Vec<CollectionStats>> {
        let rows = self.execute(
            "SELECT collection, COUNT(*) AS entries, \
             MIN(written_at_ms) AS oldest, MAX(written_at_ms) AS newest \
             FROM cache_entries GROUP BY collection ORDER BY collection",
            &[],
        )?;

        Ok(rows
            .into_iter()
            .map(|row| CollectionStats {
                collection: row
                    .get("collection")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                entries: row.get("entries").and_then(|v| v.as_i64()).unwrap_or(0),
                oldest_written_at: row
                    .get("oldest")
                    .and_then(|v| v.as_i64())
                    .and_then(DateTime::from_timestamp_millis),
                newest_written_at: row
                    .get("newest")
                    .and_then(|v| v.as_i64())
                    .and_then(DateTime::from_timestamp_millis),
            })
            .collect())
    }
}

impl CacheStore for DocumentStore {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn get(&self, collection: Collection, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT payload, written_at_ms FROM cache_entries WHERE collection = ? AND key = ?",
        )?;
        let mut rows = stmt.query(params![collection.as_str(), key])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let payload: String = row.get(0)?;
        let written_at_ms: i64 = row.get(1)?;

        let Some(written_at) = DateTime::from_timestamp_millis(written_at_ms) else {
            tracing::warn!(collection = collection.as_str(), key, written_at_ms, "Bad timestamp in document store");
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(payload) => Ok(Some(CacheEntry {
                key: key.to_string(),
                payload,
                written_at,
            })),
            Err(e) => {
                tracing::warn!(collection = collection.as_str(), key, error = %e, "Corrupt document, ignoring");
                Ok(None)
            }
        }
    }

    fn put_at(
        &self,
        collection: Collection,
        key: &str,
        payload: &Value,
        written_at: DateTime<Utc>,
    ) -> Result<()> {
        let body = serde_json::to_string(payload)?;
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (collection, key, payload, written_at_ms) \
             VALUES (?, ?, ?, ?)",
            params![collection.as_str(), key, body, written_at.timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&self, collection: Collection, key: &str) -> Result<bool> {
        let conn = self.lock();
        let n = conn.execute(
            "DELETE FROM cache_entries WHERE collection = ? AND key = ?",
            params![collection.as_str(), key],
        )?;
        Ok(n > 0)
    }

    fn clear(&self) -> Result<()> {
        self.lock().execute_batch("DELETE FROM cache_entries")?;
        Ok(())
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> Value {
    match val {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::Number(n.into()),
        ValueRef::SmallInt(n) => Value::Number(n.into()),
        ValueRef::Int(n) => Value::Number(n.into()),
        ValueRef::BigInt(n) => Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            // Aggregates can widen to HUGEINT
            if let Ok(i) = i64::try_from(n) {
                Value::Number(i.into())
            } else {
                Value::String(n.to_string())
            }
        }
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
        _ => Value::Null,
    }
}
