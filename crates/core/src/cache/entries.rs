//! SQLite-backed key/value medium.
//!
//! Each call runs as one statement or one transaction on the connection
//! thread, which gives the atomicity the cache relies on.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

use super::connection::CacheDb;
use super::kv::KvStore;
use crate::Error;

impl CacheDb {
    async fn read_rows(&self, keys: Option<Vec<String>>) -> Result<Vec<(String, String)>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut rows = Vec::new();
                match keys {
                    Some(keys) => {
                        let mut stmt = conn.prepare("SELECT key, value_json FROM kv_entries WHERE key = ?1")?;
                        for key in keys {
                            let mut found = stmt.query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?;
                            if let Some(row) = found.next() {
                                rows.push(row?);
                            }
                        }
                    }
                    None => {
                        let mut stmt = conn.prepare("SELECT key, value_json FROM kv_entries")?;
                        for row in stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))? {
                            rows.push(row?);
                        }
                    }
                }
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}

fn decode_rows(rows: Vec<(String, String)>) -> Result<HashMap<String, Value>, Error> {
    rows.into_iter()
        .map(|(key, json)| {
            let value = serde_json::from_str(&json)
                .map_err(|e| Error::StorageUnavailable(format!("undecodable value for {key}: {e}")))?;
            Ok((key, value))
        })
        .collect()
}

#[async_trait]
impl KvStore for CacheDb {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, Error> {
        let rows = self.read_rows(Some(keys.to_vec())).await?;
        decode_rows(rows)
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), Error> {
        let written_at = chrono::Utc::now().to_rfc3339();
        let encoded = entries
            .into_iter()
            .map(|(key, value)| serde_json::to_string(&value).map(|json| (key, json)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::storage)?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO kv_entries (key, value_json, written_at) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET
                            value_json = excluded.value_json,
                            written_at = excluded.written_at",
                    )?;
                    for (key, json) in &encoded {
                        stmt.execute(params![key, json, written_at])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, keys: &[String]) -> Result<(), Error> {
        let keys = keys.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare("DELETE FROM kv_entries WHERE key = ?1")?;
                    for key in &keys {
                        stmt.execute(params![key])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove_if(&self, key: &str, expected: &Value) -> Result<bool, Error> {
        let key = key.to_string();
        let expected = expected.clone();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                let stored: Option<String> = tx
                    .query_row("SELECT value_json FROM kv_entries WHERE key = ?1", params![key], |row| row.get(0))
                    .optional()?;
                let unchanged = stored
                    .and_then(|json| serde_json::from_str::<Value>(&json).ok())
                    .is_some_and(|value| value == expected);
                if unchanged {
                    tx.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
                }
                tx.commit()?;
                Ok(unchanged)
            })
            .await
            .map_err(Error::from)
    }

    async fn get_all(&self) -> Result<HashMap<String, Value>, Error> {
        let rows = self.read_rows(None).await?;
        decode_rows(rows)
    }
}
