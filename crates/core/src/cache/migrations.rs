//! Schema migrations for the entry table.
//!
//! A `_migrations` table records the highest applied version; every pending
//! migration runs in order inside the connection thread.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered `(version, SQL)` pairs. Versions only ever grow.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_kv_entries.sql"))];

/// Apply every migration newer than the recorded version.
///
/// # Errors
///
/// Returns `Error::StorageUnavailable` if a migration batch is rejected.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    let applied = conn
        .call(|conn| -> Result<Vec<i64>, Error> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                )",
                [],
            )?;

            let current: i64 =
                conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

            let mut applied = Vec::new();
            for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
                conn.execute_batch(sql)
                    .map_err(|e| Error::storage(format!("migration version {version} failed: {e}")))?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version, chrono::Utc::now().to_rfc3339()],
                )?;
                applied.push(*version);
            }

            Ok(applied)
        })
        .await
        .map_err(Error::from)?;

    if !applied.is_empty() {
        tracing::info!(?applied, "applied cache migrations");
    }

    Ok(())
}
