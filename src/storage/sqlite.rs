//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ContentStore, RunLog, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredContent};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, origin_url, status, start_url_count, manifest_key";

/// SQLite content store and run log
pub struct SqliteContentStore {
    conn: Connection,
}

impl SqliteContentStore {
    /// Opens or creates a store
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteContentStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl std::fmt::Debug for SqliteContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteContentStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

/// Headers are kept one per line as `name: value`
fn encode_headers(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.replace(['\r', '\n'], " ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_headers(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| line.split_once(": "))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        origin_url: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        start_url_count: row.get::<_, Option<i64>>(6)?.map(|n| n as u64),
        manifest_key: row.get(7)?,
    })
}

impl ContentStore for SqliteContentStore {
    fn store(&mut self, key: &str, body: &[u8], headers: &[(String, String)]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO content (key, body, headers, stored_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                headers = excluded.headers,
                stored_at = excluded.stored_at",
            params![key, body, encode_headers(headers), now],
        )?;
        tracing::debug!("Stored {} bytes under {}", body.len(), key);
        Ok(())
    }

    fn load(&self, key: &str) -> StorageResult<Option<StoredContent>> {
        let content = self
            .conn
            .query_row(
                "SELECT key, body, headers, stored_at FROM content WHERE key = ?1",
                params![key],
                |row| {
                    Ok(StoredContent {
                        key: row.get(0)?,
                        body: row.get(1)?,
                        headers: decode_headers(&row.get::<_, String>(2)?),
                        stored_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(content)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM content ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl RunLog for SqliteContentStore {
    fn create_run(&mut self, config_hash: &str, origin_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO harvest_runs (started_at, config_hash, origin_url, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, origin_url, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        start_url_count: u64,
        manifest_key: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE harvest_runs
             SET status = ?1, finished_at = ?2, start_url_count = ?3, manifest_key = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                start_url_count as i64,
                manifest_key,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM harvest_runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM harvest_runs ORDER BY id DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }
}
