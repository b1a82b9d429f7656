//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types.

use crate::storage::{RunRecord, RunStatus, StoredContent};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Where fetched and generated content is kept, keyed by URL
///
/// Storing under an existing key replaces the earlier content.
pub trait ContentStore {
    /// Stores a body and its response headers under `key`
    fn store(&mut self, key: &str, body: &[u8], headers: &[(String, String)]) -> StorageResult<()>;

    /// Loads the content stored under `key`
    fn load(&self, key: &str) -> StorageResult<Option<StoredContent>>;

    /// All keys, sorted
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Audit trail of harvest runs
pub trait RunLog {
    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `origin_url` - First-page `ListRecords` URL
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, origin_url: &str) -> StorageResult<i64>;

    /// Marks a run finished
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        start_url_count: u64,
        manifest_key: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
