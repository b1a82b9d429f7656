//! Storage module for persisting harvest output
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The content store the manifest and consumed resources are written to
//! - Run tracking for audit

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteContentStore;
pub use traits::{ContentStore, RunLog, StorageError, StorageResult};

use crate::SeedError;
use std::path::Path;

/// Opens or creates the content store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteContentStore)` - Successfully initialized store
/// * `Err(SeedError)` - Failed to open the database
pub fn open_store(path: &Path) -> Result<SqliteContentStore, SeedError> {
    Ok(SqliteContentStore::new(path)?)
}

/// A stored resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContent {
    pub key: String,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
    pub stored_at: String,
}

impl StoredContent {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// One harvest as recorded in the run log
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    /// First-page `ListRecords` URL
    pub origin_url: String,
    pub status: RunStatus,
    pub start_url_count: Option<u64>,
    pub manifest_key: Option<String>,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Finished on the profile's fallback URL
    Degraded,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "degraded" => Some(Self::Degraded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
