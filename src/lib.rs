//! OAI-Seed: OAI-PMH crawl seeds for a web-archiving daemon
//!
//! This crate discovers the start URLs of a harvest by walking an OAI-PMH
//! `ListRecords` result, filtering the records by a per-harvest rule, mapping
//! them to content URLs and persisting the discovered set as an auditable
//! manifest. It also repairs "fixed download → generator endpoint" redirect
//! chains when the crawl engine consumes fetched content.

pub mod config;
pub mod consume;
pub mod harvest;
pub mod output;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod url;

use protocol::FetchError;
use thiserror::Error;

/// Main error type for crawl seed operations
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("No start URLs found for {request_url}")]
    NoStartUrls { request_url: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
}

impl SeedError {
    /// Returns true if this error means the harvest was set up incorrectly
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Configuration-specific errors
///
/// These are never retried: they mean the harvest itself is malformed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid year '{0}': expected exactly four digits")]
    InvalidYear(String),

    #[error("Invalid OAI-PMH date '{0}': expected YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ")]
    InvalidDate(String),

    #[error("OAI-PMH server rejected the request parameters ({code}): {message}")]
    RejectedArgument { code: String, message: String },
}

/// Errors raised while talking OAI-PMH to a repository
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Fetch of {url} succeeded but returned no response body")]
    EmptyResponse { url: String },

    #[error("Fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Gave up on {url} after {retries} retries: {source}")]
    RetriesExhausted {
        url: String,
        retries: u32,
        #[source]
        source: FetchError,
    },

    #[error("Failed to read response body from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed OAI-PMH response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("OAI-PMH error '{code}' from {url}: {message}")]
    Oai {
        url: String,
        code: String,
        message: String,
    },

    #[error("Resumption token '{token}' was returned twice by {url}")]
    RepeatedToken { url: String, token: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use consume::{ConsumeOutcome, FetchedContent, RedirectNormalizer};
pub use harvest::{HarvestOutcome, HarvestReport, HarvestSession, HarvesterProfile, OaiCrawlSeed};
pub use protocol::{Fetcher, HttpFetcher, QueryClient};
pub use state::{QueryState, RetryState};
pub use storage::{ContentStore, SqliteContentStore};
