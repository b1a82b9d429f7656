use crate::harvest::YearMatch;
use serde::Deserialize;

/// Main configuration structure for an OAI-PMH harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// What to harvest and from where
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Base URL of the site; rewritten identifiers are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// OAI-PMH endpoint. Defaults to `<base-url>oai/request`
    #[serde(rename = "oai-request-url", default)]
    pub oai_request_url: Option<String>,

    /// OAI-PMH metadata format to request
    #[serde(rename = "metadata-prefix", default = "default_metadata_prefix")]
    pub metadata_prefix: String,

    /// Optional OAI-PMH set
    #[serde(rename = "set-spec", default)]
    pub set_spec: Option<String>,

    /// Target publication year; records are filtered on their date tag
    #[serde(default)]
    pub year: Option<String>,

    /// Lower datestamp bound (inclusive)
    #[serde(default)]
    pub from: Option<String>,

    /// Upper datestamp bound (inclusive)
    #[serde(default)]
    pub until: Option<String>,

    /// Pages granting the archive permission to collect the site
    #[serde(rename = "permission-urls", default)]
    pub permission_urls: Vec<String>,

    /// Whether a harvest with no start URLs is a failure
    #[serde(rename = "fail-on-empty", default = "default_true")]
    pub fail_on_empty: bool,
}

/// Which harvester variant to use, plus overrides of its defaults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub kind: ProfileKind,

    /// Metadata tag holding the publication date
    #[serde(rename = "date-tag", default)]
    pub date_tag: Option<String>,

    /// Metadata tag holding the content identifier
    #[serde(rename = "identifier-tag", default)]
    pub identifier_tag: Option<String>,

    #[serde(rename = "year-match", default)]
    pub year_match: YearMatch,

    /// External identifier domain rewritten to `<base-url>handle/`
    #[serde(rename = "handle-domain", default)]
    pub handle_domain: Option<String>,

    /// Substring identifying operator-proxy interference in error causes
    #[serde(rename = "proxy-marker", default)]
    pub proxy_marker: Option<String>,

    /// Path appended to the base URL for the degraded fallback seed
    #[serde(rename = "fallback-path", default)]
    pub fallback_path: Option<String>,

    /// Regex for "fixed download" URLs that redirect to a generator
    #[serde(rename = "fixed-download-pattern", default)]
    pub fixed_download_pattern: Option<String>,

    /// Regex for the generator endpoint such URLs end up at
    #[serde(rename = "generator-pattern", default)]
    pub generator_pattern: Option<String>,

    /// Regex every start URL must match
    #[serde(rename = "crawl-rule", default)]
    pub crawl_rule: Option<String>,
}

/// Built-in harvester variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Generic,
    Dspace,
    Ojs,
}

/// Retry budgets handed to the protocol query client
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries after timeouts and refused connections
    #[serde(rename = "network-retries", default = "default_retries")]
    pub network_retries: u32,

    /// Retries after 5xx, 408 and 429 responses
    #[serde(rename = "same-url-retries", default = "default_retries")]
    pub same_url_retries: u32,

    /// Wait before each retry (milliseconds)
    #[serde(rename = "wait-ms", default = "default_wait_ms")]
    pub wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            network_retries: default_retries(),
            same_url_retries: default_retries(),
            wait_ms: default_wait_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite content store
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_metadata_prefix() -> String {
    "oai_dc".to_string()
}

fn default_true() -> bool {
    true
}

fn default_retries() -> u32 {
    3
}

fn default_wait_ms() -> u64 {
    5000
}
