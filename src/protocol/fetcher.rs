//! HTTP fetch primitive
//!
//! This module defines the fetch interface the crawl seed consumes and an
//! HTTP implementation of it, including:
//! - Building HTTP clients with proper user agent strings
//! - Cache bypass for protocol requests
//! - Manual redirect handling with the chain recorded
//! - Error classification into retryable and fatal kinds

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, PRAGMA};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 10;

/// How much of an error response body is kept for diagnostics
const ERROR_SNIPPET_LEN: usize = 512;

/// Classification of a failed fetch
///
/// The retry loop dispatches on this tag; nothing else about the error is
/// consulted when deciding whether to try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeout, refused connection, reset: the network misbehaved
    RetryableNetwork,

    /// The server answered but asked us to come back (5xx, 408, 429)
    RetryableSameUrl,

    /// The URL does not exist (404, 410)
    DeadLink,

    /// Anything else that will not improve by asking again
    Fatal,
}

impl FailureKind {
    /// Returns true if the failure may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableNetwork | Self::RetryableSameUrl)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetryableNetwork => "retryable network error",
            Self::RetryableSameUrl => "retryable server error",
            Self::DeadLink => "dead link",
            Self::Fatal => "fatal error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified fetch failure
#[derive(Debug, Error)]
#[error("{kind} fetching {url}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub url: String,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl FetchError {
    pub fn new(kind: FailureKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn fatal(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Fatal, url, message)
    }
}

/// Flags passed to the fetch primitive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchFlags {
    /// Bypass any cache between us and the origin
    pub always_refetch: bool,
}

impl FetchFlags {
    /// Flags for protocol requests, which must never be served stale
    pub fn refetch() -> Self {
        Self {
            always_refetch: true,
        }
    }
}

/// A response body that has not been read yet
#[derive(Debug)]
pub enum ResponseBody {
    /// Body already in memory
    Buffered(Bytes),

    /// Body still on the wire
    Http(reqwest::Response),
}

impl ResponseBody {
    /// Reads the whole body
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        match self {
            Self::Buffered(bytes) => Ok(bytes),
            Self::Http(response) => response
                .bytes()
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::Buffered(Bytes::from_static(value.as_bytes()))
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::Buffered(Bytes::from(value))
    }
}

/// The result of a successful fetch
#[derive(Debug)]
pub struct FetchedResource {
    /// URL originally asked for
    pub requested_url: String,

    /// URL the body was actually retrieved from
    pub final_url: String,

    /// Every URL that answered with a redirect, in order
    pub redirect_chain: Vec<String>,

    /// HTTP status code of the final response
    pub status_code: u16,

    /// Response headers of the final response
    pub headers: Vec<(String, String)>,

    /// `None` when the server answered without a body
    pub body: Option<ResponseBody>,
}

impl FetchedResource {
    /// A plain 200 response with no redirects
    pub fn ok(url: &str, body: impl Into<ResponseBody>) -> Self {
        Self {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            redirect_chain: Vec::new(),
            status_code: 200,
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Returns true if at least one redirect was followed
    pub fn was_redirected(&self) -> bool {
        !self.redirect_chain.is_empty()
    }

    /// Looks up a response header, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The fetch primitive provided by the crawl engine
///
/// Implementations are treated as blocking steps of a sequential harvest:
/// the caller awaits each fetch before issuing the next.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, flags: FetchFlags) -> Result<FetchedResource, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetch primitive backed by reqwest
///
/// # Classification
///
/// | Condition | Kind |
/// |-----------|------|
/// | Timeout, connection refused | RetryableNetwork |
/// | HTTP 5xx, 408, 429 | RetryableSameUrl |
/// | HTTP 404, 410 | DeadLink |
/// | Other HTTP errors | Fatal |
/// | Redirect loop, chain > 10 | Fatal |
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, flags: FetchFlags) -> Result<FetchedResource, FetchError> {
        let mut current = Url::parse(url)
            .map_err(|e| FetchError::fatal(url, format!("invalid URL: {}", e)))?;
        let mut chain: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(current.to_string());

        loop {
            let mut request = self.client.get(current.clone());
            if flags.always_refetch {
                request = request
                    .header(CACHE_CONTROL, "no-cache")
                    .header(PRAGMA, "no-cache");
            }

            let response = request
                .send()
                .await
                .map_err(|e| classify_transport_error(current.as_str(), e))?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        FetchError::fatal(current.as_str(), "redirect without Location header")
                    })?;
                let next = current.join(location).map_err(|e| {
                    FetchError::fatal(
                        current.as_str(),
                        format!("bad redirect target '{}': {}", location, e),
                    )
                })?;

                if chain.len() >= MAX_REDIRECTS {
                    return Err(FetchError::fatal(
                        url,
                        format!("too many redirects (more than {})", MAX_REDIRECTS),
                    ));
                }
                if !visited.insert(next.to_string()) {
                    return Err(FetchError::fatal(
                        url,
                        format!("redirect loop detected at {}", next),
                    ));
                }

                tracing::debug!("Redirect {} -> {}", current, next);
                chain.push(current.to_string());
                current = next;
                continue;
            }

            if !status.is_success() {
                let final_url = current.to_string();
                let snippet = error_snippet(response).await;
                return Err(classify_status(&final_url, status, snippet));
            }

            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                .collect::<Vec<_>>();

            let body = if status == StatusCode::NO_CONTENT {
                None
            } else {
                Some(ResponseBody::Http(response))
            };

            return Ok(FetchedResource {
                requested_url: url.to_string(),
                final_url: current.to_string(),
                redirect_chain: chain,
                status_code: status.as_u16(),
                headers,
                body,
            });
        }
    }
}

/// Maps a reqwest transport error to a failure kind
fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    let (kind, message) = if error.is_timeout() {
        (FailureKind::RetryableNetwork, "request timeout")
    } else if error.is_connect() {
        (FailureKind::RetryableNetwork, "connection failed")
    } else {
        (FailureKind::Fatal, "request failed")
    };
    FetchError::new(kind, url, message).with_source(error)
}

/// Maps a non-success HTTP status to a failure kind
fn classify_status(url: &str, status: StatusCode, snippet: String) -> FetchError {
    let kind = match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => FailureKind::DeadLink,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            FailureKind::RetryableSameUrl
        }
        s if s.is_server_error() => FailureKind::RetryableSameUrl,
        _ => FailureKind::Fatal,
    };

    let message = if snippet.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), snippet)
    };
    FetchError::new(kind, url, message)
}

/// Keeps the start of an error body; proxies explain themselves there
///
/// Reads only as many chunks as the snippet needs and drops the rest.
async fn error_snippet(mut response: reqwest::Response) -> String {
    let is_text = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("text/") || ct.contains("xml") || ct.contains("json"))
        .unwrap_or(true);
    if !is_text {
        return String::new();
    }

    // Enough bytes for the snippet even if every char is four bytes wide
    let limit = ERROR_SNIPPET_LEN * 4;
    let mut head: Vec<u8> = Vec::new();
    while head.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => head.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    snippet_from(&head)
}

fn snippet_from(head: &[u8]) -> String {
    String::from_utf8_lossy(head)
        .trim()
        .chars()
        .take(ERROR_SNIPPET_LEN)
        .collect()
}
