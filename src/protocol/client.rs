//! Protocol query client
//!
//! Issues OAI-PMH requests through the fetch primitive, retrying failures
//! the fetcher classified as retryable within the budget the crawl engine
//! grants, and surfacing everything else as a fatal protocol error.

use crate::protocol::xml::{parse_response, ParsedResponse, RepositoryIdentity};
use crate::protocol::{FetchFlags, Fetcher, OaiRequest, RetryBudget};
use crate::state::{QueryState, RetryState};
use crate::{ProtocolError, SeedError};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Client for one OAI-PMH endpoint
#[derive(Clone)]
pub struct QueryClient {
    endpoint: Url,
    fetcher: Arc<dyn Fetcher>,
    budget: Arc<dyn RetryBudget>,
}

impl QueryClient {
    pub fn new(endpoint: Url, fetcher: Arc<dyn Fetcher>, budget: Arc<dyn RetryBudget>) -> Self {
        Self {
            endpoint,
            fetcher,
            budget,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The URL a request resolves to on this endpoint
    pub fn request_url(&self, request: &OaiRequest) -> Url {
        request.to_url(&self.endpoint)
    }

    /// Executes a request and returns the raw response body
    ///
    /// # Retry Logic
    ///
    /// | Outcome | Action |
    /// |---------|--------|
    /// | Body returned | Return it |
    /// | No body | Fatal `EmptyResponse` |
    /// | Retryable failure, budget left | Wait, retry |
    /// | Retryable failure, budget spent | Fatal `RetriesExhausted` |
    /// | Other failure | Fatal `Fetch`, no retry |
    /// | Body read failure | Fatal `Read` |
    pub async fn execute(&self, request: &OaiRequest) -> Result<Bytes, ProtocolError> {
        let url = self.request_url(request).to_string();
        let mut state = QueryState::Idle;
        let mut retry: Option<RetryState> = None;

        loop {
            state = state.advance(QueryState::Requesting, &url);

            let error = match self.fetcher.fetch(&url, FetchFlags::refetch()).await {
                Ok(resource) => {
                    let Some(body) = resource.body else {
                        state.advance(QueryState::Failed, &url);
                        return Err(ProtocolError::EmptyResponse { url });
                    };
                    return match body.into_bytes().await {
                        Ok(bytes) => {
                            state.advance(QueryState::Returning, &url);
                            if let Some(retry) = &retry {
                                tracing::info!(
                                    "{} succeeded after {} retries",
                                    url,
                                    retry.retries_used()
                                );
                            }
                            Ok(bytes)
                        }
                        Err(source) => {
                            state.advance(QueryState::Failed, &url);
                            Err(ProtocolError::Read { url, source })
                        }
                    };
                }
                Err(error) => error,
            };

            if !error.kind.is_retryable() {
                state.advance(QueryState::Failed, &url);
                tracing::warn!("Fatal fetch failure for {}: {}", url, error);
                return Err(ProtocolError::Fetch { url, source: error });
            }

            let mut current = match retry.take() {
                Some(mut current) => {
                    current.record_failure(error);
                    current
                }
                None => {
                    let policy = self.budget.budget(error.kind);
                    RetryState::new(error, policy)
                }
            };

            state = state.advance(QueryState::Retrying, &url);
            let Some(deadline) = current.schedule_retry(Instant::now()) else {
                state.advance(QueryState::Failed, &url);
                tracing::warn!(
                    "Retries exhausted for {} after {} attempts",
                    url,
                    current.total_retries
                );
                return Err(ProtocolError::RetriesExhausted {
                    retries: current.total_retries,
                    source: current.into_error(),
                    url,
                });
            };

            tracing::info!(
                "{} ({}); retry {}/{} in {:?}",
                url,
                current.error,
                current.retries_used(),
                current.total_retries,
                current.wait
            );
            // A sleep cut short only means the retry goes out early
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            retry = Some(current);
        }
    }

    /// Issues `Identify` and returns the repository description
    pub async fn identify(&self) -> Result<RepositoryIdentity, SeedError> {
        let request = OaiRequest::Identify;
        let url = self.request_url(&request).to_string();
        let body = self.execute(&request).await?;

        match parse_response(&body, &url)? {
            ParsedResponse::Identity(identity) => Ok(identity),
            ParsedResponse::Error { code, message } => {
                Err(ProtocolError::Oai { url, code, message }.into())
            }
            ParsedResponse::Records(_) => Err(ProtocolError::Malformed {
                url,
                message: "ListRecords answer to Identify".to_string(),
            }
            .into()),
        }
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}
