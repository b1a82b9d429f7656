//! OAI-PMH protocol module
//!
//! This module contains everything needed to talk to an OAI-PMH endpoint:
//! - The fetch primitive interface and its HTTP implementation
//! - Retry budgets and the retrying query client
//! - Request parameter building and datestamp validation
//! - Response parsing

mod client;
mod fetcher;
mod request;
mod retry;
mod xml;

pub use client::QueryClient;
pub use fetcher::{
    build_http_client, FailureKind, FetchError, FetchFlags, FetchedResource, Fetcher,
    HttpFetcher, ResponseBody, MAX_REDIRECTS,
};
pub use request::{DateRange, OaiDate, OaiRequest};
pub use retry::{ConfiguredRetryBudget, RetryBudget, RetryPolicy};
pub use xml::{parse_response, Element, ParsedResponse, RecordPage, RepositoryIdentity};
