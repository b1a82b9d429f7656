//! Content consumption
//!
//! The crawl engine hands every fetched resource to a consumer, which stores
//! it under its final URL. Repositories that moved downloads behind generator
//! endpoints also need the content stored under the original, stable URL;
//! [`RedirectNormalizer`] takes care of that.

mod redirect;

pub use redirect::{consume_normally, ConsumeOutcome, RedirectNormalizer};

use crate::protocol::FetchedResource;
use bytes::Bytes;

/// A fetched resource with its body read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub requested_url: String,
    pub final_url: String,
    /// Every URL that answered with a redirect, in order
    pub redirect_chain: Vec<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FetchedContent {
    /// Content served directly, without redirects
    pub fn direct(url: &str, body: impl Into<Bytes>) -> Self {
        Self {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            redirect_chain: Vec::new(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Reads the body of a fetched resource; a missing body is empty content
    pub async fn read(resource: FetchedResource) -> std::io::Result<Self> {
        let body = match resource.body {
            Some(body) => body.into_bytes().await?,
            None => Bytes::new(),
        };

        Ok(Self {
            requested_url: resource.requested_url,
            final_url: resource.final_url,
            redirect_chain: resource.redirect_chain,
            headers: resource.headers,
            body,
        })
    }

    pub fn was_redirected(&self) -> bool {
        !self.redirect_chain.is_empty()
    }
}
