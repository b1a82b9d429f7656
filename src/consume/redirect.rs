use crate::consume::FetchedContent;
use crate::harvest::{HarvesterProfile, RedirectPatterns};
use crate::storage::{ContentStore, StorageError};

/// Where consumed content ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Stored under the final URL only
    Normal { key: String },
    /// A "fixed download → generator endpoint" chain: stored under the
    /// original URL as well as the final one
    Normalized { origin_key: String, final_key: String },
}

impl ConsumeOutcome {
    /// The key the crawl should treat as the content's URL
    pub fn content_key(&self) -> &str {
        match self {
            Self::Normal { key } => key,
            Self::Normalized { origin_key, .. } => origin_key,
        }
    }
}

/// Stores content under its final URL
pub fn consume_normally(
    content: &FetchedContent,
    store: &mut dyn ContentStore,
) -> Result<ConsumeOutcome, StorageError> {
    store.store(&content.final_url, &content.body, &content.headers)?;
    Ok(ConsumeOutcome::Normal {
        key: content.final_url.clone(),
    })
}

/// Consumption hook that repairs fixed-download redirect chains
#[derive(Debug, Clone)]
pub struct RedirectNormalizer {
    patterns: RedirectPatterns,
}

impl RedirectNormalizer {
    pub fn new(patterns: RedirectPatterns) -> Self {
        Self { patterns }
    }

    /// The normalizer for a profile, if it declares redirect patterns
    pub fn for_profile(profile: &HarvesterProfile) -> Option<Self> {
        profile.redirects.clone().map(Self::new)
    }

    /// Returns true if the fetch went from a fixed download URL to a generator endpoint
    pub fn applies_to(&self, content: &FetchedContent) -> bool {
        content.was_redirected()
            && self.patterns.fixed_download.is_match(&content.requested_url)
            && self.patterns.generator.is_match(&content.final_url)
    }

    /// Stores `content`, adding the original-URL copy when the chain needs repair
    ///
    /// Normal consumption under the final URL always happens.
    pub fn consume(
        &self,
        content: &FetchedContent,
        store: &mut dyn ContentStore,
    ) -> Result<ConsumeOutcome, StorageError> {
        if !self.applies_to(content) {
            return consume_normally(content, store);
        }

        tracing::debug!(
            "Storing {} under {} (redirected via {} hops)",
            content.final_url,
            content.requested_url,
            content.redirect_chain.len()
        );
        store.store(&content.requested_url, &content.body, &content.headers)?;
        consume_normally(content, store)?;

        Ok(ConsumeOutcome::Normalized {
            origin_key: content.requested_url.clone(),
            final_key: content.final_url.clone(),
        })
    }
}
