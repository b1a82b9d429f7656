use crate::harvest::{HarvesterProfile, Record};
use crate::url::{rebase_url, rewrite_resolver_url};
use url::Url;

/// Path under the base URL that handle identifiers are rewritten to
const HANDLE_PATH: &str = "handle/";

/// A content URL discovered from one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredUrl {
    /// OAI identifier of the record it came from
    pub origin_identifier: String,
    pub url: String,
}

/// Maps records to content URLs on the harvested site
#[derive(Debug, Clone, Copy)]
pub struct UrlMapper<'a> {
    profile: &'a HarvesterProfile,
    base: &'a Url,
}

impl<'a> UrlMapper<'a> {
    pub fn new(profile: &'a HarvesterProfile, base: &'a Url) -> Self {
        Self { profile, base }
    }

    /// Content URL for a record, or `None` if it has no usable identifier
    pub fn resolve(&self, record: &Record) -> Option<DiscoveredUrl> {
        let raw = (self.profile.extract_identifier)(record, self.profile)?;
        let url = self.rewrite(&raw)?;

        Some(DiscoveredUrl {
            origin_identifier: record.identifier.clone(),
            url,
        })
    }

    /// Applies the resolver-domain rewrite and the base-site rebase
    pub fn rewrite(&self, raw: &str) -> Option<String> {
        let parsed = match Url::parse(raw.trim()) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping unparsable identifier {}: {}", raw, e);
                return None;
            }
        };

        let parsed = self
            .profile
            .handle_domain
            .as_deref()
            .and_then(|domain| rewrite_resolver_url(&parsed, domain, self.base, HANDLE_PATH))
            .unwrap_or(parsed);

        match rebase_url(&parsed, self.base) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::debug!("Skipping identifier {}: {}", raw, e);
                None
            }
        }
    }
}
