//! Harvester profiles
//!
//! Repositories differ in where they keep dates and identifiers, how their
//! identifiers turn into content URLs, and what a sensible fallback seed is.
//! A profile captures all of that as one value handed to the generic harvest.

use crate::config::validation::compile_pattern;
use crate::config::{ProfileConfig, ProfileKind};
use crate::harvest::{HarvestSession, Record, YearMatch};
use crate::ConfigError;
use regex::Regex;
use std::error::Error;

/// Picks the raw identifier value that names a record's content
pub type ExtractIdentifierFn = fn(&Record, &HarvesterProfile) -> Option<String>;

/// Builds the single seed used when a harvest is degraded
pub type FallbackUrlFn = fn(&HarvestSession, &HarvesterProfile) -> String;

/// Decides whether a harvest failure is operator-proxy interference
pub type ProxyClassifierFn = fn(&(dyn Error + 'static), &str) -> bool;

/// Proxies that demand credentials answer 407, which ends up in the cause text
pub const DEFAULT_PROXY_MARKER: &str = "HTTP 407";

/// Resolver domain used by handle-based repositories
pub const HANDLE_DOMAIN: &str = "hdl.handle.net";

/// Legacy download links that now redirect to a generated bitstream
const DSPACE_FIXED_DOWNLOAD: &str = r"/bitstream/(handle/)?[^?#]+$";
const DSPACE_GENERATOR: &str = r"/server/api/core/bitstreams/[0-9a-fA-F-]+/content$";

/// "Fixed download" and "generator endpoint" URL shapes
#[derive(Debug, Clone)]
pub struct RedirectPatterns {
    pub fixed_download: Regex,
    pub generator: Regex,
}

/// Everything that varies between harvester variants
#[derive(Clone)]
pub struct HarvesterProfile {
    pub name: &'static str,
    pub date_path: String,
    pub identifier_path: String,
    pub year_match: YearMatch,
    /// External identifier domain rewritten to `<base>handle/`
    pub handle_domain: Option<String>,
    pub proxy_marker: String,
    pub fallback_path: String,
    pub redirects: Option<RedirectPatterns>,
    pub crawl_rule: Option<Regex>,
    pub extract_identifier: ExtractIdentifierFn,
    pub build_fallback_url: FallbackUrlFn,
    pub classify_proxy_error: ProxyClassifierFn,
}

impl HarvesterProfile {
    /// Dublin Core repository with plain URL identifiers
    pub fn generic() -> Self {
        Self {
            name: "generic",
            date_path: "dc:date".to_string(),
            identifier_path: "dc:identifier".to_string(),
            year_match: YearMatch::Equals,
            handle_domain: None,
            proxy_marker: DEFAULT_PROXY_MARKER.to_string(),
            fallback_path: String::new(),
            redirects: None,
            crawl_rule: None,
            extract_identifier: first_url_identifier,
            build_fallback_url: fallback_from_path,
            classify_proxy_error: cause_chain_contains,
        }
    }

    /// DSpace: handle identifiers, bitstream redirects
    pub fn dspace() -> Self {
        Self {
            name: "dspace",
            handle_domain: Some(HANDLE_DOMAIN.to_string()),
            redirects: Some(RedirectPatterns {
                fixed_download: Regex::new(DSPACE_FIXED_DOWNLOAD).expect("valid built-in regex"),
                generator: Regex::new(DSPACE_GENERATOR).expect("valid built-in regex"),
            }),
            extract_identifier: handle_identifier,
            build_fallback_url: fallback_from_handle_set,
            ..Self::generic()
        }
    }

    /// Open Journal Systems: article landing pages, LOCKSS manifest fallback
    pub fn ojs() -> Self {
        Self {
            name: "ojs",
            extract_identifier: article_view_identifier,
            build_fallback_url: fallback_from_gateway,
            ..Self::generic()
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Generic => Self::generic(),
            ProfileKind::Dspace => Self::dspace(),
            ProfileKind::Ojs => Self::ojs(),
        }
    }

    /// Built-in profile for `config.kind` with the configured overrides applied
    pub fn from_config(config: &ProfileConfig) -> Result<Self, ConfigError> {
        let mut profile = Self::for_kind(config.kind);

        if let Some(tag) = &config.date_tag {
            profile.date_path = tag.clone();
        }
        if let Some(tag) = &config.identifier_tag {
            profile.identifier_path = tag.clone();
        }
        profile.year_match = config.year_match;
        if let Some(domain) = &config.handle_domain {
            profile.handle_domain = Some(domain.clone());
        }
        if let Some(marker) = &config.proxy_marker {
            profile.proxy_marker = marker.clone();
        }
        if let Some(path) = &config.fallback_path {
            profile.fallback_path = path.clone();
        }
        if let (Some(fixed), Some(generator)) =
            (&config.fixed_download_pattern, &config.generator_pattern)
        {
            profile.redirects = Some(RedirectPatterns {
                fixed_download: compile_pattern("fixed-download-pattern", fixed)?,
                generator: compile_pattern("generator-pattern", generator)?,
            });
        }
        if let Some(rule) = &config.crawl_rule {
            profile.crawl_rule = Some(compile_pattern("crawl-rule", rule)?);
        }

        Ok(profile)
    }

    /// Returns true if `url` may be used as a start URL
    pub fn within_crawl_rules(&self, url: &str) -> bool {
        self.crawl_rule.as_ref().map_or(true, |rule| rule.is_match(url))
    }

    /// Returns true if `error` is operator-proxy interference
    pub fn is_proxy_interference(&self, error: &(dyn Error + 'static)) -> bool {
        (self.classify_proxy_error)(error, &self.proxy_marker)
    }

    /// The single seed used when discovery was blocked by a proxy
    pub fn fallback_url(&self, session: &HarvestSession) -> String {
        (self.build_fallback_url)(session, self)
    }
}

impl std::fmt::Debug for HarvesterProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvesterProfile")
            .field("name", &self.name)
            .field("date_path", &self.date_path)
            .field("identifier_path", &self.identifier_path)
            .field("year_match", &self.year_match)
            .field("handle_domain", &self.handle_domain)
            .field("proxy_marker", &self.proxy_marker)
            .field("fallback_path", &self.fallback_path)
            .field("redirects", &self.redirects)
            .field("crawl_rule", &self.crawl_rule)
            .finish_non_exhaustive()
    }
}

/// Identifier values that look like URLs
fn url_identifiers<'a>(record: &'a Record, profile: &HarvesterProfile) -> Vec<&'a str> {
    record
        .values(&profile.identifier_path)
        .into_iter()
        .filter(|v| v.starts_with("http://") || v.starts_with("https://"))
        .collect()
}

/// First identifier value with a URL scheme
pub fn first_url_identifier(record: &Record, profile: &HarvesterProfile) -> Option<String> {
    url_identifiers(record, profile)
        .first()
        .map(|v| v.to_string())
}

/// Prefers identifiers on the handle resolver, then any URL
pub fn handle_identifier(record: &Record, profile: &HarvesterProfile) -> Option<String> {
    let candidates = url_identifiers(record, profile);
    let handle = profile.handle_domain.as_deref().and_then(|domain| {
        candidates
            .iter()
            .find(|v| v.contains(&format!("://{}/", domain)))
    });
    handle
        .or_else(|| candidates.first())
        .map(|v| v.to_string())
}

/// Only OJS article landing pages name content
pub fn article_view_identifier(record: &Record, profile: &HarvesterProfile) -> Option<String> {
    url_identifiers(record, profile)
        .into_iter()
        .find(|v| v.contains("/article/view/"))
        .map(str::to_string)
}

/// `<base><fallback-path>`
pub fn fallback_from_path(session: &HarvestSession, profile: &HarvesterProfile) -> String {
    session
        .base_url
        .join(&profile.fallback_path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| session.base_url.to_string())
}

/// `<base>handle/<prefix>/<suffix>` for DSpace collection and community sets
pub fn fallback_from_handle_set(session: &HarvestSession, profile: &HarvesterProfile) -> String {
    let handle = session.set_spec.as_deref().and_then(set_spec_to_handle);
    match handle {
        Some(handle) if profile.fallback_path.is_empty() => session
            .base_url
            .join(&format!("handle/{}", handle))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| session.base_url.to_string()),
        _ => fallback_from_path(session, profile),
    }
}

/// `<base>gateway/lockss[?year=YYYY]`, the OJS manifest page
pub fn fallback_from_gateway(session: &HarvestSession, profile: &HarvesterProfile) -> String {
    if !profile.fallback_path.is_empty() {
        return fallback_from_path(session, profile);
    }
    let mut url = session.base_url.clone();
    url.set_path(&format!("{}gateway/lockss", session.base_url.path()));
    if let Some(rule) = &session.filter_rule {
        url.query_pairs_mut()
            .append_pair("year", &format!("{:04}", rule.year));
    }
    url.to_string()
}

/// `col_123456789_12` → `123456789/12`
pub fn set_spec_to_handle(set_spec: &str) -> Option<String> {
    let rest = set_spec
        .strip_prefix("col_")
        .or_else(|| set_spec.strip_prefix("com_"))?;
    let (prefix, suffix) = rest.split_once('_')?;
    if prefix.is_empty() || suffix.is_empty() {
        return None;
    }
    Some(format!("{}/{}", prefix, suffix))
}

/// Walks the error and its sources looking for `marker` in any message
pub fn cause_chain_contains(error: &(dyn Error + 'static), marker: &str) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if err.to_string().contains(marker) {
            return true;
        }
        current = err.source();
    }
    false
}
