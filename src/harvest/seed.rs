//! OAI-PMH crawl seed
//!
//! Ties a session, a profile and a query client together: walks the
//! session's records, keeps the ones the filter accepts, maps them to URLs
//! and stores the resulting manifest.

use crate::config::validation::validate_retry_config;
use crate::config::Config;
use crate::consume::RedirectNormalizer;
use crate::harvest::{
    materialize, HarvestOutcome, HarvestReport, HarvestSession, HarvesterProfile, UrlMapper,
};
use crate::protocol::{ConfiguredRetryBudget, Fetcher, QueryClient};
use crate::storage::ContentStore;
use crate::{ConfigError, SeedError};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Start URLs of a crawl, discovered through OAI-PMH
pub struct OaiCrawlSeed<S: ContentStore> {
    session: HarvestSession,
    profile: HarvesterProfile,
    client: QueryClient,
    store: S,
}

impl<S: ContentStore> OaiCrawlSeed<S> {
    pub fn new(session: HarvestSession, profile: HarvesterProfile, client: QueryClient, store: S) -> Self {
        Self {
            session,
            profile,
            client,
            store,
        }
    }

    /// Builds a seed from a loaded configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `fetcher` - The crawl engine's fetch primitive
    /// * `store` - Where the manifest is written
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        store: S,
    ) -> Result<Self, ConfigError> {
        // Configs built in code never went through `load_config`
        validate_retry_config(&config.retry)?;
        let profile = HarvesterProfile::from_config(&config.profile)?;
        let session = HarvestSession::from_config(&config.session, &profile)?;
        let client = QueryClient::new(
            session.endpoint.clone(),
            fetcher,
            Arc::new(ConfiguredRetryBudget::from(&config.retry)),
        );

        Ok(Self::new(session, profile, client, store))
    }

    pub fn session(&self) -> &HarvestSession {
        &self.session
    }

    pub fn profile(&self) -> &HarvesterProfile {
        &self.profile
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Pages granting permission to collect the site
    pub fn permission_urls(&self) -> &[String] {
        &self.session.permission_urls
    }

    /// Consumption hook for the profile's redirect patterns, if it has any
    pub fn redirect_normalizer(&self) -> Option<RedirectNormalizer> {
        RedirectNormalizer::for_profile(&self.profile)
    }

    /// Harvests and returns only the start URLs
    pub async fn start_urls(&mut self) -> Result<Vec<String>, SeedError> {
        Ok(self.harvest().await?.start_urls)
    }

    /// Runs a full harvest from the first page and stores its manifest
    ///
    /// A failure caused by operator-proxy interference is not an error: the
    /// harvest degrades to the profile's fallback URL and says so in the report.
    pub async fn harvest(&mut self) -> Result<HarvestOutcome, SeedError> {
        let origin = self.session.origin_url();
        tracing::info!("Harvesting {} ({} profile)", origin, self.profile.name);

        let (urls, mut report) = match self.discover().await {
            Ok(found) => found,
            Err(e) if self.profile.is_proxy_interference(&e) => {
                let fallback = self.profile.fallback_url(&self.session);
                tracing::warn!(
                    "Harvest of {} blocked by proxy ({}); using fallback start URL {}",
                    origin,
                    e,
                    fallback
                );
                let report = HarvestReport {
                    degraded: true,
                    ..HarvestReport::default()
                };
                (BTreeSet::from([fallback]), report)
            }
            Err(e) => return Err(e),
        };

        let start_urls = materialize(urls, &origin, self.session.fail_on_empty, &mut self.store)?;
        report.start_urls = start_urls.len() as u64;
        report.manifest_key = Some(origin);

        tracing::info!(
            "Harvest finished: {} records seen, {} matched, {} start URLs",
            report.records_seen,
            report.records_matched,
            report.start_urls
        );
        Ok(HarvestOutcome { start_urls, report })
    }

    /// Walks every record and collects the accepted URLs
    async fn discover(&self) -> Result<(BTreeSet<String>, HarvestReport), SeedError> {
        let mapper = UrlMapper::new(&self.profile, &self.session.base_url);
        let rule = self.session.filter_rule.as_ref();
        let profile = &self.profile;

        let ((urls, mut report), stats) = self
            .session
            .records(&self.client)
            .fold(
                (BTreeSet::new(), HarvestReport::default()),
                |(mut urls, mut report), record| {
                    report.records_seen += 1;
                    if rule.map_or(false, |rule| !rule.matches(&record)) {
                        return (urls, report);
                    }
                    report.records_matched += 1;

                    match mapper.resolve(&record) {
                        None => report.records_without_url += 1,
                        Some(found) if !profile.within_crawl_rules(&found.url) => {
                            tracing::warn!(
                                "Start URL {} from record {} not within crawl rules",
                                found.url,
                                found.origin_identifier
                            );
                            report.outside_crawl_rules += 1;
                        }
                        Some(found) => {
                            if !urls.insert(found.url) {
                                report.duplicates += 1;
                            }
                        }
                    }
                    (urls, report)
                },
            )
            .await?;

        report.pages_fetched = stats.pages_fetched;
        report.deleted_skipped = stats.deleted_skipped;
        Ok((urls, report))
    }
}

impl<S: ContentStore> std::fmt::Debug for OaiCrawlSeed<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OaiCrawlSeed")
            .field("session", &self.session)
            .field("profile", &self.profile.name)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
