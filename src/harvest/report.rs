/// What a harvest saw and kept, for audit output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Live records returned by the server
    pub records_seen: u64,
    pub deleted_skipped: u64,
    /// Records accepted by the filter rule (all of them when there is none)
    pub records_matched: u64,
    pub records_without_url: u64,
    pub outside_crawl_rules: u64,
    /// URLs already discovered from an earlier record
    pub duplicates: u64,
    pub pages_fetched: u64,
    pub start_urls: u64,
    /// Discovery failed and the profile fallback was used instead
    pub degraded: bool,
    pub manifest_key: Option<String>,
}

/// Result of a successful harvest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOutcome {
    /// Deduplicated, sorted
    pub start_urls: Vec<String>,
    pub report: HarvestReport,
}
