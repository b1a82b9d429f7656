//! Harvest module
//!
//! This module contains the crawl-seed pipeline:
//! - Sessions and the record pager that walks their `ListRecords` result
//! - Year filter rules
//! - Publisher profiles and the identifier-to-URL mapper
//! - Start-URL materialization and the harvest report

mod filter;
mod mapper;
mod materialize;
mod pager;
mod profile;
mod record;
mod report;
mod seed;
mod session;

pub use filter::{leading_year, matches, parse_target_year, FilterRule, YearMatch};
pub use mapper::{DiscoveredUrl, UrlMapper};
pub use materialize::materialize;
pub use pager::{PagerStats, RecordPager};
pub use profile::{
    cause_chain_contains, set_spec_to_handle, ExtractIdentifierFn, FallbackUrlFn,
    HarvesterProfile, ProxyClassifierFn, RedirectPatterns, DEFAULT_PROXY_MARKER, HANDLE_DOMAIN,
};
pub use record::{dublin_core_record, Record};
pub use report::{HarvestOutcome, HarvestReport};
pub use seed::OaiCrawlSeed;
pub use session::HarvestSession;
