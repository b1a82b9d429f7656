//! Harvest report display

use crate::harvest::HarvestReport;
use crate::storage::RunRecord;

/// Prints a harvest report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Report ===\n");

    println!("Records:");
    println!("  Seen: {}", report.records_seen);
    println!("  Deleted (skipped): {}", report.deleted_skipped);
    println!("  Matched filter: {}", report.records_matched);
    println!("  Without a usable URL: {}", report.records_without_url);
    println!("  Outside crawl rules: {}", report.outside_crawl_rules);
    println!("  Duplicate URLs: {}", report.duplicates);
    println!();

    println!("Pages fetched: {}", report.pages_fetched);
    println!("Start URLs: {}", report.start_urls);
    if let Some(key) = &report.manifest_key {
        println!("Manifest: {}", key);
    }

    if report.degraded {
        println!();
        println!("WARNING: harvest was degraded; the start URL is the profile fallback");
    }
}

/// Prints a run-log entry
pub fn print_run(run: &RunRecord) {
    println!("Run #{} ({})", run.id, run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Origin: {}", run.origin_url);
    println!("  Config hash: {}", run.config_hash);
    if let Some(count) = run.start_url_count {
        println!("  Start URLs: {}", count);
    }
}
