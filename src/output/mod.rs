//! Output module for harvest results
//!
//! This module handles:
//! - Rendering and reading back the start-URL manifest
//! - Printing harvest reports and run-log entries

mod manifest;
pub mod stats;

pub use manifest::{
    load_manifest, manifest_headers, parse_manifest, render_manifest, MANIFEST_CONTENT_TYPE,
};
pub use stats::{print_report, print_run};
