//! URL handling module
//!
//! Base URL parsing, host comparison, and the rewrites that turn harvested
//! identifiers into URLs on the harvested site.

mod domain;
mod normalize;

pub use domain::{extract_domain, same_site};
pub use normalize::{parse_base_url, rebase_url, rewrite_resolver_url};
