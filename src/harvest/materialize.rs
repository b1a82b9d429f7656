use crate::output::{manifest_headers, render_manifest};
use crate::storage::ContentStore;
use crate::SeedError;
use std::collections::BTreeSet;

/// Persists the start URLs as a manifest stored under `origin_url`
///
/// # Arguments
///
/// * `urls` - Discovered URLs; the set already dedups and orders them
/// * `origin_url` - First-page `ListRecords` URL, used as the manifest key
/// * `fail_on_empty` - Whether an empty set is an error
/// * `store` - Where the manifest goes
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The start URLs, sorted
/// * `Err(SeedError::NoStartUrls)` - Nothing was found and `fail_on_empty` is set;
///   no manifest is stored
pub fn materialize(
    urls: BTreeSet<String>,
    origin_url: &str,
    fail_on_empty: bool,
    store: &mut dyn ContentStore,
) -> Result<Vec<String>, SeedError> {
    if urls.is_empty() && fail_on_empty {
        return Err(SeedError::NoStartUrls {
            request_url: origin_url.to_string(),
        });
    }

    let urls: Vec<String> = urls.into_iter().collect();
    let html = render_manifest(&urls);
    store.store(origin_url, html.as_bytes(), &manifest_headers())?;

    tracing::info!("Stored manifest of {} start URLs under {}", urls.len(), origin_url);
    Ok(urls)
}
