//! Start-URL manifest documents
//!
//! The discovered start URLs are persisted as a minimal HTML page, one link
//! per line, so the crawl engine can follow them and an operator can audit
//! them in a browser.

use crate::storage::{ContentStore, StorageResult};
use quick_xml::escape::{escape, unescape};

/// Content type the manifest is stored with
pub const MANIFEST_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Renders the manifest for `urls`, in the order given
///
/// # Examples
///
/// ```
/// use oai_seed::output::render_manifest;
///
/// let html = render_manifest(&["https://repo.example.edu/handle/1/1".to_string()]);
/// assert_eq!(
///     html,
///     "<html>\n<a href=\"https://repo.example.edu/handle/1/1\">https://repo.example.edu/handle/1/1</a><br/>\n</html>"
/// );
/// ```
pub fn render_manifest(urls: &[String]) -> String {
    let mut html = String::from("<html>\n");
    for url in urls {
        let url = escape(url.as_str());
        html.push_str(&format!("<a href=\"{}\">{}</a><br/>\n", url, url));
    }
    html.push_str("</html>");
    html
}

/// Extracts the link targets from a rendered manifest
pub fn parse_manifest(html: &str) -> Vec<String> {
    html.lines()
        .filter_map(|line| line.strip_prefix("<a href=\""))
        .filter_map(|rest| rest.split_once('"'))
        .map(|(href, _)| match unescape(href) {
            Ok(url) => url.into_owned(),
            Err(_) => href.to_string(),
        })
        .collect()
}

/// Headers the manifest is stored with
pub fn manifest_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), MANIFEST_CONTENT_TYPE.to_string())]
}

/// Loads the start URLs of the manifest stored under `key`
pub fn load_manifest(store: &dyn ContentStore, key: &str) -> StorageResult<Option<Vec<String>>> {
    Ok(store
        .load(key)?
        .map(|content| parse_manifest(&String::from_utf8_lossy(&content.body))))
}
