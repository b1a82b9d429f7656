use crate::url::domain::same_site;
use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a site base URL
///
/// Only HTTP and HTTPS are accepted. The path always ends with `/` so that
/// relative joins land underneath the base instead of replacing its last
/// segment.
///
/// # Examples
///
/// ```
/// use oai_seed::url::parse_base_url;
///
/// let base = parse_base_url("https://repo.example.edu/jspui").unwrap();
/// assert_eq!(base.as_str(), "https://repo.example.edu/jspui/");
/// ```
pub fn parse_base_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_fragment(None);

    Ok(url)
}

/// Moves a URL on the base site onto the base's scheme, host and port
///
/// URLs on other sites are returned unchanged.
pub fn rebase_url(url: &Url, base: &Url) -> UrlResult<Url> {
    if !same_site(url, base) {
        return Ok(url.clone());
    }

    let mut rebased = url.clone();
    rebased
        .set_scheme(base.scheme())
        .map_err(|_| UrlError::Malformed(format!("Cannot change scheme of {}", url)))?;
    rebased
        .set_host(base.host_str())
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    rebased
        .set_port(base.port())
        .map_err(|_| UrlError::Malformed(format!("Cannot change port of {}", url)))?;

    Ok(rebased)
}

/// Rewrites an identifier on an external resolver domain to a path on the base site
///
/// `http://hdl.handle.net/123456789/1` with domain `hdl.handle.net` and prefix
/// `handle/` becomes `<base>handle/123456789/1`. Returns `None` when the
/// identifier is not on `domain`.
pub fn rewrite_resolver_url(
    identifier: &Url,
    domain: &str,
    base: &Url,
    prefix: &str,
) -> Option<Url> {
    let host = identifier.host_str()?;
    if !host.eq_ignore_ascii_case(domain) {
        return None;
    }

    let mut target = format!("{}{}", prefix, identifier.path().trim_start_matches('/'));
    if let Some(query) = identifier.query() {
        target.push('?');
        target.push_str(query);
    }
    base.join(&target).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_parse_base_url_adds_slash() {
        assert_eq!(
            parse_base_url("https://repo.example.edu").unwrap().as_str(),
            "https://repo.example.edu/"
        );
        assert_eq!(
            parse_base_url("https://repo.example.edu/dspace/").unwrap().as_str(),
            "https://repo.example.edu/dspace/"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_bad_input() {
        assert!(matches!(parse_base_url("not a url"), Err(UrlError::Parse(_))));
        assert!(matches!(
            parse_base_url("ftp://repo.example.edu/"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_rebase_scheme_and_www() {
        let base = url("https://repo.example.edu/");
        let rebased = rebase_url(&url("http://www.repo.example.edu/handle/1/2"), &base).unwrap();
        assert_eq!(rebased.as_str(), "https://repo.example.edu/handle/1/2");
    }

    #[test]
    fn test_rebase_port() {
        let base = url("https://repo.example.edu/");
        let rebased = rebase_url(&url("http://repo.example.edu:8080/x?y=1"), &base).unwrap();
        assert_eq!(rebased.as_str(), "https://repo.example.edu/x?y=1");
    }

    #[test]
    fn test_rebase_leaves_other_sites() {
        let base = url("https://repo.example.edu/");
        let other = url("http://journals.example.org/a");
        assert_eq!(rebase_url(&other, &base).unwrap(), other);
    }

    #[test]
    fn test_rewrite_resolver_url() {
        let base = url("https://repo.example.edu/");
        let rewritten = rewrite_resolver_url(
            &url("http://hdl.handle.net/123456789/1"),
            "hdl.handle.net",
            &base,
            "handle/",
        )
        .unwrap();
        assert_eq!(rewritten.as_str(), "https://repo.example.edu/handle/123456789/1");
    }

    #[test]
    fn test_rewrite_resolver_url_under_base_path() {
        let base = url("https://repo.example.edu/jspui/");
        let rewritten = rewrite_resolver_url(
            &url("https://HDL.handle.net/10.1234/5"),
            "hdl.handle.net",
            &base,
            "handle/",
        )
        .unwrap();
        assert_eq!(rewritten.as_str(), "https://repo.example.edu/jspui/handle/10.1234/5");
    }

    #[test]
    fn test_rewrite_resolver_url_other_domain() {
        let base = url("https://repo.example.edu/");
        assert!(rewrite_resolver_url(
            &url("https://doi.org/10.1000/1"),
            "hdl.handle.net",
            &base,
            "handle/"
        )
        .is_none());
    }
}
