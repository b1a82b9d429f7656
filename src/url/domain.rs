use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use oai_seed::url::extract_domain;
///
/// let url = Url::parse("https://REPOSITORY.example.edu/handle/1/2").unwrap();
/// assert_eq!(extract_domain(&url), Some("repository.example.edu".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Host with any leading `www.` removed
fn site_name(url: &Url) -> Option<String> {
    extract_domain(url).map(|host| match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    })
}

/// Returns true if both URLs name the same site
///
/// Case and a `www.` prefix on the host are ignored, as are scheme and port:
/// repositories routinely advertise `http://` identifiers for an `https://` site.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (site_name(a), site_name(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain(&url("https://Repo.Example.EDU:8443/x")),
            Some("repo.example.edu".to_string())
        );
    }

    #[test]
    fn test_extract_domain_without_host() {
        assert_eq!(extract_domain(&url("mailto:admin@example.edu")), None);
    }

    #[test]
    fn test_same_site_ignores_scheme_and_www() {
        assert!(same_site(
            &url("http://www.repo.example.edu/handle/1/2"),
            &url("https://repo.example.edu/")
        ));
        assert!(same_site(
            &url("http://repo.example.edu:8080/"),
            &url("https://REPO.example.edu/")
        ));
    }

    #[test]
    fn test_same_site_different_hosts() {
        assert!(!same_site(
            &url("https://other.example.edu/"),
            &url("https://repo.example.edu/")
        ));
        assert!(!same_site(
            &url("https://sub.repo.example.edu/"),
            &url("https://repo.example.edu/")
        ));
    }
}
