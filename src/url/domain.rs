use url::Url;

/// Extracts the hostname from a URL
///
/// The port is not part of the hostname, so `http://example.com:8080/` and
/// `https://example.com/` share the hostname `example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use a11y_crawl::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs carry the same hostname
///
/// URLs without a host never match anything.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
