use crate::UrlError;
use url::Url;

/// Validates and parses the root URL of a scan
///
/// # Rules
///
/// 1. The URL must parse
/// 2. The scheme must be `http` or `https`
/// 3. The URL must carry a host
///
/// The fragment is dropped; everything else is kept as given.
///
/// # Examples
///
/// ```
/// use a11y_crawl::url::normalize_root_url;
///
/// let url = normalize_root_url("https://Example.com/start#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/start");
/// assert!(normalize_root_url("ftp://example.com/").is_err());
/// ```
pub fn normalize_root_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Builds the crawl key of a URL: origin + path + query
///
/// The fragment is stripped so that `#section` variants of one resource
/// collapse to a single entry. An empty query (`?` alone) is dropped.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use a11y_crawl::url::page_key;
///
/// let url = Url::parse("https://example.com/docs?page=2#intro").unwrap();
/// assert_eq!(page_key(&url), "https://example.com/docs?page=2");
/// ```
pub fn page_key(url: &Url) -> String {
    let mut key = url.origin().ascii_serialization();
    key.push_str(url.path());

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        key.push('?');
        key.push_str(query);
    }

    key
}
