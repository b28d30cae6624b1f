//! URL handling module for a11y-crawl
//!
//! This module provides root URL validation, hostname comparison and the
//! filtering rules applied to every link found on a crawled page.

mod domain;
mod normalize;

use url::Url;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use normalize::{normalize_root_url, page_key};

/// Filters a raw link found on a page
///
/// Returns the crawl key (origin + path + query) of the link, or `None` if
/// the link must not be followed.
///
/// # Rules
///
/// **Exclude:**
/// - Malformed hrefs
/// - Schemes other than `http` / `https` (`mailto:`, `tel:`, `javascript:`, ...)
/// - Links to another hostname than `base`
/// - Same-page anchors: a fragment pointing at the path of the current page
///
/// # Arguments
///
/// * `href` - The href as resolved by the page (relative hrefs are joined on `current`)
/// * `base` - The root URL of the scan
/// * `current` - The location of the page the link was found on
///
/// # Examples
///
/// ```
/// use a11y_crawl::url::filter_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let current = Url::parse("https://example.com/about").unwrap();
///
/// assert_eq!(
///     filter_link("/contact#form", &base, &current),
///     Some("https://example.com/contact".to_string())
/// );
/// assert_eq!(filter_link("#team", &base, &current), None);
/// assert_eq!(filter_link("https://other.com/", &base, &current), None);
/// ```
pub fn filter_link(href: &str, base: &Url, current: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let url = current.join(href).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    if !same_host(&url, base) {
        return None;
    }

    if url.fragment().is_some() && url.path() == current.path() {
        return None;
    }

    Some(page_key(&url))
}
