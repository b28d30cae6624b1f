//! Link extraction from a live page
//!
//! The in-page script only collects the resolved `href` of every anchor and
//! the current location. Filtering is done by [`crate::url::filter_link`].

use crate::browser::PageHandle;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

const COLLECT_LINKS: &str = r#"(() => ({
  location: window.location.href,
  hrefs: Array.from(document.querySelectorAll('a[href]'), (a) => a.href)
}))()"#;

#[derive(Debug, Deserialize)]
struct CollectedLinks {
    location: String,

    #[serde(default)]
    hrefs: Vec<Option<String>>,
}

/// Returns the followable links of the page currently loaded in `page`
///
/// Links are filtered against `base`, keyed as origin + path + query and
/// deduplicated in document order. Any failure yields an empty list.
///
/// # Arguments
///
/// * `page` - A page that has finished loading
/// * `base` - The root URL of the scan
pub async fn extract_links(page: &dyn PageHandle, base: &Url) -> Vec<String> {
    let value = match page.evaluate(COLLECT_LINKS).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Link extraction failed: {}", e);
            return Vec::new();
        }
    };

    let collected: CollectedLinks = match serde_json::from_value(value) {
        Ok(collected) => collected,
        Err(e) => {
            tracing::warn!("Unexpected link extraction result: {}", e);
            return Vec::new();
        }
    };

    let current = match Url::parse(&collected.location) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Page reported an invalid location {}: {}", collected.location, e);
            return Vec::new();
        }
    };

    filter_hrefs(collected.hrefs.iter().flatten(), base, &current)
}

fn filter_hrefs<'a, I>(hrefs: I, base: &Url, current: &Url) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    hrefs
        .into_iter()
        .filter_map(|href| crate::url::filter_link(href, base, current))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
