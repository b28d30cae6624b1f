use crate::scan::IssueCounts;

const CRITICAL_WEIGHT: f64 = 5.0;
const WARNING_WEIGHT: f64 = 2.0;
const INFO_WEIGHT: f64 = 1.0;

/// Computes the 0-100 accessibility score of a scan
///
/// The weighted issue count is divided by the square root of the page count,
/// so larger sites are not penalized linearly for their size.
///
/// # Arguments
///
/// * `issues` - Aggregated issue counts of the scan
/// * `pages_scanned` - Number of pages that were audited (clamped to at least 1)
///
/// # Returns
///
/// 100 when there are no issues, otherwise
/// `round(clamp(100 - weighted / sqrt(pages) * 2, 0, 100))`
///
/// # Example
///
/// ```
/// use a11y_crawl::scan::{accessibility_score, IssueCounts};
///
/// let issues = IssueCounts { total: 3, critical: 2, warning: 1, info: 0 };
/// assert_eq!(accessibility_score(&issues, 4), 88);
/// ```
pub fn accessibility_score(issues: &IssueCounts, pages_scanned: u32) -> u8 {
    if issues.total == 0 {
        return 100;
    }

    let weighted = issues.critical as f64 * CRITICAL_WEIGHT
        + issues.warning as f64 * WARNING_WEIGHT
        + issues.info as f64 * INFO_WEIGHT;

    let pages = f64::from(pages_scanned.max(1));
    let penalty = weighted / pages.sqrt() * 2.0;

    (100.0 - penalty).clamp(0.0, 100.0).round() as u8
}
