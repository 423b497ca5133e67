//! Scrapers for the Inria careers site.
//!
//! Scraping happens in two phases:
//!
//! 1. **Listing**: [`listing::fetch_jobs`] reads the offers page, locates the
//!    job cards and keeps the PhD offers.
//! 2. **Details**: [`detail::fetch_job_details`] runs on each kept offer to
//!    pull the description, supervisor, funding and theme.
//!
//! # Structure discovery
//!
//! The site's markup is not under our control, so both phases try an ordered
//! list of CSS selectors and take the first one that matches. Free-text
//! fields are recovered with small tables of labeled rules rather than
//! per-field code paths.
//!
//! Both phases share the classification rule [`is_phd_title`] and the text
//! helpers below.

pub mod detail;
pub mod listing;

use scraper::ElementRef;
use url::Url;

/// Lower-cased title prefixes that mark a PhD offer (English, French).
pub const PHD_TITLE_PREFIXES: [&str; 2] = ["phd position f/m", "doctorant f/h"];

pub(crate) const INVISIBLE_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Classify a posting title as a PhD offer.
///
/// The title is trimmed and lower-cased, then checked against
/// [`PHD_TITLE_PREFIXES`].
///
/// # Examples
///
/// ```ignore
/// assert!(is_phd_title("  PhD Position F/M (M/F) Something "));
/// assert!(!is_phd_title("Engineer position"));
/// ```
pub fn is_phd_title(title: &str) -> bool {
    let title = title.trim().to_lowercase();
    PHD_TITLE_PREFIXES
        .iter()
        .any(|prefix| title.starts_with(prefix))
}

/// Text nodes under `root` that a reader would see, trimmed, one per line.
pub(crate) fn visible_text(root: ElementRef<'_>) -> String {
    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(ElementRef::wrap)?;
            if INVISIBLE_ELEMENTS.contains(&parent.value().name()) {
                return None;
            }
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// All text under `element`, whitespace collapsed.
pub(crate) fn inline_text(element: ElementRef<'_>) -> String {
    crate::text::normalize_whitespace(&element.text().collect::<String>())
}

/// Resolve `href` against `base`. Fragments, empty links and non-HTTP schemes yield `None`.
pub(crate) fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Natural key of a posting: the last non-empty path segment of its link.
pub(crate) fn job_id_from_link(link: &Url) -> Option<String> {
    link.path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(str::to_string)
}
