//! Listing page scraper.
//!
//! Fetches the offers page, locates job cards with an ordered chain of
//! [`ListingStrategy`] implementations, keeps the PhD offers and enriches
//! each one from its detail page.
//!
//! # Locating cards
//!
//! | Order | Strategy | Matches |
//! |-------|----------|---------|
//! | 1-6 | [`CardSelector`] | `div.list-offers div.offer`, `table.offer-table tr.offer-item`, `ul.job-list li`, `div.job-listing`, `article.job-offer`, `div.job-card` |
//! | 7 | [`AnchorFallback`] | `a[href*='offre']` with a path segment after `offre/` or `offres/` |
//!
//! The first strategy that matches anything is used for the whole page.

use crate::config::ScraperConfig;
use crate::fetch::PageSource;
use crate::models::{JobDetails, JobPosting, ListingEntry, UNKNOWN_LOCATION};
use crate::scrapers::{detail, inline_text, is_phd_title, job_id_from_link, resolve_link};
use crate::text::{DEFAULT_SUMMARY_LENGTH, create_summary};
use crate::utils::{now_timestamp, truncate_for_log};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Path token identifying offer links in the anchor fallback.
pub const OFFER_LINK_TOKEN: &str = "offre";

const CARD_SELECTORS: [&str; 6] = [
    "div.list-offers div.offer",
    "table.offer-table tr.offer-item",
    "ul.job-list li",
    "div.job-listing",
    "article.job-offer",
    "div.job-card",
];

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h3", "h4", "h2", ".title", "td.offer-title a", "a"]
        .iter()
        .map(|s| Selector::parse(s).expect("title selector is valid"))
        .collect()
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("link selector is valid"));
static ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li").expect("item selector is valid"));
static LOCATION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".location").expect("location selector is valid"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".date").expect("date selector is valid"));

static STRATEGIES: Lazy<Vec<Box<dyn ListingStrategy + Send + Sync>>> = Lazy::new(|| {
    let mut strategies: Vec<Box<dyn ListingStrategy + Send + Sync>> = CARD_SELECTORS
        .iter()
        .map(|s| Box::new(CardSelector::new(s)) as Box<dyn ListingStrategy + Send + Sync>)
        .collect();
    strategies.push(Box::new(AnchorFallback::new(OFFER_LINK_TOKEN)));
    strategies
});

/// One way of finding job entries on the listing page.
pub trait ListingStrategy {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Extract entries from `document`, resolving links against `base`.
    ///
    /// Returns `None` when the strategy does not match the page at all, and
    /// `Some` (possibly empty) when it does.
    fn extract(&self, document: &Html, base: &Url) -> Option<Vec<ListingEntry>>;
}

/// Cards located by a CSS selector, each holding a title, a link and
/// `label: value` list items.
pub struct CardSelector {
    source: &'static str,
    selector: Selector,
}

impl CardSelector {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            selector: Selector::parse(source).expect("card selector is valid"),
        }
    }
}

impl ListingStrategy for CardSelector {
    fn name(&self) -> &str {
        self.source
    }

    fn extract(&self, document: &Html, base: &Url) -> Option<Vec<ListingEntry>> {
        let cards: Vec<ElementRef<'_>> = document.select(&self.selector).collect();
        if cards.is_empty() {
            return None;
        }
        let entries = cards
            .into_iter()
            .enumerate()
            .filter_map(|(ordinal, card)| entry_from_card(card, base, ordinal))
            .collect();
        Some(entries)
    }
}

/// Last resort: every anchor whose target has a segment after the path
/// token (`<token>/<id>` or `<token>s/<id>`). Links to the listing itself
/// are ignored.
pub struct AnchorFallback {
    token: &'static str,
    selector: Selector,
    offer_link: Regex,
}

impl AnchorFallback {
    pub fn new(token: &'static str) -> Self {
        let selector = Selector::parse(&format!("a[href*='{token}']"))
            .expect("anchor selector is valid");
        let offer_link = Regex::new(&format!(r"{}s?/[^/?#\s]+", regex::escape(token)))
            .expect("offer link regex is valid");
        Self {
            token,
            selector,
            offer_link,
        }
    }
}

impl ListingStrategy for AnchorFallback {
    fn name(&self) -> &str {
        "anchor fallback"
    }

    fn extract(&self, document: &Html, base: &Url) -> Option<Vec<ListingEntry>> {
        warn!(token = self.token, "No card selector matched; scanning links directly");
        let entries: Vec<ListingEntry> = document
            .select(&self.selector)
            .filter(|anchor| {
                anchor
                    .value()
                    .attr("href")
                    .is_some_and(|href| self.offer_link.is_match(href))
            })
            .enumerate()
            .map(|(ordinal, anchor)| {
                build_entry(
                    inline_text(anchor),
                    anchor.value().attr("href"),
                    base,
                    ordinal,
                    LabeledFields::default(),
                )
            })
            .collect();
        (!entries.is_empty()).then_some(entries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListingField {
    Location,
    Team,
    Deadline,
    PostedDate,
}

struct LabelRule {
    field: ListingField,
    /// Lower-case fragments; the rule applies when the label contains any.
    keywords: &'static [&'static str],
}

const LABEL_RULES: [LabelRule; 4] = [
    LabelRule {
        field: ListingField::Location,
        keywords: &["town", "city"],
    },
    LabelRule {
        field: ListingField::Team,
        keywords: &["inria team", "team"],
    },
    LabelRule {
        field: ListingField::Deadline,
        keywords: &["deadline"],
    },
    LabelRule {
        field: ListingField::PostedDate,
        keywords: &["posted", "publication"],
    },
];

/// Values collected from a card's `label: value` items. First value wins.
#[derive(Debug, Default)]
struct LabeledFields {
    location: Option<String>,
    team: Option<String>,
    deadline: Option<String>,
    posted_date: Option<String>,
}

impl LabeledFields {
    fn apply(&mut self, item_text: &str) {
        let Some((label, value)) = split_label(item_text) else {
            return;
        };
        let Some(rule) = LABEL_RULES
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| label.contains(k)))
        else {
            return;
        };
        let slot = match rule.field {
            ListingField::Location => &mut self.location,
            ListingField::Team => &mut self.team,
            ListingField::Deadline => &mut self.deadline,
            ListingField::PostedDate => &mut self.posted_date,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }
}

/// Split `"Label : value"` on the first colon into a lower-cased label and a
/// trimmed value. Items without a colon, label or value are ignored.
fn split_label(text: &str) -> Option<(String, &str)> {
    let (label, value) = text.split_once(':')?;
    let label = label.trim().to_lowercase();
    let value = value.trim();
    (!label.is_empty() && !value.is_empty()).then_some((label, value))
}

fn entry_from_card(card: ElementRef<'_>, base: &Url, ordinal: usize) -> Option<ListingEntry> {
    let title = TITLE_SELECTORS.iter().find_map(|selector| {
        card.select(selector)
            .map(inline_text)
            .find(|text| !text.is_empty())
    });
    let Some(title) = title else {
        debug!(ordinal, "Card without a title; skipping");
        return None;
    };
    let href = card
        .select(&LINK_SELECTOR)
        .find_map(|a| a.value().attr("href"));

    let mut fields = LabeledFields::default();
    for item in card.select(&ITEM_SELECTOR) {
        fields.apply(&inline_text(item));
    }
    if fields.location.is_none() {
        fields.location = first_text(card, &LOCATION_SELECTOR);
    }
    if fields.posted_date.is_none() {
        fields.posted_date = first_text(card, &DATE_SELECTOR);
    }

    Some(build_entry(title, href, base, ordinal, fields))
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(inline_text)
        .find(|text| !text.is_empty())
}

/// Assemble an entry, deriving `job_id` from the link or synthesizing a
/// placeholder id and link from `ordinal`.
fn build_entry(
    title: String,
    href: Option<&str>,
    base: &Url,
    ordinal: usize,
    fields: LabeledFields,
) -> ListingEntry {
    let resolved = href
        .and_then(|href| resolve_link(base, href))
        .and_then(|url| job_id_from_link(&url).map(|id| (id, url)));

    let (job_id, link, synthesized) = match resolved {
        Some((job_id, url)) => (job_id, url.to_string(), false),
        None => {
            let job_id = format!("job-{ordinal}");
            let mut placeholder = base.clone();
            placeholder.set_fragment(Some(&job_id));
            (job_id, placeholder.to_string(), true)
        }
    };
    let title = if title.is_empty() {
        format!("Job {job_id}")
    } else {
        title
    };

    ListingEntry {
        job_id,
        title,
        link,
        synthesized,
        location: fields
            .location
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        team: fields.team.unwrap_or_default(),
        posted_date: fields.posted_date.unwrap_or_default(),
        deadline: fields.deadline.unwrap_or_default(),
    }
}

/// Locate job entries on a listing page.
///
/// Strategies are tried in order and the first that matches is used for the
/// whole page. Entries repeating a `job_id` are dropped (first wins).
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);

    for strategy in STRATEGIES.iter() {
        match strategy.extract(&document, base) {
            Some(entries) => {
                info!(
                    strategy = strategy.name(),
                    count = entries.len(),
                    "Found job elements"
                );
                return entries
                    .into_iter()
                    .unique_by(|entry| entry.job_id.clone())
                    .collect();
            }
            None => debug!(strategy = strategy.name(), "Strategy did not match"),
        }
    }

    warn!("Could not find job listings with any strategy");
    Vec::new()
}

/// Fetch the listing page and return the enriched PhD postings.
///
/// Returns an empty vector when the listing page cannot be fetched. Each
/// kept posting costs one detail request, followed by `config.item_delay`.
#[instrument(level = "info", skip_all, fields(url = %config.listing_url))]
pub async fn fetch_jobs<S: PageSource>(source: &S, config: &ScraperConfig) -> Vec<JobPosting> {
    let base = match Url::parse(&config.listing_url) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Listing URL is not a valid absolute URL");
            return Vec::new();
        }
    };

    let html = match source.fetch_page(&config.listing_url).await {
        Ok(html) => html,
        Err(e) => {
            error!(error = %e, "HTTP error occurred while fetching the listing page");
            return Vec::new();
        }
    };
    info!(bytes = html.len(), "Fetched listing page");

    if let Some(path) = &config.dump_listing_html {
        dump_listing_html(path, &html).await;
    }

    let entries = parse_listing(&html, &base);
    let located = entries.len();
    let (kept, skipped): (Vec<ListingEntry>, Vec<ListingEntry>) = entries
        .into_iter()
        .partition(|entry| is_phd_title(&entry.title));
    for entry in &skipped {
        debug!(title = %truncate_for_log(&entry.title, 80), "Skipping non-PhD position");
    }
    info!(located, kept = kept.len(), skipped = skipped.len(), "Classified listing entries");

    let mut jobs = Vec::with_capacity(kept.len());
    for entry in kept {
        info!(job_id = %entry.job_id, title = %truncate_for_log(&entry.title, 80), "Processing job");

        let details = if entry.synthesized {
            debug!(job_id = %entry.job_id, "No detail link; keeping listing fields only");
            JobDetails::default()
        } else {
            detail::fetch_job_details(source, &entry.link, config).await
        };
        if details.is_phd == Some(false) {
            debug!(
                job_id = %entry.job_id,
                "Detail heading is not a PhD title; keeping listing classification"
            );
        }

        let summary = create_summary(
            details.full_description.as_deref().unwrap_or_default(),
            DEFAULT_SUMMARY_LENGTH,
        );
        jobs.push(JobPosting::from_parts(entry, details, summary, now_timestamp()));

        sleep(config.item_delay).await;
    }

    info!(count = jobs.len(), "Fetched PhD positions");
    jobs
}

async fn dump_listing_html(path: &Path, html: &str) {
    match tokio::fs::write(path, html).await {
        Ok(()) => info!(path = %path.display(), "Saved listing page HTML for inspection"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to save listing page HTML"),
    }
}
