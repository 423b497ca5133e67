//! Run configuration for the scraper.
//!
//! Everything the pipeline needs to know about the outside world lives in
//! [`ScraperConfig`]: where the listing page is, how to identify ourselves,
//! where the store and the spreadsheet go, and how long to pause between
//! requests. [`ScraperConfig::default`] reproduces the production setup; tests
//! build their own with fixture URLs, scratch paths and zero delays.

use std::path::PathBuf;
use std::time::Duration;

/// Listing page of the Inria careers site (English, classic layout).
pub const DEFAULT_LISTING_URL: &str = "https://jobs.inria.fr/public/classic/en/offres";

/// Browser-like identification sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// SQLite file holding the scraped postings.
pub const DEFAULT_DB_PATH: &str = "inria_jobs.db";

/// Settings for one scrape-persist-export run.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Absolute URL of the listing page. Relative links found on it are
    /// resolved against this URL.
    pub listing_url: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// SQLite store location.
    pub db_path: PathBuf,
    /// Directory receiving the timestamped spreadsheet.
    pub output_dir: PathBuf,
    /// Pause taken by the detail extractor before returning.
    pub detail_delay: Duration,
    /// Pause taken by the listing fetcher after each kept posting.
    pub item_delay: Duration,
    /// When set, the raw listing HTML is written here for inspection.
    pub dump_listing_html: Option<PathBuf>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(15),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            output_dir: PathBuf::from("."),
            detail_delay: Duration::from_secs(1),
            item_delay: Duration::from_secs(2),
            dump_listing_html: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_production_constants() {
        let config = ScraperConfig::default();
        assert_eq!(config.listing_url, DEFAULT_LISTING_URL);
        assert_eq!(config.db_path, PathBuf::from("inria_jobs.db"));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.detail_delay < config.item_delay);
        assert!(config.dump_listing_html.is_none());
    }
}
