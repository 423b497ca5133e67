//! Command-line interface definitions.
//!
//! Running the binary without arguments performs a full production run
//! against the Inria careers site. The optional flags only override the
//! defaults in [`ScraperConfig`], which is handy for pointing the scraper at a
//! saved page or keeping the store and spreadsheet out of the working
//! directory.

use crate::config::ScraperConfig;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Production run, everything in the current directory
/// inria_phd_jobs
///
/// # Keep the database and spreadsheets elsewhere, dump the listing page
/// inria_phd_jobs --db /var/lib/phd/jobs.db --output-dir /srv/exports --dump-html listing.html
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// SQLite file holding scraped postings
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Directory for the timestamped spreadsheet
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Listing page to scrape
    #[arg(long)]
    pub listing_url: Option<String>,

    /// Write the raw listing HTML to this file
    #[arg(long)]
    pub dump_html: Option<PathBuf>,
}

impl Cli {
    /// Apply the flags on top of the default configuration.
    pub fn into_config(self) -> ScraperConfig {
        let mut config = ScraperConfig::default();
        if let Some(db) = self.db {
            config.db_path = db;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(url) = self.listing_url {
            config.listing_url = url;
        }
        config.dump_listing_html = self.dump_html;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LISTING_URL;

    #[test]
    fn test_cli_without_flags_uses_defaults() {
        let config = Cli::parse_from(["inria_phd_jobs"]).into_config();

        assert_eq!(config.listing_url, DEFAULT_LISTING_URL);
        assert_eq!(config.db_path, PathBuf::from("inria_jobs.db"));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.dump_listing_html.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Cli::parse_from([
            "inria_phd_jobs",
            "--db",
            "/tmp/jobs.db",
            "-o",
            "/tmp/exports",
            "--listing-url",
            "http://localhost:8080/offres",
            "--dump-html",
            "/tmp/listing.html",
        ])
        .into_config();

        assert_eq!(config.db_path, PathBuf::from("/tmp/jobs.db"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/exports"));
        assert_eq!(config.listing_url, "http://localhost:8080/offres");
        assert_eq!(
            config.dump_listing_html,
            Some(PathBuf::from("/tmp/listing.html"))
        );
    }
}
