//! The scrape-persist-export run.
//!
//! A run is a straight line with no retries:
//!
//! 1. reset the store and (re)create the schema
//! 2. fetch the listing and enrich each PhD offer from its detail page
//! 3. upsert the offers
//! 4. export them to a spreadsheet
//!
//! The store is reset at the start of every run, so it only ever holds the
//! offers of the latest listing page.

use crate::config::ScraperConfig;
use crate::fetch::{HttpPageSource, PageSource};
use crate::outputs::spreadsheet;
use crate::scrapers::listing;
use crate::store::JobStore;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// PhD offers scraped from the listing.
    pub fetched: usize,
    /// Offers inserted into the store.
    pub inserted: usize,
    /// Written spreadsheet, if any.
    pub export_path: Option<PathBuf>,
}

/// Run against the live site.
pub async fn run(config: &ScraperConfig) -> Result<RunSummary, Box<dyn Error>> {
    let source = HttpPageSource::new(config)?;
    run_with_source(&source, config).await
}

/// Run with pages coming from `source`.
///
/// Errors only when the store or the export file cannot be written. A
/// failed listing fetch ends the run early with an empty summary.
#[instrument(level = "info", skip_all, fields(db = %config.db_path.display()))]
pub async fn run_with_source<S: PageSource>(
    source: &S,
    config: &ScraperConfig,
) -> Result<RunSummary, Box<dyn Error>> {
    let mut store = JobStore::open(&config.db_path)?;
    store.reset()?;

    let jobs = listing::fetch_jobs(source, config).await;
    if jobs.is_empty() {
        warn!("No jobs fetched on this run. Check the HTML dump to inspect the page structure.");
        return Ok(RunSummary::default());
    }

    let inserted = store.upsert(&jobs)?;
    info!(inserted, stored = store.count()?, "Store updated");
    let export_path = spreadsheet::export_phd_postings(&store, &config.output_dir).await?;
    match &export_path {
        Some(path) => info!(path = %path.display(), "Process complete"),
        None => warn!("Export failed - no data was written to the spreadsheet"),
    }

    Ok(RunSummary {
        fetched: jobs.len(),
        inserted,
        export_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fixtures::FixturePages;
    use crate::models::JobPosting;
    use crate::outputs::spreadsheet::read_exported_rows;
    use std::time::Duration;

    const LISTING_URL: &str = "https://jobs.inria.fr/public/classic/en/offres";
    const DETAIL_URL: &str = "https://jobs.inria.fr/offres/2025-001";

    const LISTING_HTML: &str = r#"
        <html><body><div class="list-offers">
          <div class="offer">
            <h3>PhD Position F/M Study of X</h3>
            <a href="/offres/2025-001">Details</a>
            <ul><li>Town/city : Grenoble</li></ul>
          </div>
          <div class="offer">
            <h3>Research Engineer F/M Tooling</h3>
            <a href="/offres/2025-002">Details</a>
          </div>
        </div></body></html>
    "#;

    const DETAIL_HTML: &str = r#"
        <html><body>
          <h1>PhD Position F/M Study of X</h1>
          <div class="content-offre">
            <p>Study X in depth. Then write a thesis.</p>
            <p>PhD Supervisor : Jane Doe</p>
            <p>Theme/Domain : Networks, Systems</p>
          </div>
        </body></html>
    "#;

    fn config(dir: &std::path::Path) -> ScraperConfig {
        ScraperConfig {
            listing_url: LISTING_URL.to_string(),
            db_path: dir.join("jobs.db"),
            output_dir: dir.join("exports"),
            detail_delay: Duration::ZERO,
            item_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn stored(config: &ScraperConfig) -> Vec<JobPosting> {
        JobStore::open(&config.db_path).unwrap().phd_postings().unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_run() {
        let temp = tempfile::tempdir().unwrap();
        let config = config(temp.path());
        let source = FixturePages::new()
            .with_page(LISTING_URL, LISTING_HTML)
            .with_page(DETAIL_URL, DETAIL_HTML);

        let summary = run_with_source(&source, &config).await.unwrap();

        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.inserted, 1);
        let path = summary.export_path.expect("spreadsheet written");
        let sheet = read_exported_rows(&path);
        assert_eq!(sheet.len(), 2);
        assert!(!sheet[0].iter().any(|name| name == "is_phd"));
        assert_eq!(sheet[1][0], "2025-001");
        assert_eq!(sheet[1][1], "PhD Position F/M Study of X");
        assert_eq!(sheet[1][8], "Networks, Systems");
        assert_eq!(sheet[1][9], "Jane Doe");

        let rows = stored(&config);
        assert_eq!(rows.len(), 1);
        let job = &rows[0];
        assert_eq!(job.job_id, "2025-001");
        assert!(job.is_phd);
        assert_eq!(job.supervisor, "Jane Doe");
        assert!(job.keywords.contains("Networks, Systems"));
        assert_eq!(job.location, "Grenoble");
        assert_eq!(job.summary, "Study X in depth. Then write a thesis.");
        assert_eq!(job.link, DETAIL_URL);
    }

    #[tokio::test]
    async fn test_run_resets_previous_contents() {
        let temp = tempfile::tempdir().unwrap();
        let config = config(temp.path());
        {
            let mut store = JobStore::open(&config.db_path).unwrap();
            store.ensure_schema().unwrap();
            let delisted = JobPosting {
                job_id: "1999-999".to_string(),
                title: "PhD Position F/M Long gone".to_string(),
                location: "Paris".to_string(),
                team: String::new(),
                posted_date: String::new(),
                deadline: String::new(),
                summary: String::new(),
                link: "https://jobs.inria.fr/offres/1999-999".to_string(),
                keywords: String::new(),
                supervisor: String::new(),
                funding: String::new(),
                is_phd: true,
                last_updated: "2025-01-01T00:00:00".to_string(),
            };
            store.upsert(&[delisted]).unwrap();
        }
        let source = FixturePages::new()
            .with_page(LISTING_URL, LISTING_HTML)
            .with_page(DETAIL_URL, DETAIL_HTML);

        let summary = run_with_source(&source, &config).await.unwrap();

        assert_eq!(summary.inserted, 1);
        let ids: Vec<String> = stored(&config).into_iter().map(|j| j.job_id).collect();
        assert_eq!(ids, vec!["2025-001"]);
    }

    #[tokio::test]
    async fn test_listing_failure_writes_no_export() {
        let temp = tempfile::tempdir().unwrap();
        let config = config(temp.path());
        let source = FixturePages::new();

        let summary = run_with_source(&source, &config).await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert!(!config.output_dir.exists());
        assert!(stored(&config).is_empty());
    }

    #[tokio::test]
    async fn test_no_phd_offers_writes_no_export() {
        let temp = tempfile::tempdir().unwrap();
        let config = config(temp.path());
        let listing = r#"<div class="job-card"><h3>Engineer position</h3><a href="/offres/9">x</a></div>"#;
        let source = FixturePages::new().with_page(LISTING_URL, listing);

        let summary = run_with_source(&source, &config).await.unwrap();

        assert_eq!(summary.fetched, 0);
        assert!(summary.export_path.is_none());
        assert!(!config.output_dir.exists());
        assert_eq!(source.requests(), vec![LISTING_URL.to_string()]);
    }
}
