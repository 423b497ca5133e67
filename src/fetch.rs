//! Page retrieval.
//!
//! The scrapers never talk to `reqwest` directly; they go through the
//! [`PageSource`] trait. [`HttpPageSource`] is the production implementation.
//! Tests swap in [`fixtures::FixturePages`], which serves canned HTML by URL.

use crate::config::ScraperConfig;
use reqwest::Client;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Something that can hand back the HTML body of a URL.
pub trait PageSource {
    /// Fetch `url` and return its body.
    ///
    /// Non-2xx statuses are errors.
    async fn fetch_page(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// [`PageSource`] backed by a `reqwest` client.
///
/// Every request carries the configured `User-Agent` and timeout. There is
/// no retry.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(config: &ScraperConfig) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch_page(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "Request failed");
                return Err(e.into());
            }
        };
        let status = response.status();
        let body = response.error_for_status()?.text().await?;
        debug!(
            %status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Fetched page"
        );
        Ok(body)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::FixturePages;
    use super::*;

    #[test]
    fn test_http_source_builds_from_default_config() {
        assert!(HttpPageSource::new(&ScraperConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fixture_pages_serve_and_record() {
        let pages = FixturePages::new().with_page("https://example.org/a", "<p>a</p>");

        assert_eq!(
            pages.fetch_page("https://example.org/a").await.unwrap(),
            "<p>a</p>"
        );
        assert!(pages.fetch_page("https://example.org/missing").await.is_err());
        assert_eq!(
            pages.requests(),
            vec!["https://example.org/a", "https://example.org/missing"]
        );
    }
}
