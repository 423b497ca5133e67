//! Data models for scraped job postings.
//!
//! - [`ListingEntry`]: one card located on the listing page, before the PhD
//!   gate and before any detail fetch
//! - [`JobDetails`]: the partial result of scraping a posting's detail page
//! - [`JobPosting`]: the merged record persisted to the store and exported

/// Location used when the listing does not name a town or city.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// A job card as found on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Natural key derived from the link's last path segment.
    pub job_id: String,
    /// Title as shown on the card.
    pub title: String,
    /// Absolute link to the detail page.
    pub link: String,
    /// `true` when no usable link was found and `job_id`/`link` are placeholders.
    pub synthesized: bool,
    pub location: String,
    pub team: String,
    pub posted_date: String,
    pub deadline: String,
}

/// Fields recovered from a detail page.
///
/// Every field is optional: a failed fetch or a missing label leaves the
/// corresponding field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetails {
    pub full_description: Option<String>,
    pub keywords: Option<String>,
    pub supervisor: Option<String>,
    pub funding: Option<String>,
    pub deadline: Option<String>,
    pub team: Option<String>,
    /// Classification of the detail page's own heading.
    pub is_phd: Option<bool>,
}

/// A scraped posting, one row of the `jobs` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPosting {
    pub job_id: String,
    pub title: String,
    pub location: String,
    pub team: String,
    pub posted_date: String,
    pub deadline: String,
    /// First sentences of the description, truncated.
    pub summary: String,
    pub link: String,
    /// Comma-joined terms.
    pub keywords: String,
    pub supervisor: String,
    pub funding: String,
    pub is_phd: bool,
    /// ISO-8601 local timestamp of the run that last wrote this row.
    pub last_updated: String,
}

impl JobPosting {
    /// Merge a listing card with its detail page.
    ///
    /// Supervisor, funding and keywords come from the detail page. Team and
    /// deadline prefer the listing card and only fall back to the detail page
    /// when the card left them empty.
    pub fn from_parts(
        entry: ListingEntry,
        details: JobDetails,
        summary: String,
        last_updated: String,
    ) -> Self {
        let team = if entry.team.is_empty() {
            details.team.unwrap_or_default()
        } else {
            entry.team
        };
        let deadline = if entry.deadline.is_empty() {
            details.deadline.unwrap_or_default()
        } else {
            entry.deadline
        };

        Self {
            job_id: entry.job_id,
            title: entry.title,
            location: entry.location,
            team,
            posted_date: entry.posted_date,
            deadline,
            summary,
            link: entry.link,
            keywords: details.keywords.unwrap_or_default(),
            supervisor: details.supervisor.unwrap_or_default(),
            funding: details.funding.unwrap_or_default(),
            is_phd: true,
            last_updated,
        }
    }
}
