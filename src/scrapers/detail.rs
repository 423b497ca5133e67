//! Detail page scraper.
//!
//! Pulls the free-text fields of one offer out of its detail page. Every
//! field is optional and recovered independently; nothing here fails the run.

use crate::config::ScraperConfig;
use crate::fetch::PageSource;
use crate::models::JobDetails;
use crate::scrapers::{INVISIBLE_ELEMENTS, inline_text, is_phd_title, visible_text};
use crate::text::{DEFAULT_KEYWORD_COUNT, extract_keywords};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::time::sleep;
use tracing::{debug, error, instrument};

/// Containers tried, in order, for the offer description.
const DESCRIPTION_SELECTORS: [&str; 6] = [
    "div.content-offre",
    "div.job-description",
    "div#offer-description",
    "div.content",
    "article.job-detail",
    "main",
];

// Longer values are paragraphs that happen to mention a label, not the label's value.
const MAX_LABELED_VALUE_CHARS: usize = 200;

// A `Label :` line. A rule whose own value is empty would otherwise capture
// the next label through the newline.
static LABEL_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\p{L}[\p{L}/()' -]*:").expect("label line regex is valid")
});

static DESCRIPTION_CHAIN: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    DESCRIPTION_SELECTORS
        .iter()
        .map(|s| (*s, Selector::parse(s).expect("description selector is valid")))
        .collect()
});

static HEADING_CHAIN: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h1", "h2.offer-title"]
        .iter()
        .map(|s| Selector::parse(s).expect("heading selector is valid"))
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Supervisor,
    Funding,
    Theme,
}

/// A regex over the description text; `group` is the capture holding the value.
struct FieldRule {
    field: TextField,
    pattern: Regex,
    group: usize,
}

impl FieldRule {
    fn new(field: TextField, pattern: &str, group: usize) -> Self {
        Self {
            field,
            pattern: Regex::new(pattern).expect("field rule regex is valid"),
            group,
        }
    }

    fn apply(&self, text: &str) -> Option<String> {
        let value = self.pattern.captures(text)?.get(self.group)?.as_str().trim();
        (!value.is_empty() && !LABEL_LINE_RE.is_match(value)).then(|| value.to_string())
    }
}

static FIELD_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![
        FieldRule::new(TextField::Supervisor, r"(?i)PhD\s+Supervisor\s*:\s*([^\n]+)", 1),
        FieldRule::new(
            TextField::Funding,
            r"(?i)(?:\d[\d .,\x{A0}\x{202F}]*\d|\d)\s*(?:€|euros?\b|eur\b)",
            0,
        ),
        FieldRule::new(TextField::Theme, r"(?i)Theme\s*/\s*Domain\s*:\s*([^\n]+)", 1),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementField {
    Deadline,
    Team,
}

/// Finds the first text node matching `trigger` anywhere on the page and
/// takes its parent element's text, minus everything up to the label.
struct ElementTextRule {
    field: ElementField,
    trigger: Regex,
    label: Regex,
}

impl ElementTextRule {
    fn new(field: ElementField, trigger: &str, label: &str) -> Self {
        Self {
            field,
            trigger: Regex::new(trigger).expect("element trigger regex is valid"),
            label: Regex::new(label).expect("element label regex is valid"),
        }
    }

    fn apply(&self, document: &Html) -> Option<String> {
        document.root_element().descendants().find_map(|node| {
            let text = node.value().as_text()?;
            if !self.trigger.is_match(text) {
                return None;
            }
            let parent = node.parent().and_then(ElementRef::wrap)?;
            if INVISIBLE_ELEMENTS.contains(&parent.value().name()) {
                return None;
            }
            let full = inline_text(parent);
            let value = self.label.replace(&full, "").trim().to_string();
            (!value.is_empty() && value.chars().count() <= MAX_LABELED_VALUE_CHARS)
                .then_some(value)
        })
    }
}

static ELEMENT_RULES: Lazy<Vec<ElementTextRule>> = Lazy::new(|| {
    vec![
        ElementTextRule::new(
            ElementField::Deadline,
            r"(?i)deadline",
            r"(?i)^[^:]*deadline[^:]*:\s*",
        ),
        ElementTextRule::new(
            ElementField::Deadline,
            r"(?i)apply before",
            r"(?i)^[^:]*apply before\s*:?\s*",
        ),
        ElementTextRule::new(
            ElementField::Deadline,
            r"(?i)apply by",
            r"(?i)^[^:]*apply by\s*:?\s*",
        ),
        ElementTextRule::new(
            ElementField::Team,
            r"(?i)research team",
            r"(?i)^[^:]*research team[^:]*:\s*",
        ),
        ElementTextRule::new(ElementField::Team, r"(?i)team\s*:", r"(?i)^[^:]*team\s*:\s*"),
        ElementTextRule::new(
            ElementField::Team,
            r"(?i)laboratory",
            r"(?i)^[^:]*laboratory[^:]*:\s*",
        ),
    ]
});

/// Fetch and parse one offer's detail page.
///
/// Never fails: a fetch error is logged and yields empty details. Waits
/// `config.detail_delay` before returning, whatever the outcome.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_job_details<S: PageSource>(
    source: &S,
    url: &str,
    config: &ScraperConfig,
) -> JobDetails {
    let details = match source.fetch_page(url).await {
        Ok(html) => parse_details(&html),
        Err(e) => {
            error!(error = %e, "Error fetching job details");
            JobDetails::default()
        }
    };
    sleep(config.detail_delay).await;
    details
}

/// Extract [`JobDetails`] from a detail page's HTML.
pub fn parse_details(html: &str) -> JobDetails {
    let document = Html::parse_document(html);
    let mut details = JobDetails::default();

    let description = match description_container(&document) {
        Some((selector, container)) => {
            debug!(selector, "Found description container");
            visible_text(container)
        }
        None => {
            debug!("No description container matched; using page text");
            visible_text(document.root_element())
        }
    };

    let mut theme = None;
    for rule in FIELD_RULES.iter() {
        let slot = match rule.field {
            TextField::Supervisor => &mut details.supervisor,
            TextField::Funding => &mut details.funding,
            TextField::Theme => &mut theme,
        };
        if slot.is_none() {
            *slot = rule.apply(&description);
        }
    }

    details.keywords = theme.or_else(|| {
        let keywords = extract_keywords(&description, DEFAULT_KEYWORD_COUNT);
        (!keywords.is_empty()).then_some(keywords)
    });

    for rule in ELEMENT_RULES.iter() {
        let slot = match rule.field {
            ElementField::Deadline => &mut details.deadline,
            ElementField::Team => &mut details.team,
        };
        if slot.is_none() {
            *slot = rule.apply(&document);
        }
    }

    let heading = HEADING_CHAIN
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(inline_text)
        .unwrap_or_default();
    details.is_phd = Some(is_phd_title(&heading));

    if !description.is_empty() {
        details.full_description = Some(description);
    }
    debug!(
        supervisor = details.supervisor.is_some(),
        funding = details.funding.is_some(),
        keywords = details.keywords.is_some(),
        deadline = details.deadline.is_some(),
        team = details.team.is_some(),
        is_phd = ?details.is_phd,
        "Parsed detail page"
    );
    details
}

fn description_container(document: &Html) -> Option<(&'static str, ElementRef<'_>)> {
    DESCRIPTION_CHAIN.iter().find_map(|(source, selector)| {
        document
            .select(selector)
            .next()
            .map(|container| (*source, container))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fixtures::FixturePages;
    use std::time::Duration;

    const DETAIL_HTML: &str = r#"
        <html><head><title>Offer</title><script>var deadline = "never";</script></head>
        <body>
          <nav><a href="/">Home</a></nav>
          <h1>PhD Position F/M Study of X</h1>
          <div class="content-offre">
            <p>This thesis studies distributed systems. Networks matter here.</p>
            <p><strong>PhD Supervisor :</strong> Jane Doe</p>
            <p>Theme/Domain : Networks, Systems</p>
            <p>Salary: 2100 € gross monthly</p>
          </div>
          <ul>
            <li>Application deadline: 2025-06-30</li>
            <li>Research team: WIDE</li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_parse_details_labeled_fields() {
        let details = parse_details(DETAIL_HTML);

        assert_eq!(details.supervisor.as_deref(), Some("Jane Doe"));
        assert_eq!(details.keywords.as_deref(), Some("Networks, Systems"));
        assert_eq!(details.funding.as_deref(), Some("2100 €"));
        assert_eq!(details.deadline.as_deref(), Some("2025-06-30"));
        assert_eq!(details.team.as_deref(), Some("WIDE"));
        assert_eq!(details.is_phd, Some(true));
    }

    #[test]
    fn test_parse_details_description_uses_container() {
        let details = parse_details(DETAIL_HTML);
        let description = details.full_description.unwrap();

        assert!(description.starts_with("This thesis studies distributed systems."));
        assert!(!description.contains("Home"));
        assert!(!description.contains("Application deadline"));
    }

    #[test]
    fn test_parse_details_falls_back_to_page_text() {
        let html = r#"
            <html><head><style>body { margin: 0 }</style></head><body>
            <h2 class="offer-title">Doctorant F/H Vision</h2>
            <p>Learning vision models. Vision pipelines for robots and vision.</p>
            </body></html>
        "#;
        let details = parse_details(html);

        let description = details.full_description.unwrap();
        assert!(description.contains("Learning vision models."));
        assert!(!description.contains("margin"));
        // No Theme/Domain label: frequency keywords instead.
        assert_eq!(details.keywords.as_deref().unwrap().split(", ").next(), Some("vision"));
        assert!(details.supervisor.is_none());
        assert!(details.funding.is_none());
        assert_eq!(details.is_phd, Some(true));
    }

    #[test]
    fn test_parse_details_non_phd_heading() {
        let details = parse_details("<h1>Research Engineer F/M</h1><main>Build tools.</main>");
        assert_eq!(details.is_phd, Some(false));
        assert_eq!(details.full_description.as_deref(), Some("Build tools."));
    }

    #[test]
    fn test_parse_details_empty_page() {
        let details = parse_details("");
        assert!(details.full_description.is_none());
        assert!(details.keywords.is_none());
        assert_eq!(details.is_phd, Some(false));
    }

    #[test]
    fn test_funding_rule_variants() {
        let rule = &FIELD_RULES[1];
        assert_eq!(rule.field, TextField::Funding);
        assert_eq!(rule.apply("Monthly gross: 2 100 euros").as_deref(), Some("2 100 euros"));
        assert_eq!(rule.apply("1,900.50 EUR per month").as_deref(), Some("1,900.50 EUR"));
        assert_eq!(rule.apply("Funded by ANR"), None);
    }

    #[test]
    fn test_empty_label_does_not_take_next_line() {
        let html = r#"<div class="content-offre">
            <p>PhD Supervisor :</p>
            <p>Theme/Domain : Networks</p>
        </div>"#;
        let details = parse_details(html);

        assert_eq!(details.supervisor, None);
        assert_eq!(details.keywords.as_deref(), Some("Networks"));
    }

    #[test]
    fn test_label_value_on_next_text_node() {
        let rule = &FIELD_RULES[0];
        assert_eq!(rule.field, TextField::Supervisor);
        assert_eq!(rule.apply("PhD Supervisor :\nJane Doe").as_deref(), Some("Jane Doe"));
        assert_eq!(rule.apply("PhD Supervisor :\nFunding : ANR"), None);
    }

    #[test]
    fn test_element_rules_ignore_scripts() {
        let document = Html::parse_document(
            "<html><head><script>deadline: soon</script></head><body><p>Nothing</p></body></html>",
        );
        assert!(ELEMENT_RULES[0].apply(&document).is_none());
    }

    #[tokio::test]
    async fn test_fetch_job_details_failure_is_empty() {
        let source = FixturePages::new();
        let config = ScraperConfig {
            detail_delay: Duration::ZERO,
            ..Default::default()
        };

        let details = fetch_job_details(&source, "https://jobs.inria.fr/offres/404", &config).await;
        assert_eq!(details, JobDetails::default());
    }

    #[tokio::test]
    async fn test_fetch_job_details_success() {
        let url = "https://jobs.inria.fr/offres/2025-001";
        let source = FixturePages::new().with_page(url, DETAIL_HTML);
        let config = ScraperConfig {
            detail_delay: Duration::ZERO,
            ..Default::default()
        };

        let details = fetch_job_details(&source, url, &config).await;
        assert_eq!(details.supervisor.as_deref(), Some("Jane Doe"));
    }
}
