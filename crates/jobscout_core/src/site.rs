use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.workingnomads.com";

/// CSS selectors used against the listing page and detail pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    /// One match per listing on the listing page.
    pub container: String,
    /// Anchor inside a listing; its text is the title and its `href` the URL.
    pub title_link: String,
    pub company: String,
    pub list_salary: String,
    /// Salary containers on a detail page, tried in order.
    pub detail_salary: Vec<String>,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            container: ".job-wrapper".to_string(),
            title_link: "h4.hidden-xs a".to_string(),
            company: ".job-company".to_string(),
            list_salary: r#"div[ng-show*="model.salary_range"] span.about-job-line-text.ng-binding"#
                .to_string(),
            detail_salary: vec![
                ".job-details-inner div:has(i.fa-money)".to_string(),
                "div.job-detail-sidebar:has(i.fa-money)".to_string(),
            ],
        }
    }
}

/// Everything that is specific to the scraped site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub base_url: Url,
    /// Path plus query of the listing page, joined onto `base_url`.
    pub listing_path: String,
    pub selectors: SiteSelectors,
    pub currency_marker: String,
    /// A list-page salary must be strictly longer than this.
    pub min_salary_len: usize,
    /// Company-label values containing any of these (case-insensitive) are badges.
    pub company_denylist: Vec<String>,
    /// Length of the numeric listing id embedded in detail URLs.
    pub listing_id_digits: usize,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid url"),
            listing_path: "/jobs?postedDate=1".to_string(),
            selectors: SiteSelectors::default(),
            currency_marker: "$".to_string(),
            min_salary_len: 5,
            company_denylist: vec![
                "remote".to_string(),
                "full-time".to_string(),
                "jobs".to_string(),
            ],
            listing_id_digits: 7,
        }
    }
}

impl SiteProfile {
    pub fn listing_url(&self) -> Option<Url> {
        self.base_url.join(&self.listing_path).ok()
    }

    /// Origin of the site without trailing slash, stored on each record.
    pub fn source_site(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }

    /// Resolve an `href` found on the listing page into an absolute URL.
    /// Fragments are dropped so the same posting always maps to one key.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        let trimmed = href.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("javascript:") || lower.starts_with("mailto:") {
            return None;
        }
        let mut url = self.base_url.join(trimmed).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        url.set_fragment(None);
        Some(url)
    }

    /// True when `url` is an absolute http(s) URL on the same host as `base_url`.
    pub fn is_canonical(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        matches!(parsed.scheme(), "http" | "https")
            && parsed.host_str().is_some()
            && parsed.host_str() == self.base_url.host_str()
    }
}
