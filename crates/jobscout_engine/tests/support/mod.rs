#![allow(dead_code)]

mod static_site;

use std::sync::{Mutex, Once};
use std::time::Duration;

use jobscout_core::{ListingRecord, SiteProfile};
use jobscout_engine::{
    ConvergenceSettings, EngineEvent, EnrichmentSettings, PipelineSettings, ProbeSettings,
    ProgressSink,
};

pub use static_site::StaticSite;

pub const BASE: &str = "https://www.workingnomads.com";
pub const LISTING_URL: &str = "https://www.workingnomads.com/jobs?postedDate=1";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// One listing card on the listing page.
#[derive(Debug, Clone)]
pub struct Card {
    title: Option<String>,
    href: String,
    company: Option<String>,
    salary: Option<String>,
}

impl Card {
    pub fn new(title: &str, slug: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            href: format!("/jobs/{slug}"),
            company: None,
            salary: None,
        }
    }

    pub fn untitled(slug: &str) -> Self {
        Self {
            title: None,
            ..Self::new("", slug)
        }
    }

    pub fn company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    pub fn salary(mut self, salary: &str) -> Self {
        self.salary = Some(salary.to_string());
        self
    }

    pub fn href(mut self, href: &str) -> Self {
        self.href = href.to_string();
        self
    }

    /// Absolute URL the card links to.
    pub fn url(&self) -> String {
        if self.href.starts_with("http") {
            self.href.clone()
        } else {
            format!("{BASE}{}", self.href)
        }
    }

    fn html(&self) -> String {
        let mut html = String::from(r#"<div class="job-wrapper">"#);
        match &self.title {
            Some(title) => html.push_str(&format!(
                r#"<h4 class="hidden-xs"><a href="{}">{}</a></h4>"#,
                self.href, title
            )),
            None => html.push_str(&format!(r#"<a class="apply" href="{}">Apply</a>"#, self.href)),
        }
        if let Some(company) = &self.company {
            html.push_str(&format!(r#"<div class="job-company">{company}</div>"#));
        }
        if let Some(salary) = &self.salary {
            html.push_str(&format!(
                r#"<div ng-show="model.salary_range"><span class="about-job-line-text ng-binding">{salary}</span></div>"#
            ));
        }
        html.push_str("</div>");
        html
    }
}

pub fn listing_page(cards: &[Card]) -> String {
    let body: String = cards.iter().map(Card::html).collect();
    format!("<html><body><div class=\"jobs\">{body}</div></body></html>")
}

/// Detail page with the salary (if any) in the main details block.
pub fn detail_page(salary: Option<&str>) -> String {
    let salary = salary
        .map(|s| format!(r#"<div class="salary-box"><i class="fa-money"></i>{s}</div>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body><div class="job-details-inner"><p>About the role</p>{salary}</div></body></html>"#
    )
}

/// Detail page with the salary only in the sidebar.
pub fn sidebar_detail_page(salary: &str) -> String {
    format!(
        r#"<html><body><div class="job-details-inner"><p>About</p></div><div class="job-detail-sidebar"><div class="salary-box">Compensation
  {salary}
</div></div></body></html>"#
    )
}

pub fn test_site() -> SiteProfile {
    let mut site = SiteProfile::default();
    site.selectors.detail_salary = vec![
        ".job-details-inner .salary-box".to_string(),
        ".job-detail-sidebar .salary-box".to_string(),
    ];
    site
}

pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        site: test_site(),
        navigation_timeout: Duration::from_secs(5),
        ready_timeout: Duration::from_millis(200),
        settle_after_load: Duration::ZERO,
        convergence: ConvergenceSettings {
            settle: Duration::ZERO,
            ..ConvergenceSettings::default()
        },
        probe: ProbeSettings::default(),
        enrichment: EnrichmentSettings {
            batch_pause: Duration::ZERO,
            ..EnrichmentSettings::default()
        },
        upsert_batch_size: 4,
    }
}

pub fn record(url: &str, company: &str, salary: &str) -> ListingRecord {
    ListingRecord {
        title: format!("Role at {url}"),
        company_name: company.to_string(),
        url: url.to_string(),
        salary: salary.to_string(),
        source_site: BASE.to_string(),
    }
}
