//! Field extraction over raw values read from one listing element.
//!
//! Reading the page is the engine's job; it fills an [`ElementProbe`] with
//! whatever each selector yielded (or nothing, on a miss or timeout). The
//! functions here turn a probe into a [`ListingRecord`] using ordered strategy
//! chains where the first `Some` wins.

use url::Url;

use crate::record::{ListingRecord, UNKNOWN};
use crate::site::SiteProfile;

/// Raw per-element reads. Every field is optional: absence means the lookup
/// missed or timed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementProbe {
    pub title: Option<String>,
    pub href: Option<String>,
    pub company_label: Option<String>,
    /// Texts of every element matching the list-salary selector.
    pub salary_texts: Vec<String>,
}

/// Inputs available to a field strategy.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub probe: &'a ElementProbe,
    pub url: &'a Url,
    pub site: &'a SiteProfile,
}

pub type FieldStrategy = fn(&ExtractionContext<'_>) -> Option<String>;

pub const COMPANY_STRATEGIES: &[FieldStrategy] = &[company_from_label, company_from_url];
pub const SALARY_STRATEGIES: &[FieldStrategy] = &[salary_from_list_badge];

/// Run strategies in order; the first one that yields a value wins.
pub fn first_match(strategies: &[FieldStrategy], ctx: &ExtractionContext<'_>) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy(ctx))
}

/// Map a probe to a record. Returns `None` when the title or link is missing,
/// since such a listing cannot be identified.
pub fn build_record(probe: &ElementProbe, site: &SiteProfile) -> Option<ListingRecord> {
    let title = probe
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|title| !title.is_empty())?;
    let url = site.resolve(probe.href.as_deref()?)?;

    let ctx = ExtractionContext {
        probe,
        url: &url,
        site,
    };
    let company_name =
        first_match(COMPANY_STRATEGIES, &ctx).unwrap_or_else(|| UNKNOWN.to_string());
    let salary = first_match(SALARY_STRATEGIES, &ctx).unwrap_or_else(|| UNKNOWN.to_string());

    Some(ListingRecord {
        title,
        company_name,
        url: url.to_string(),
        salary,
        source_site: site.source_site(),
    })
}

/// Dedicated company label, unless it looks like a tag or badge.
pub fn company_from_label(ctx: &ExtractionContext<'_>) -> Option<String> {
    let cleaned = collapse_whitespace(ctx.probe.company_label.as_deref()?);
    if cleaned.chars().count() < 3 {
        return None;
    }
    let lower = cleaned.to_lowercase();
    let is_badge = ctx
        .site
        .company_denylist
        .iter()
        .any(|word| lower.contains(&word.to_lowercase()));
    (!is_badge).then_some(cleaned)
}

/// Guess the company from the slug token right before the numeric listing id,
/// e.g. `/jobs/senior-engineer-acme-1234567` gives `Acme`.
pub fn company_from_url(ctx: &ExtractionContext<'_>) -> Option<String> {
    let slug = ctx.url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let parts: Vec<&str> = slug.split('-').collect();
    let id_pos = parts.iter().position(|part| {
        part.len() == ctx.site.listing_id_digits && part.chars().all(|c| c.is_ascii_digit())
    })?;
    if id_pos == 0 {
        return None;
    }
    let guess = parts[id_pos - 1];
    if guess.is_empty() {
        return None;
    }
    Some(capitalize_first(guess))
}

/// Salary shown on the listing card itself.
pub fn salary_from_list_badge(ctx: &ExtractionContext<'_>) -> Option<String> {
    let marker = ctx.site.currency_marker.as_str();
    ctx.probe
        .salary_texts
        .iter()
        .map(|text| text.trim())
        .find(|text| text.contains(marker) && text.chars().count() > ctx.site.min_salary_len)
        .map(ToOwned::to_owned)
}

/// Pick the salary out of a detail-page container's text: the first line that
/// carries the currency marker, else the whole text if it carries one at all.
pub fn salary_from_detail_text(text: &str, marker: &str) -> Option<String> {
    if !text.contains(marker) {
        return None;
    }
    let line = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| line.contains(marker));
    let salary = line.unwrap_or_else(|| text.trim());
    (!salary.is_empty()).then(|| salary.to_string())
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn capitalize_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
