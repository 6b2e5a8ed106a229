use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::future::join_all;
use jobscout_core::{salary_from_detail_text, ListingRecord, SiteProfile};
use thiserror::Error;

use crate::driver::{DriverError, Page, PageDriver, Scope};
use crate::types::{EngineEvent, ProgressSink};

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// Detail pages open at once; also the batch size.
    pub concurrency: usize,
    /// Bound on one candidate: navigation plus every detail read.
    pub per_request_timeout: Duration,
    pub detail_read_timeout: Duration,
    pub max_candidates: usize,
    pub batch_pause: Duration,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            concurrency: 15,
            per_request_timeout: Duration::from_secs(25),
            detail_read_timeout: Duration::from_secs(4),
            max_candidates: 150,
            batch_pause: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("no detail page could be opened: {0}")]
    Driver(#[source] DriverError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub candidates: usize,
    pub attempted: usize,
    pub enriched: usize,
    pub failed: usize,
}

/// Indices of records worth a detail-page visit: salary unknown and the URL
/// on the listing site. At most `max` are returned, in record order.
pub fn enrichment_candidates(records: &[ListingRecord], site: &SiteProfile, max: usize) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| !record.salary_known() && site.is_canonical(&record.url))
        .map(|(index, _)| index)
        .take(max)
        .collect()
}

enum Outcome {
    Found(String),
    Missing,
    Failed(DriverError),
    NotOpened(DriverError),
}

/// Fill unknown salaries from detail pages, one short-lived page per
/// candidate and `concurrency` candidates per batch. Per-candidate failures
/// leave the salary unknown. Fails only when no detail page can be opened
/// at all.
pub async fn enrich_salaries(
    driver: &dyn PageDriver,
    records: &mut [ListingRecord],
    site: &SiteProfile,
    settings: &EnrichmentSettings,
    sink: &dyn ProgressSink,
) -> Result<EnrichmentReport, EnrichError> {
    let candidates = enrichment_candidates(records, site, settings.max_candidates);
    let mut report = EnrichmentReport {
        candidates: candidates.len(),
        ..EnrichmentReport::default()
    };
    if candidates.is_empty() {
        return Ok(report);
    }
    engine_info!("Enriching {} listings without salary", candidates.len());

    let mut opened_any = false;
    let batches: Vec<&[usize]> = candidates.chunks(settings.concurrency.max(1)).collect();
    for (batch_no, batch) in batches.iter().enumerate() {
        let outcomes = join_all(batch.iter().map(|&index| {
            let url = records[index].url.clone();
            async move { (index, enrich_one(driver, &url, site, settings).await) }
        }))
        .await;

        let mut open_error = None;
        for (index, outcome) in outcomes {
            report.attempted += 1;
            match outcome {
                Outcome::Found(salary) => {
                    opened_any = true;
                    engine_debug!("Salary for {}: {}", records[index].url, salary);
                    records[index].salary = salary;
                    report.enriched += 1;
                }
                Outcome::Missing => opened_any = true,
                Outcome::Failed(err) => {
                    opened_any = true;
                    report.failed += 1;
                    engine_warn!("Detail page {} failed: {}", records[index].url, err);
                }
                Outcome::NotOpened(err) => {
                    report.failed += 1;
                    engine_warn!("Could not open page for {}: {}", records[index].url, err);
                    open_error = Some(err);
                }
            }
        }

        sink.emit(EngineEvent::EnrichmentProgress {
            enriched: report.enriched,
            attempted: report.attempted,
            candidates: report.candidates,
        });

        if !opened_any {
            if let Some(err) = open_error {
                return Err(EnrichError::Driver(err));
            }
        }
        if batch_no + 1 < batches.len() && !settings.batch_pause.is_zero() {
            tokio::time::sleep(settings.batch_pause).await;
        }
    }

    engine_info!(
        "Enrichment done: {} of {} salaries found, {} failed",
        report.enriched,
        report.candidates,
        report.failed
    );
    Ok(report)
}

async fn enrich_one(
    driver: &dyn PageDriver,
    url: &str,
    site: &SiteProfile,
    settings: &EnrichmentSettings,
) -> Outcome {
    let page = match driver.open_page().await {
        Ok(page) => page,
        Err(err) => return Outcome::NotOpened(err),
    };

    let outcome = match tokio::time::timeout(
        settings.per_request_timeout,
        read_detail_salary(page.as_ref(), url, site, settings),
    )
    .await
    {
        Ok(Ok(Some(salary))) => Outcome::Found(salary),
        Ok(Ok(None)) => Outcome::Missing,
        Ok(Err(err)) => Outcome::Failed(err),
        Err(_) => Outcome::Failed(DriverError::Timeout(settings.per_request_timeout)),
    };

    if let Err(err) = page.close().await {
        engine_debug!("Closing detail page {} failed: {}", url, err);
    }
    outcome
}

async fn read_detail_salary(
    page: &dyn Page,
    url: &str,
    site: &SiteProfile,
    settings: &EnrichmentSettings,
) -> Result<Option<String>, DriverError> {
    page.navigate(url, settings.per_request_timeout).await?;

    for selector in &site.selectors.detail_salary {
        let texts = match page
            .read_texts(Scope::Page, selector, settings.detail_read_timeout)
            .await
        {
            Ok(texts) => texts,
            Err(err) => {
                engine_debug!("Detail selector {} on {}: {}", selector, url, err);
                continue;
            }
        };
        let salary = texts
            .iter()
            .find_map(|text| salary_from_detail_text(text, &site.currency_marker));
        if salary.is_some() {
            return Ok(salary);
        }
    }
    Ok(None)
}
