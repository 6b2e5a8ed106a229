use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use jobscout_core::{dedupe_by_url, ListingRecord, Phase, SiteProfile};
use thiserror::Error;
use url::Url;

use crate::driver::{DriverError, Page, PageDriver};
use crate::enrich::{enrich_salaries, EnrichError, EnrichmentReport, EnrichmentSettings};
use crate::probe::{extract_listings, ProbeSettings};
use crate::scroll::{scroll_to_convergence, ConvergenceSettings};
use crate::store::{ListingStore, StoreError};
use crate::types::{EngineEvent, ProgressSink};
use crate::upsert::{upsert_all, UpsertReport, DEFAULT_UPSERT_BATCH};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("listing page failed: {0}")]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Enrich(#[from] EnrichError),
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("all {failed} upserts failed; first error: {first}")]
    PersistenceFailed { failed: usize, first: String },
    #[error("site base url {0} does not produce a listing url")]
    InvalidListingUrl(String),
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub site: SiteProfile,
    pub navigation_timeout: Duration,
    /// How long to wait for the first listing container after navigation.
    pub ready_timeout: Duration,
    pub settle_after_load: Duration,
    pub convergence: ConvergenceSettings,
    pub probe: ProbeSettings,
    pub enrichment: EnrichmentSettings,
    pub upsert_batch_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            site: SiteProfile::default(),
            navigation_timeout: Duration::from_secs(60),
            ready_timeout: Duration::from_secs(60),
            settle_after_load: Duration::from_secs(2),
            convergence: ConvergenceSettings::default(),
            probe: ProbeSettings::default(),
            enrichment: EnrichmentSettings::default(),
            upsert_batch_size: DEFAULT_UPSERT_BATCH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub listings_found: usize,
    pub records_extracted: usize,
    pub enrichment: EnrichmentReport,
    pub upsert: UpsertReport,
}

/// One end-to-end scrape: load and scroll the listing page, extract records,
/// enrich missing salaries from detail pages and upsert the result.
pub struct Pipeline {
    driver: Arc<dyn PageDriver>,
    store: Arc<dyn ListingStore>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        store: Arc<dyn ListingStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            driver,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn run(&self, sink: &dyn ProgressSink) -> Result<RunSummary, PipelineError> {
        let site = &self.settings.site;
        let listing_url = site
            .listing_url()
            .ok_or_else(|| PipelineError::InvalidListingUrl(site.base_url.to_string()))?;

        sink.emit(EngineEvent::PhaseEntered(Phase::Loading));
        let page = self.driver.open_page().await?;
        let scraped = self.scrape_listing_page(page.as_ref(), &listing_url, sink).await;
        if let Err(err) = page.close().await {
            engine_debug!("Closing listing page failed: {}", err);
        }
        let (listings_found, records) = scraped?;
        let records_extracted = records.len();

        let mut records = on_site_unique(records, site);

        sink.emit(EngineEvent::PhaseEntered(Phase::Enriching));
        let enrichment = enrich_salaries(
            self.driver.as_ref(),
            &mut records,
            site,
            &self.settings.enrichment,
            sink,
        )
        .await?;

        sink.emit(EngineEvent::PhaseEntered(Phase::Saving));
        let upsert = upsert_all(
            self.store.as_ref(),
            records,
            self.settings.upsert_batch_size,
        )
        .await?;
        sink.emit(EngineEvent::Persisted {
            inserted: upsert.inserted,
            updated: upsert.updated,
            failed: upsert.failures.len(),
        });
        if upsert.all_failed() {
            let first = upsert
                .failures
                .first()
                .map(|failure| failure.message.clone())
                .unwrap_or_default();
            return Err(PipelineError::PersistenceFailed {
                failed: upsert.failures.len(),
                first,
            });
        }

        Ok(RunSummary {
            listings_found,
            records_extracted,
            enrichment,
            upsert,
        })
    }

    async fn scrape_listing_page(
        &self,
        page: &dyn Page,
        listing_url: &Url,
        sink: &dyn ProgressSink,
    ) -> Result<(usize, Vec<ListingRecord>), PipelineError> {
        let container = self.settings.site.selectors.container.as_str();
        engine_info!("Loading {}", listing_url);
        page.navigate(listing_url.as_str(), self.settings.navigation_timeout)
            .await?;

        let ready = match page
            .wait_for_selector(container, self.settings.ready_timeout)
            .await
        {
            Ok(()) => true,
            Err(err @ (DriverError::SelectorMissing(_) | DriverError::Timeout(_))) => {
                engine_warn!("No listings appeared on {}: {}", listing_url, err);
                false
            }
            Err(err) => return Err(err.into()),
        };
        if ready && !self.settings.settle_after_load.is_zero() {
            tokio::time::sleep(self.settings.settle_after_load).await;
        }

        sink.emit(EngineEvent::PhaseEntered(Phase::Scrolling));
        let found = if ready {
            scroll_to_convergence(page, container, &self.settings.convergence, sink).await?
        } else {
            sink.emit(EngineEvent::ListingsFound(0));
            0
        };

        sink.emit(EngineEvent::PhaseEntered(Phase::Extracting));
        let handles = if found == 0 {
            Vec::new()
        } else {
            page.elements(container).await?
        };
        let records = extract_listings(
            page,
            &handles,
            &self.settings.site,
            &self.settings.probe,
            sink,
        )
        .await;
        Ok((found, records))
    }
}

/// Drop records pointing off the listing site, then collapse URL duplicates.
fn on_site_unique(records: Vec<ListingRecord>, site: &SiteProfile) -> Vec<ListingRecord> {
    let total = records.len();
    let on_site: Vec<ListingRecord> = records
        .into_iter()
        .filter(|record| site.is_canonical(&record.url))
        .collect();
    if on_site.len() < total {
        engine_debug!("Dropped {} off-site listings", total - on_site.len());
    }
    dedupe_by_url(on_site)
}
