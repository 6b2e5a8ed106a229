use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use futures_util::future::join_all;
use jobscout_core::{build_record, ElementProbe, ListingRecord, SiteProfile, SiteSelectors};

use crate::driver::{DriverError, ElementHandle, Page, Scope};
use crate::types::{EngineEvent, ProgressSink};

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub field_timeout: Duration,
    /// The company label renders later than the rest of the card.
    pub company_timeout: Duration,
    pub batch_size: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            field_timeout: Duration::from_millis(500),
            company_timeout: Duration::from_millis(1000),
            batch_size: 30,
        }
    }
}

/// Read the raw field values of one listing element. Any read that fails or
/// times out counts as absent. Without a title the other fields are skipped.
pub async fn probe_element(
    page: &dyn Page,
    handle: &ElementHandle,
    selectors: &SiteSelectors,
    settings: &ProbeSettings,
) -> ElementProbe {
    let scope = Scope::Element(handle);
    let title = soft(
        page.read_text(scope, &selectors.title_link, settings.field_timeout)
            .await,
        "title",
        handle,
    )
    .flatten();
    if title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return ElementProbe::default();
    }

    let href = soft(
        page.read_attribute(scope, &selectors.title_link, "href", settings.field_timeout)
            .await,
        "href",
        handle,
    )
    .flatten();
    let company_label = soft(
        page.read_text(scope, &selectors.company, settings.company_timeout)
            .await,
        "company",
        handle,
    )
    .flatten();
    let salary_texts = soft(
        page.read_texts(scope, &selectors.list_salary, settings.field_timeout)
            .await,
        "salary",
        handle,
    )
    .unwrap_or_default();

    ElementProbe {
        title,
        href,
        company_label,
        salary_texts,
    }
}

/// Probe every element in batches and map each to a record. Elements that
/// yield no record are dropped. Emits the running record count per batch.
pub async fn extract_listings(
    page: &dyn Page,
    handles: &[ElementHandle],
    site: &SiteProfile,
    settings: &ProbeSettings,
    sink: &dyn ProgressSink,
) -> Vec<ListingRecord> {
    let mut records = Vec::with_capacity(handles.len());
    for batch in handles.chunks(settings.batch_size.max(1)) {
        let probes = join_all(
            batch
                .iter()
                .map(|handle| probe_element(page, handle, &site.selectors, settings)),
        )
        .await;

        for (handle, probe) in batch.iter().zip(probes) {
            match build_record(&probe, site) {
                Some(record) => records.push(record),
                None => engine_debug!("Listing element {} dropped: no title or link", handle.index()),
            }
        }
        sink.emit(EngineEvent::ListingsProcessed(records.len()));
    }

    engine_info!(
        "Extracted {} records from {} listing elements",
        records.len(),
        handles.len()
    );
    records
}

fn soft<T>(result: Result<T, DriverError>, field: &str, handle: &ElementHandle) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            engine_debug!("Element {} {}: {}", handle.index(), field, err);
            None
        }
    }
}
