use engine_logging::{engine_info, engine_warn};
use futures_util::future::join_all;
use jobscout_core::{dedupe_by_url, ListingRecord};

use crate::store::{ListingStore, StoreError, UpsertKind};

pub const DEFAULT_UPSERT_BATCH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertFailure {
    pub url: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<UpsertFailure>,
}

impl UpsertReport {
    pub fn persisted(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn attempted(&self) -> usize {
        self.persisted() + self.failures.len()
    }

    /// True when there was something to write and none of it was written.
    pub fn all_failed(&self) -> bool {
        !self.failures.is_empty() && self.persisted() == 0
    }

    fn record_failure(&mut self, url: &str, err: &StoreError) {
        engine_warn!("Upsert of {} failed: {}", url, err);
        self.failures.push(UpsertFailure {
            url: url.to_string(),
            message: err.to_string(),
        });
    }
}

/// Deduplicate `records` by URL and upsert them. Rows already stored are
/// merged so a known company or salary is never replaced by "unknown".
///
/// Each batch is merged concurrently and handed to the store in one
/// `upsert_batch` call; batches run in order. A failed record is reported and
/// does not stop the rest. Only failing to list the stored keys is an error.
pub async fn upsert_all(
    store: &dyn ListingStore,
    records: Vec<ListingRecord>,
    batch_size: usize,
) -> Result<UpsertReport, StoreError> {
    let records = dedupe_by_url(records);
    let existing = store.keys().await?;
    let mut report = UpsertReport::default();

    for batch in records.chunks(batch_size.max(1)) {
        let merged = join_all(batch.iter().map(|record| {
            merge_with_stored(store, record, existing.contains(&record.url))
        }))
        .await;

        let mut ready = Vec::with_capacity(batch.len());
        for (record, merged) in batch.iter().zip(merged) {
            match merged {
                Ok(merged) => ready.push(merged),
                Err(err) => report.record_failure(&record.url, &err),
            }
        }

        let results = store.upsert_batch(&ready).await;
        for (record, result) in ready.iter().zip(results) {
            match result {
                Ok(UpsertKind::Inserted) => report.inserted += 1,
                Ok(UpsertKind::Updated) => report.updated += 1,
                Err(err) => report.record_failure(&record.url, &err),
            }
        }
    }

    engine_info!(
        "Persisted {} listings ({} new, {} updated, {} failed)",
        report.persisted(),
        report.inserted,
        report.updated,
        report.failures.len()
    );
    Ok(report)
}

async fn merge_with_stored(
    store: &dyn ListingStore,
    record: &ListingRecord,
    exists: bool,
) -> Result<ListingRecord, StoreError> {
    if exists {
        if let Some(stored) = store.get(&record.url).await? {
            return Ok(record.merged_over(&stored));
        }
    }
    Ok(record.clone())
}
