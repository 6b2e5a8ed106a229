use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use jobscout_core::ListingRecord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("store rejected {url}: {message}")]
    Rejected { url: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Inserted,
    Updated,
}

/// Listing storage keyed by URL.
#[async_trait::async_trait]
pub trait ListingStore: Send + Sync {
    /// Every stored URL.
    async fn keys(&self) -> Result<BTreeSet<String>, StoreError>;

    async fn get(&self, url: &str) -> Result<Option<ListingRecord>, StoreError>;

    /// Write `record` as-is, replacing any row with the same URL.
    async fn upsert(&self, record: &ListingRecord) -> Result<UpsertKind, StoreError>;

    /// Write several records, one result per record in input order. Stores
    /// that can commit a whole batch at once override this.
    async fn upsert_batch(
        &self,
        records: &[ListingRecord],
    ) -> Vec<Result<UpsertKind, StoreError>> {
        join_all(records.iter().map(|record| self.upsert(record))).await
    }
}

/// In-memory store. Also used by tests to seed rows and inject failures.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<String, ListingRecord>>,
    failing: Mutex<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(records: impl IntoIterator<Item = ListingRecord>) -> Self {
        let store = Self::new();
        store
            .rows()
            .extend(records.into_iter().map(|record| (record.url.clone(), record)));
        store
    }

    /// Make every upsert of `url` fail.
    pub fn fail_on(&self, url: impl Into<String>) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into());
    }

    pub fn records(&self) -> Vec<ListingRecord> {
        self.rows().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<String, ListingRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl ListingStore for MemoryStore {
    async fn keys(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.rows().keys().cloned().collect())
    }

    async fn get(&self, url: &str) -> Result<Option<ListingRecord>, StoreError> {
        Ok(self.rows().get(url).cloned())
    }

    async fn upsert(&self, record: &ListingRecord) -> Result<UpsertKind, StoreError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&record.url);
        if failing {
            return Err(StoreError::Rejected {
                url: record.url.clone(),
                message: "write refused".to_string(),
            });
        }
        let previous = self.rows().insert(record.url.clone(), record.clone());
        Ok(if previous.is_some() {
            UpsertKind::Updated
        } else {
            UpsertKind::Inserted
        })
    }
}
