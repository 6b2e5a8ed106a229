use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use engine_logging::{engine_debug, engine_info};
use jobscout_core::ListingRecord;
use tempfile::NamedTempFile;
use tokio::sync::Mutex as AsyncMutex;

use crate::store::{ListingStore, StoreError, UpsertKind};

pub const LISTINGS_FILE: &str = "listings.json";

/// Ensure `dir` exists and is a writable directory; create it if missing.
pub fn ensure_store_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        if !fs::metadata(dir)?.is_dir() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", dir.display()),
            )));
        }
    } else {
        fs::create_dir_all(dir)?;
    }
    NamedTempFile::new_in(dir)?;
    Ok(())
}

/// Replace `target` with `content` via a temp file in the same directory, so
/// readers see either the old or the new file.
fn write_atomically(target: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|err| StoreError::Io(err.error))?;
    Ok(())
}

/// Listings kept as a pretty-printed JSON array in `{dir}/listings.json`,
/// rewritten once per upsert call or batch.
pub struct JsonFileStore {
    path: PathBuf,
    rows: Mutex<BTreeMap<String, ListingRecord>>,
    /// Held across a whole batch so file writes land in commit order.
    writer: AsyncMutex<()>,
}

impl JsonFileStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        ensure_store_dir(dir)?;
        let path = dir.join(LISTINGS_FILE);
        let rows = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let records: Vec<ListingRecord> = serde_json::from_str(&raw)?;
            records
                .into_iter()
                .map(|record| (record.url.clone(), record))
                .collect()
        } else {
            BTreeMap::new()
        };
        engine_info!("Opened {} with {} listings", path.display(), rows.len());
        Ok(Self {
            path,
            rows: Mutex::new(rows),
            writer: AsyncMutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<String, ListingRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl ListingStore for JsonFileStore {
    async fn keys(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.rows().keys().cloned().collect())
    }

    async fn get(&self, url: &str) -> Result<Option<ListingRecord>, StoreError> {
        Ok(self.rows().get(url).cloned())
    }

    async fn upsert(&self, record: &ListingRecord) -> Result<UpsertKind, StoreError> {
        let kinds = self.commit(std::slice::from_ref(record)).await?;
        Ok(kinds[0])
    }

    async fn upsert_batch(
        &self,
        records: &[ListingRecord],
    ) -> Vec<Result<UpsertKind, StoreError>> {
        match self.commit(records).await {
            Ok(kinds) => kinds.into_iter().map(Ok).collect(),
            Err(err) => {
                let message = err.to_string();
                records
                    .iter()
                    .map(|record| {
                        Err(StoreError::Rejected {
                            url: record.url.clone(),
                            message: message.clone(),
                        })
                    })
                    .collect()
            }
        }
    }
}

impl JsonFileStore {
    /// Apply `records` in memory, then write the file once. A failed write
    /// restores the rows it replaced.
    async fn commit(&self, records: &[ListingRecord]) -> Result<Vec<UpsertKind>, StoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let _writing = self.writer.lock().await;

        let (previous, json) = {
            let mut rows = self.rows();
            let previous: Vec<Option<ListingRecord>> = records
                .iter()
                .map(|record| rows.insert(record.url.clone(), record.clone()))
                .collect();
            let json = serde_json::to_vec_pretty(&rows.values().collect::<Vec<_>>());
            (previous, json)
        };

        let path = self.path.clone();
        let written = match json {
            Ok(json) => tokio::task::spawn_blocking(move || write_atomically(&path, &json))
                .await
                .unwrap_or_else(|err| Err(StoreError::Io(io::Error::other(err)))),
            Err(err) => Err(StoreError::from(err)),
        };

        if let Err(err) = written {
            let mut rows = self.rows();
            for (record, previous) in records.iter().zip(&previous).rev() {
                match previous {
                    Some(previous) => rows.insert(record.url.clone(), previous.clone()),
                    None => rows.remove(&record.url),
                };
            }
            return Err(err);
        }

        engine_debug!("Wrote {} listings to {}", records.len(), self.path.display());
        Ok(previous
            .iter()
            .map(|previous| {
                if previous.is_some() {
                    UpsertKind::Updated
                } else {
                    UpsertKind::Inserted
                }
            })
            .collect())
    }
}
