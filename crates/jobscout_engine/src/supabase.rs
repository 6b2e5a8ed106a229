//! [`ListingStore`] over a Supabase table through its PostgREST endpoint.

use std::collections::BTreeSet;
use std::time::Duration;

use engine_logging::engine_debug;
use jobscout_core::ListingRecord;
use serde::Deserialize;
use url::Url;

use crate::store::{ListingStore, StoreError, UpsertKind};

const RECORD_COLUMNS: &str = "title,companyName,url,salary,sourceSite";

#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub base_url: String,
    pub table: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct UrlRow {
    url: String,
}

pub struct SupabaseStore {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(settings: SupabaseSettings) -> Result<Self, StoreError> {
        let raw = format!(
            "{}/rest/v1/{}",
            settings.base_url.trim_end_matches('/'),
            settings.table
        );
        let endpoint = Url::parse(&raw)
            .map_err(|err| StoreError::Network(format!("invalid store url {raw}: {err}")))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(network)?;
        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key,
        })
    }

    fn url_with(&self, pairs: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().extend_pairs(pairs);
        url
    }

    async fn select<T>(&self, url: Url) -> Result<Vec<T>, StoreError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(network)?;
        let response = check_status(response).await?;
        response.json::<Vec<T>>().await.map_err(network)
    }
}

#[async_trait::async_trait]
impl ListingStore for SupabaseStore {
    async fn keys(&self) -> Result<BTreeSet<String>, StoreError> {
        let rows: Vec<UrlRow> = self.select(self.url_with(&[("select", "url")])).await?;
        Ok(rows.into_iter().map(|row| row.url).collect())
    }

    async fn get(&self, url: &str) -> Result<Option<ListingRecord>, StoreError> {
        let filter = format!("eq.{url}");
        let rows: Vec<ListingRecord> = self
            .select(self.url_with(&[("select", RECORD_COLUMNS), ("url", &filter)]))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, record: &ListingRecord) -> Result<UpsertKind, StoreError> {
        let filter = format!("eq.{}", record.url);
        let existing: Vec<UrlRow> = self
            .select(self.url_with(&[("select", "url"), ("url", &filter)]))
            .await?;

        let response = self
            .client
            .post(self.url_with(&[("on_conflict", "url")]))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[record])
            .send()
            .await
            .map_err(network)?;
        check_status(response).await?;
        engine_debug!("Upserted {}", record.url);

        Ok(if existing.is_empty() {
            UpsertKind::Inserted
        } else {
            UpsertKind::Updated
        })
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Http {
        status: status.as_u16(),
        message,
    })
}

fn network(err: reqwest::Error) -> StoreError {
    StoreError::Network(err.to_string())
}
