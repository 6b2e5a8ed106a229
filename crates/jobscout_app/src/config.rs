//! RON configuration for the `jobscout` binary.
//!
//! Every section falls back to its defaults, so a config file only needs the
//! values it changes. Durations are written in milliseconds.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_logging::LogDestination;
use jobscout_core::{ScheduleWindows, SiteProfile};
use jobscout_engine::{
    ChromeSettings, ConvergenceSettings, EnrichmentSettings, PipelineSettings, ProbeSettings,
};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteProfile,
    pub limits: Limits,
    pub browser: BrowserConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
    pub schedule: ScheduleWindows,
    /// Reported to clients when a run is accepted.
    pub status_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub navigation_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub settle_after_load_ms: u64,
    pub scroll_settle_ms: u64,
    pub max_items: usize,
    pub max_stall_iterations: usize,
    pub max_scroll_iterations: usize,
    pub probe_batch_size: usize,
    pub field_timeout_ms: u64,
    pub company_timeout_ms: u64,
    pub enrich_concurrency: usize,
    pub enrich_timeout_ms: u64,
    pub detail_read_timeout_ms: u64,
    pub max_enrich_candidates: usize,
    pub enrich_batch_pause_ms: u64,
    pub upsert_batch_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 60_000,
            ready_timeout_ms: 60_000,
            settle_after_load_ms: 2_000,
            scroll_settle_ms: 2_000,
            max_items: 200,
            max_stall_iterations: 5,
            max_scroll_iterations: 15,
            probe_batch_size: 30,
            field_timeout_ms: 500,
            company_timeout_ms: 1_000,
            enrich_concurrency: 15,
            enrich_timeout_ms: 25_000,
            detail_read_timeout_ms: 4_000,
            max_enrich_candidates: 150,
            enrich_batch_pause_ms: 500,
            upsert_batch_size: jobscout_engine::DEFAULT_UPSERT_BATCH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    /// Overrides the built-in desktop user agent.
    pub user_agent: Option<String>,
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: None,
            extra_args: ChromeSettings::default().extra_args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreConfig {
    Memory,
    File(PathBuf),
    Supabase {
        url: String,
        table: String,
        /// Name of the environment variable holding the API key.
        api_key_env: String,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File(PathBuf::from("data"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub target: LogTarget,
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::Both,
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    pub fn destination(&self) -> LogDestination {
        match self.target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.level)
            .with_context(|| format!("invalid log level {:?}", self.level))
    }
}

impl AppConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let limits = &self.limits;
        PipelineSettings {
            site: self.site.clone(),
            navigation_timeout: ms(limits.navigation_timeout_ms),
            ready_timeout: ms(limits.ready_timeout_ms),
            settle_after_load: ms(limits.settle_after_load_ms),
            convergence: ConvergenceSettings {
                max_items: limits.max_items,
                max_stall_iterations: limits.max_stall_iterations,
                max_iterations: limits.max_scroll_iterations,
                settle: ms(limits.scroll_settle_ms),
            },
            probe: ProbeSettings {
                field_timeout: ms(limits.field_timeout_ms),
                company_timeout: ms(limits.company_timeout_ms),
                batch_size: limits.probe_batch_size,
            },
            enrichment: EnrichmentSettings {
                concurrency: limits.enrich_concurrency,
                per_request_timeout: ms(limits.enrich_timeout_ms),
                detail_read_timeout: ms(limits.detail_read_timeout_ms),
                max_candidates: limits.max_enrich_candidates,
                batch_pause: ms(limits.enrich_batch_pause_ms),
            },
            upsert_batch_size: limits.upsert_batch_size,
        }
    }

    pub fn chrome_settings(&self) -> ChromeSettings {
        let defaults = ChromeSettings::default();
        ChromeSettings {
            headless: self.browser.headless,
            user_agent: self
                .browser
                .user_agent
                .clone()
                .unwrap_or(defaults.user_agent),
            extra_args: self.browser.extra_args.clone(),
            ..defaults
        }
    }

    pub fn status_url(&self) -> &str {
        if self.status_url.is_empty() {
            "/api/scrape/status"
        } else {
            &self.status_url
        }
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Read and parse `path`. Returns `Ok(None)` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = ron::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(Some(config))
}
