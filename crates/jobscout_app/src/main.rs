mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use engine_logging::{engine_info, engine_warn};
use jobscout_core::{jobs_due, Phase};
use jobscout_engine::{
    ChromeDriver, JobControl, JsonFileStore, ListingStore, MemoryStore, Pipeline, RunTracker,
    SupabaseSettings, SupabaseStore,
};
use tokio::runtime::Handle;

use config::{AppConfig, StoreConfig};

#[derive(Parser)]
#[command(name = "jobscout", version, about = "Scrape remote job listings into a listing store")]
struct Cli {
    /// Path to the RON config file
    #[arg(long, default_value = "jobscout.ron")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scrape and wait for it to finish
    Run {
        /// Status poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,
    },
    /// Print the scheduled jobs due at an instant
    Due {
        /// RFC 3339 timestamp; defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = config::load(&cli.config)?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    engine_logging::initialize(
        config.log.destination(),
        config.log.level_filter()?,
        config.log.file.as_deref(),
    );
    if found {
        engine_info!("Loaded config from {}", cli.config.display());
    } else {
        engine_warn!("Config {} not found; using defaults", cli.config.display());
    }

    match cli.command {
        Command::Run { poll_ms } => run(&config, Duration::from_millis(poll_ms)).await,
        Command::Due { at } => {
            print_due(&config, at.unwrap_or_else(Utc::now));
            Ok(())
        }
    }
}

async fn run(config: &AppConfig, poll: Duration) -> Result<()> {
    let store = open_store(&config.store)?;
    let chrome = config.chrome_settings();
    let driver = tokio::task::spawn_blocking(move || ChromeDriver::launch(&chrome))
        .await
        .context("browser launch task failed")?
        .context("launching Chrome")?;

    let pipeline = Pipeline::new(Arc::new(driver), store, config.pipeline_settings());
    let control = JobControl::new(
        Handle::current(),
        RunTracker::new(),
        Arc::new(pipeline),
        config.status_url(),
    );

    let outcome = control.start();
    println!("{} {}", outcome.http_status(), outcome.body());
    if !outcome.accepted() {
        bail!("run was not accepted");
    }

    let mut seen_revision = None;
    let status = loop {
        let revision = control.tracker().snapshot().revision();
        let status = control.status();
        if seen_revision != Some(revision) {
            seen_revision = Some(revision);
            println!("{}", serde_json::to_string(&status)?);
        }
        if !status.is_running {
            break status;
        }
        tokio::time::sleep(poll).await;
    };

    if status.phase == Phase::Failed {
        bail!(
            "run failed: {}",
            status.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    engine_info!(
        "Run finished in {}s: {} listings found, {} persisted",
        status.elapsed_seconds,
        status.listings_found,
        status.total_persisted
    );
    Ok(())
}

fn open_store(config: &StoreConfig) -> Result<Arc<dyn ListingStore>> {
    let store: Arc<dyn ListingStore> = match config {
        StoreConfig::Memory => {
            engine_warn!("Using the in-memory store; results are discarded on exit");
            Arc::new(MemoryStore::new())
        }
        StoreConfig::File(dir) => Arc::new(
            JsonFileStore::open(dir)
                .with_context(|| format!("opening listing store in {}", dir.display()))?,
        ),
        StoreConfig::Supabase {
            url,
            table,
            api_key_env,
        } => {
            let api_key = std::env::var(api_key_env)
                .with_context(|| format!("environment variable {api_key_env} is not set"))?;
            Arc::new(
                SupabaseStore::new(SupabaseSettings {
                    base_url: url.clone(),
                    table: table.clone(),
                    api_key,
                    connect_timeout: Duration::from_secs(10),
                    request_timeout: Duration::from_secs(30),
                })
                .context("configuring Supabase store")?,
            )
        }
    };
    Ok(store)
}

fn print_due(config: &AppConfig, at: DateTime<Utc>) {
    let due = jobs_due(at, &config.schedule);
    if due.is_empty() {
        engine_info!("No jobs due at {}", at.to_rfc3339());
    }
    for job in due {
        println!("{}", job.as_str());
    }
}
