//! Jobscout engine: page drivers, the scrape pipeline, stores and the run
//! control surface.
mod chrome;
mod control;
mod driver;
mod enrich;
mod file_store;
mod pipeline;
mod probe;
mod scroll;
mod store;
mod supabase;
mod tracker;
mod types;
mod upsert;

pub use chrome::{ChromeDriver, ChromeSettings};
pub use control::{JobControl, StartOutcome, StatusReport};
pub use driver::{DriverError, ElementHandle, Page, PageDriver, Scope};
pub use enrich::{
    enrich_salaries, enrichment_candidates, EnrichError, EnrichmentReport, EnrichmentSettings,
};
pub use file_store::{ensure_store_dir, JsonFileStore, LISTINGS_FILE};
pub use pipeline::{Pipeline, PipelineError, PipelineSettings, RunSummary};
pub use probe::{extract_listings, probe_element, ProbeSettings};
pub use scroll::{scroll_to_convergence, ConvergenceSettings};
pub use store::{ListingStore, MemoryStore, StoreError, UpsertKind};
pub use supabase::{SupabaseSettings, SupabaseStore};
pub use tracker::{Clock, RunTracker};
pub use types::{EngineEvent, NullSink, ProgressSink};
pub use upsert::{upsert_all, UpsertFailure, UpsertReport, DEFAULT_UPSERT_BATCH};
