//! Start/status surface for the route layer.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_logging::engine_info;
use futures_util::FutureExt;
use jobscout_core::{Phase, RunState};
use serde::Serialize;
use serde_json::json;
use tokio::runtime::Handle;

use crate::pipeline::Pipeline;
use crate::tracker::RunTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Accepted { run: u64, status_url: String },
    AlreadyRunning { phase: Phase },
}

impl StartOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, StartOutcome::Accepted { .. })
    }

    pub fn http_status(&self) -> u16 {
        match self {
            StartOutcome::Accepted { .. } => 202,
            StartOutcome::AlreadyRunning { .. } => 429,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            StartOutcome::Accepted { run, status_url } => json!({
                "accepted": true,
                "run": run,
                "statusUrl": status_url,
            }),
            StartOutcome::AlreadyRunning { phase } => json!({
                "accepted": false,
                "reason": "a run is already in progress",
                "phase": phase,
            }),
        }
    }
}

/// Status as served to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_running: bool,
    pub phase: Phase,
    pub run: u64,
    pub listings_found: usize,
    pub listings_processed: usize,
    pub enriched_count: usize,
    pub total_persisted: usize,
    pub elapsed_seconds: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl StatusReport {
    pub fn from_state(state: &RunState, now: DateTime<Utc>) -> Self {
        Self {
            is_running: state.is_running(),
            phase: state.phase(),
            run: state.run(),
            listings_found: state.listings_found(),
            listings_processed: state.listings_processed(),
            enriched_count: state.enriched_count(),
            total_persisted: state.total_persisted(),
            elapsed_seconds: state.elapsed_seconds(now),
            started_at: state.started_at(),
            last_updated_at: state.last_updated_at(),
            last_error: state.last_error().map(str::to_string),
        }
    }
}

pub struct JobControl {
    runtime: Handle,
    tracker: RunTracker,
    pipeline: Arc<Pipeline>,
    status_url: String,
}

impl JobControl {
    pub fn new(
        runtime: Handle,
        tracker: RunTracker,
        pipeline: Arc<Pipeline>,
        status_url: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            tracker,
            pipeline,
            status_url: status_url.into(),
        }
    }

    /// Start a run in the background unless one is already active. The run
    /// always ends in `Completed` or `Failed`, including when it panics.
    pub fn start(&self) -> StartOutcome {
        let run = match self.tracker.try_start() {
            Ok(run) => run,
            Err(phase) => {
                engine_info!("Start rejected: run in progress ({})", phase);
                return StartOutcome::AlreadyRunning { phase };
            }
        };

        let tracker = self.tracker.clone();
        let pipeline = Arc::clone(&self.pipeline);
        self.runtime.spawn(async move {
            let outcome = AssertUnwindSafe(pipeline.run(&tracker))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(summary)) => {
                    engine_info!(
                        "Run {} completed: {} found, {} enriched, {} persisted",
                        run,
                        summary.listings_found,
                        summary.enrichment.enriched,
                        summary.upsert.persisted()
                    );
                    tracker.finish();
                }
                Ok(Err(err)) => tracker.fail(err.to_string()),
                Err(panic) => tracker.fail(format!("pipeline panicked: {}", panic_message(&*panic))),
            }
        });

        engine_info!("Run {} accepted", run);
        StartOutcome::Accepted {
            run,
            status_url: self.status_url.clone(),
        }
    }

    pub fn status(&self) -> StatusReport {
        StatusReport::from_state(&self.tracker.snapshot(), self.tracker.now())
    }

    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    /// Poll until no run is active and return the final status.
    pub async fn wait_until_idle(&self, poll: Duration) -> StatusReport {
        loop {
            let status = self.status();
            if !status.is_running {
                return status;
            }
            tokio::time::sleep(poll).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
