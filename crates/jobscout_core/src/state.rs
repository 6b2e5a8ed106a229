use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Scrolling,
    Extracting,
    Enriching,
    Saving,
    Completed,
    Failed,
}

impl Phase {
    /// Any phase other than Idle/Completed/Failed holds the run guard.
    pub fn is_running(self) -> bool {
        !matches!(self, Phase::Idle | Phase::Completed | Phase::Failed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }

    /// Position in the forward pipeline order; transitions never decrease it.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::Loading => 1,
            Phase::Scrolling => 2,
            Phase::Extracting => 3,
            Phase::Enriching => 4,
            Phase::Saving => 5,
            Phase::Completed | Phase::Failed => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Scrolling => "scrolling",
            Phase::Extracting => "extracting",
            Phase::Enriching => "enriching",
            Phase::Saving => "saving",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle and counters of the current (or most recent) pipeline run.
///
/// Only [`crate::update`] mutates it; everything else reads snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    phase: Phase,
    run: u64,
    revision: u64,
    started_at: Option<DateTime<Utc>>,
    last_updated_at: Option<DateTime<Utc>>,
    listings_found: usize,
    listings_processed: usize,
    enriched_count: usize,
    total_persisted: usize,
    last_error: Option<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    /// Number of runs accepted so far.
    pub fn run(&self) -> u64 {
        self.run
    }

    /// Incremented on every applied change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at
    }

    pub fn listings_found(&self) -> usize {
        self.listings_found
    }

    pub fn listings_processed(&self) -> usize {
        self.listings_processed
    }

    pub fn enriched_count(&self) -> usize {
        self.enriched_count
    }

    pub fn total_persisted(&self) -> usize {
        self.total_persisted
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Seconds since the run started; frozen once the run is terminal.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        let Some(started) = self.started_at else {
            return 0;
        };
        let end = if self.phase.is_terminal() {
            self.last_updated_at.unwrap_or(now)
        } else {
            now
        };
        u64::try_from((end - started).num_seconds()).unwrap_or(0)
    }

    pub(crate) fn begin(&mut self, at: DateTime<Utc>) {
        *self = RunState {
            phase: Phase::Loading,
            run: self.run + 1,
            revision: self.revision,
            started_at: Some(at),
            ..RunState::default()
        };
        self.touch(at);
    }

    pub(crate) fn enter(&mut self, phase: Phase, at: DateTime<Utc>) -> bool {
        if !self.is_running() || phase.rank() < self.phase.rank() {
            return false;
        }
        self.phase = phase;
        self.touch(at);
        true
    }

    pub(crate) fn set_listings_found(&mut self, count: usize, at: DateTime<Utc>) {
        self.listings_found = count;
        self.touch(at);
    }

    pub(crate) fn set_listings_processed(&mut self, count: usize, at: DateTime<Utc>) {
        self.listings_processed = count;
        self.touch(at);
    }

    pub(crate) fn set_enriched(&mut self, count: usize, at: DateTime<Utc>) {
        self.enriched_count = count;
        self.touch(at);
    }

    pub(crate) fn set_persisted(&mut self, total: usize, at: DateTime<Utc>) {
        self.total_persisted = total;
        self.touch(at);
    }

    pub(crate) fn fail(&mut self, error: String, at: DateTime<Utc>) {
        self.phase = Phase::Failed;
        self.last_error = Some(error);
        self.touch(at);
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated_at = Some(at);
        self.revision += 1;
    }
}
