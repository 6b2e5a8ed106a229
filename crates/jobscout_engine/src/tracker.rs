use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_error, engine_info};
use jobscout_core::{update, Effect, Msg, Phase, RunState};

use crate::types::{EngineEvent, ProgressSink};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Process-wide owner of the [`RunState`]. Every change goes through
/// [`jobscout_core::update`] under the write lock; readers get copies.
#[derive(Clone)]
pub struct RunTracker {
    state: Arc<RwLock<RunState>>,
    clock: Clock,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            state: Arc::new(RwLock::new(RunState::new())),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Claim the run guard. Returns the new run number, or the phase of the
    /// run that already holds it.
    pub fn try_start(&self) -> Result<u64, Phase> {
        let at = self.now();
        let mut rejected = None;
        for effect in self.apply(Msg::StartRequested { at }) {
            match effect {
                Effect::LaunchRun { run } => return Ok(run),
                Effect::StartRejected { phase } => rejected = Some(phase),
                Effect::TransitionIgnored { .. } => {}
            }
        }
        Err(rejected.unwrap_or_else(|| self.snapshot().phase()))
    }

    pub fn snapshot(&self) -> RunState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn finish(&self) {
        let at = self.now();
        self.apply(Msg::Finished { at });
    }

    pub fn fail(&self, error: impl Into<String>) {
        let error = error.into();
        engine_error!("Run failed: {}", error);
        let at = self.now();
        self.apply(Msg::Failed { error, at });
    }

    fn apply(&self, msg: Msg) -> Vec<Effect> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.phase();
        let (next, effects) = update(std::mem::take(&mut *guard), msg);
        *guard = next;
        let after = guard.phase();
        drop(guard);

        if before != after {
            engine_info!("Run phase {} -> {}", before, after);
        }
        for effect in &effects {
            if let Effect::TransitionIgnored { from, to } = effect {
                engine_debug!("Ignored transition {} -> {}", from, to);
            }
        }
        effects
    }
}

impl ProgressSink for RunTracker {
    fn emit(&self, event: EngineEvent) {
        let at = self.now();
        let msg = match event {
            EngineEvent::PhaseEntered(phase) => Msg::PhaseEntered { phase, at },
            EngineEvent::ListingsFound(count) => Msg::ListingsFound { count, at },
            EngineEvent::ListingsProcessed(count) => Msg::ListingsProcessed { count, at },
            EngineEvent::EnrichmentProgress { enriched, .. } => Msg::Enriched {
                count: enriched,
                at,
            },
            EngineEvent::Persisted {
                inserted, updated, ..
            } => Msg::Persisted {
                total: inserted + updated,
                at,
            },
        };
        self.apply(msg);
    }
}
