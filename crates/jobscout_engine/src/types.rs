use jobscout_core::Phase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PhaseEntered(Phase),
    /// Listing elements currently on the page.
    ListingsFound(usize),
    /// Elements that produced a record.
    ListingsProcessed(usize),
    EnrichmentProgress {
        enriched: usize,
        attempted: usize,
        candidates: usize,
    },
    Persisted {
        inserted: usize,
        updated: usize,
        failed: usize,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}
