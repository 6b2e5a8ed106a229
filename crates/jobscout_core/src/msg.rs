use chrono::{DateTime, Utc};

use crate::Phase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A client asked for a new run.
    StartRequested { at: DateTime<Utc> },
    /// The pipeline moved on to another stage.
    PhaseEntered { phase: Phase, at: DateTime<Utc> },
    /// Listing elements present after scrolling.
    ListingsFound { count: usize, at: DateTime<Utc> },
    /// Elements that produced a usable record.
    ListingsProcessed { count: usize, at: DateTime<Utc> },
    /// Running total of records filled in from detail pages.
    Enriched { count: usize, at: DateTime<Utc> },
    /// Rows inserted plus rows updated.
    Persisted { total: usize, at: DateTime<Utc> },
    /// The pipeline returned successfully.
    Finished { at: DateTime<Utc> },
    /// The pipeline returned an error or panicked.
    Failed { error: String, at: DateTime<Utc> },
}
