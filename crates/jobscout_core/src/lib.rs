//! Jobscout core: listing records, field extraction rules, run state machine
//! and schedule. No I/O happens in this crate.
mod effect;
mod extract;
mod msg;
mod record;
mod schedule;
mod site;
mod state;
mod update;

pub use effect::Effect;
pub use extract::{
    build_record, collapse_whitespace, company_from_label, company_from_url, first_match,
    salary_from_detail_text, salary_from_list_badge, ElementProbe, ExtractionContext,
    FieldStrategy, COMPANY_STRATEGIES, SALARY_STRATEGIES,
};
pub use msg::Msg;
pub use record::{dedupe_by_url, is_known, ListingRecord, UNKNOWN};
pub use schedule::{jobs_due, ScheduleWindows, ScheduledJob};
pub use site::{SiteProfile, SiteSelectors, DEFAULT_BASE_URL};
pub use state::{Phase, RunState};
pub use update::update;
