use std::collections::BTreeSet;
use std::ops::Range;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledJob {
    Scrape,
    DailyDigest,
    WeeklyDigest,
}

impl ScheduledJob {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduledJob::Scrape => "scrape",
            ScheduledJob::DailyDigest => "daily_digest",
            ScheduledJob::WeeklyDigest => "weekly_digest",
        }
    }
}

/// Wall-clock windows, evaluated in a fixed UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleWindows {
    /// Asia/Baku is UTC+4 all year.
    pub utc_offset_hours: i32,
    pub scrape_hour: u32,
    pub scrape_minutes: Range<u32>,
    pub digest_hour: u32,
    pub digest_minutes: Range<u32>,
    pub weekly_day: Weekday,
}

impl Default for ScheduleWindows {
    fn default() -> Self {
        Self {
            utc_offset_hours: 4,
            scrape_hour: 14,
            scrape_minutes: 0..15,
            digest_hour: 14,
            digest_minutes: 45..60,
            weekly_day: Weekday::Mon,
        }
    }
}

/// Jobs whose window contains `now`. An out-of-range offset yields no jobs.
pub fn jobs_due(now: DateTime<Utc>, windows: &ScheduleWindows) -> BTreeSet<ScheduledJob> {
    let mut due = BTreeSet::new();
    let Some(offset) = windows
        .utc_offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
    else {
        return due;
    };
    let local = now.with_timezone(&offset);
    let (hour, minute) = (local.hour(), local.minute());

    if hour == windows.scrape_hour && windows.scrape_minutes.contains(&minute) {
        due.insert(ScheduledJob::Scrape);
    }
    if hour == windows.digest_hour && windows.digest_minutes.contains(&minute) {
        due.insert(ScheduledJob::DailyDigest);
        if local.weekday() == windows.weekly_day {
            due.insert(ScheduledJob::WeeklyDigest);
        }
    }
    due
}
