use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Placeholder for a field that could not be found. Not an error.
pub const UNKNOWN: &str = "unknown";

/// One job posting as extracted from the listing page.
///
/// `url` is the identity key: it is absolute, canonical and stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub title: String,
    pub company_name: String,
    pub url: String,
    pub salary: String,
    pub source_site: String,
}

impl ListingRecord {
    pub fn salary_known(&self) -> bool {
        is_known(&self.salary)
    }

    pub fn company_known(&self) -> bool {
        is_known(&self.company_name)
    }

    /// Combine a freshly scraped record with the row already stored under the
    /// same key. Known company/salary values are never replaced by the sentinel.
    pub fn merged_over(&self, stored: &ListingRecord) -> ListingRecord {
        ListingRecord {
            title: self.title.clone(),
            company_name: prefer_known(&self.company_name, &stored.company_name),
            url: self.url.clone(),
            salary: prefer_known(&self.salary, &stored.salary),
            source_site: self.source_site.clone(),
        }
    }

    fn fill_unknown_from(&mut self, other: &ListingRecord) {
        if !self.company_known() && other.company_known() {
            self.company_name = other.company_name.clone();
        }
        if !self.salary_known() && other.salary_known() {
            self.salary = other.salary.clone();
        }
    }
}

pub fn is_known(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(UNKNOWN)
}

fn prefer_known(incoming: &str, stored: &str) -> String {
    if is_known(incoming) || !is_known(stored) {
        incoming.to_string()
    } else {
        stored.to_string()
    }
}

/// Collapse duplicate URLs, keeping the first occurrence in input order.
/// Later duplicates only contribute fields the first one left unknown.
pub fn dedupe_by_url(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<ListingRecord> = Vec::with_capacity(records.len());
    for record in records {
        match index.get(&record.url) {
            Some(&pos) => unique[pos].fill_unknown_from(&record),
            None => {
                index.insert(record.url.clone(), unique.len());
                unique.push(record);
            }
        }
    }
    unique
}
