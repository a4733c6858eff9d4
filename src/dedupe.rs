// src/dedupe.rs
use std::collections::HashSet;

use crate::model::Record;

/// Keep the records from `new_records` whose identity key does not appear in `existing`.
///
/// Stable: survivors keep their source order. Two new records sharing a key are
/// both kept; suppressing duplicates inside one batch is up to the fetch adapter.
pub fn dedupe(new_records: &[Record], existing: &[Record]) -> Vec<Record> {
    if new_records.is_empty() {
        return Vec::new();
    }

    let seen: HashSet<String> = existing.iter().map(Record::identity_key).collect();

    new_records
        .iter()
        .filter(|r| !seen.contains(&r.identity_key()))
        .cloned()
        .collect()
}

/// In-batch duplicate suppression for adapters: first occurrence of a key wins.
pub fn unique_by_identity(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(r.identity_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HireRecord, PostingRecord};
    use chrono::Utc;

    fn hire(name: &str, title: &str) -> Record {
        Record::Hire(HireRecord {
            name: name.into(),
            title: title.into(),
            location: String::new(),
            profile_url: None,
            source: "people-search".into(),
            discovered_at: Utc::now(),
        })
    }

    fn posting(title: &str, location: &str) -> Record {
        Record::Posting(PostingRecord {
            title: title.into(),
            location: location.into(),
            url: None,
            department: None,
            source: "feed".into(),
            discovered_at: Utc::now(),
        })
    }

    #[test]
    fn identical_sets_yield_nothing() {
        let x = vec![hire("Ann", "Dev"), posting("Engineer", "Remote")];
        assert!(dedupe(&x, &x).is_empty());
    }

    #[test]
    fn empty_history_keeps_everything_in_order() {
        let x = vec![posting("B", "x"), posting("A", "y"), hire("Zed", "CTO")];
        assert_eq!(dedupe(&x, &[]), x);
    }

    #[test]
    fn empty_batch_yields_nothing() {
        let x = vec![posting("Engineer", "Remote")];
        assert!(dedupe(&[], &x).is_empty());
    }

    #[test]
    fn match_is_case_insensitive() {
        let existing = vec![posting("Engineer", "Remote")];
        let new = vec![posting("ENGINEER", "remote"), posting("Designer", "Remote")];
        let out = dedupe(&new, &existing);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title(), "Designer");
    }

    #[test]
    fn whitespace_variants_are_not_collapsed() {
        let existing = vec![posting("Engineer", "Remote")];
        let new = vec![posting("Engineer ", "Remote")];
        assert_eq!(dedupe(&new, &existing).len(), 1);
    }

    #[test]
    fn duplicates_within_batch_survive_together() {
        let new = vec![hire("Ann", "Dev"), hire("ann", "dev")];
        assert_eq!(dedupe(&new, &[]).len(), 2);
        assert_eq!(unique_by_identity(new).len(), 1);
    }

    #[test]
    fn inputs_are_untouched() {
        let existing = vec![hire("Ann", "Dev")];
        let new = vec![hire("Ann", "Dev"), hire("Bob", "Ops")];
        let before = new.clone();
        let _ = dedupe(&new, &existing);
        assert_eq!(new, before);
    }
}
