// src/diff.rs

//! Pairing records between two metadata snapshots
//!
//! Each new record is paired with the first old record, in document order,
//! that matches it. Old records are not consumed by a pairing: identical new
//! records all pair with the same old record, and later identical old
//! records stay unmatched. Without duplicate identities both sides report
//! the same number of matches.

use crate::repository::Matchable;
use std::collections::HashMap;
use tracing::info;

/// Per-record match flags for both sides of a comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matchup {
    /// `new_matched[i]` is true if `new[i]` has a counterpart in `old`
    pub new_matched: Vec<bool>,

    /// `old_matched[j]` is true if `old[j]` has a counterpart in `new`
    pub old_matched: Vec<bool>,
}

impl Matchup {
    /// Number of new records with an old counterpart
    pub fn matched_count(&self) -> usize {
        self.new_matched.iter().filter(|m| **m).count()
    }

    /// Number of new records with no old counterpart
    pub fn added_count(&self) -> usize {
        self.new_matched.len() - self.matched_count()
    }

    /// Number of old records with no new counterpart
    pub fn removed_count(&self) -> usize {
        self.old_matched.iter().filter(|m| !**m).count()
    }
}

/// Pair the records of `new` with those of `old`
///
/// Old records are indexed by identity, keeping the first position of each
/// identity. A lookup gives the same record as scanning `old` for the first
/// match.
pub fn match_records<'a, T: Matchable>(new: &'a [T], old: &'a [T]) -> Matchup {
    let mut matchup = Matchup {
        new_matched: vec![false; new.len()],
        old_matched: vec![false; old.len()],
    };

    let mut index: HashMap<T::Key<'a>, usize> = HashMap::with_capacity(old.len());
    for (j, record) in old.iter().enumerate() {
        index.entry(record.identity()).or_insert(j);
    }

    for (i, record) in new.iter().enumerate() {
        if let Some(&j) = index.get(&record.identity()) {
            matchup.new_matched[i] = true;
            matchup.old_matched[j] = true;
        }
    }

    info!(
        "Matched {} of {} new and {} old records",
        matchup.matched_count(),
        new.len(),
        old.len()
    );
    matchup
}
