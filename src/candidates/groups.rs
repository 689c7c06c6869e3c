//! Coexistence groups: sets of indels empirically observed in one read.
//!
//! A group is an ordered tuple of up to three canonical indel keys. The
//! realigner may only combine indels whose tuple is a prefix of some
//! recorded group, which bounds the combinatorial search to combinations
//! the data has actually exhibited.

use std::collections::BTreeSet;

use crate::candidates::CandidateIndel;

/// Largest coexistence tuple that is tracked.
pub const MAX_GROUP_SIZE: usize = 3;

/// An ordered coexistence tuple of canonical indel keys.
pub type GroupKey = Vec<String>;

/// Build the canonical tuple for indels seen together in one read.
///
/// Returns `None` for fewer than two indels (single-indel attempts need no
/// group). Reads carrying more than [`MAX_GROUP_SIZE`] indels record their
/// first three in canonical order.
pub fn group_key_for_read(indels: &[CandidateIndel]) -> Option<GroupKey> {
    if indels.len() < 2 {
        return None;
    }
    let mut sorted: Vec<&CandidateIndel> = indels.iter().collect();
    sorted.sort_by(|a, b| a.cmp_canonical(b));
    sorted.dedup_by(|a, b| a.canonical_key() == b.canonical_key());
    if sorted.len() < 2 {
        return None;
    }
    Some(
        sorted
            .iter()
            .take(MAX_GROUP_SIZE)
            .map(|indel| indel.canonical_key())
            .collect(),
    )
}

/// The set of observed coexistence tuples visible to a realignment pass.
#[derive(Debug, Clone, Default)]
pub struct CoexistenceGroups {
    groups: BTreeSet<GroupKey>,
}

impl CoexistenceGroups {
    /// Empty group set; only single-indel attempts will be allowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed tuple.
    pub fn insert(&mut self, key: GroupKey) {
        if key.len() >= 2 && key.len() <= MAX_GROUP_SIZE {
            self.groups.insert(key);
        }
    }

    /// Merge another group set into this one.
    pub fn extend(&mut self, other: &CoexistenceGroups) {
        for key in &other.groups {
            self.groups.insert(key.clone());
        }
    }

    /// Number of recorded tuples.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no tuples are recorded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether a combination (canonically ordered) may be attempted.
    ///
    /// Singles are always allowed; a larger combination must form a prefix
    /// of some recorded group.
    pub fn allows(&self, combination: &[&CandidateIndel]) -> bool {
        if combination.len() <= 1 {
            return true;
        }
        if combination.len() > MAX_GROUP_SIZE {
            return false;
        }
        let keys: Vec<String> = combination
            .iter()
            .map(|indel| indel.canonical_key())
            .collect();
        self.groups
            .iter()
            .any(|group| group.len() >= keys.len() && group[..keys.len()] == keys[..])
    }

    /// Iterate over the recorded tuples in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.iter()
    }
}
