//! Indel priority ranking used to break ties between realignment results.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::candidates::{CandidateIndel, ObservedIndel};

/// Closed set of ranking strategies, chosen at construction time.
#[derive(Debug, Clone)]
pub enum IndelRanker {
    /// Canonical ordering only (position, kind, alleles).
    Canonical,
    /// Higher read support ranks first; canonical order breaks ties.
    BySupport(HashMap<String, u32>),
}

impl IndelRanker {
    /// Build a support-based ranker from observed candidates.
    pub fn from_observations(observed: &[ObservedIndel]) -> Self {
        let support = observed
            .iter()
            .map(|entry| (entry.indel.canonical_key(), entry.support))
            .collect();
        IndelRanker::BySupport(support)
    }

    /// Priority comparison; `Less` means `a` ranks ahead of `b`.
    pub fn compare(&self, a: &CandidateIndel, b: &CandidateIndel) -> Ordering {
        match self {
            IndelRanker::Canonical => a.cmp_canonical(b),
            IndelRanker::BySupport(support) => {
                let support_a = support.get(&a.canonical_key()).copied().unwrap_or(0);
                let support_b = support.get(&b.canonical_key()).copied().unwrap_or(0);
                support_b
                    .cmp(&support_a)
                    .then_with(|| a.cmp_canonical(b))
            }
        }
    }

    /// The highest-priority indel of a combination, if any.
    pub fn top<'a>(&self, combination: &[&'a CandidateIndel]) -> Option<&'a CandidateIndel> {
        combination
            .iter()
            .copied()
            .min_by(|a, b| self.compare(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(pos: u32) -> CandidateIndel {
        CandidateIndel::new("chr1", pos, "A", "AT")
    }

    #[test]
    fn canonical_ranker_follows_canonical_order() {
        let ranker = IndelRanker::Canonical;
        assert_eq!(ranker.compare(&ins(5), &ins(9)), Ordering::Less);
    }

    #[test]
    fn support_ranker_prefers_better_supported_indels() {
        let a = ins(5);
        let b = ins(9);
        let observed = vec![
            ObservedIndel { indel: a.clone(), support: 2 },
            ObservedIndel { indel: b.clone(), support: 7 },
        ];
        let ranker = IndelRanker::from_observations(&observed);
        assert_eq!(ranker.compare(&b, &a), Ordering::Less);
        assert_eq!(ranker.top(&[&a, &b]).expect("non-empty").position, 9);
    }
}
