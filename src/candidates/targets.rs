//! Target calling: which candidate indels are frequent enough to act on.

use tracing::debug;

use crate::candidates::{CandidateIndel, ObservedIndel};

/// Source of local read depth used as the frequency denominator.
///
/// Implementations decide how duplicates are counted; the orchestrator's
/// block-coverage tracker excludes them unless duplicates are configured in.
pub trait AlleleCountSource {
    /// Read depth near the given 1-based reference position.
    fn coverage_at(&self, chrom: &str, position: u32) -> u32;
}

/// Frequency-cutoff policy over observed candidates.
#[derive(Debug, Clone, Copy)]
pub struct IndelTargetCaller {
    /// Minimum observed-alt frequency (support / local coverage).
    pub min_alt_frequency: f32,
}

impl IndelTargetCaller {
    /// Construct a caller with the given cutoff.
    pub fn new(min_alt_frequency: f32) -> Self {
        Self { min_alt_frequency }
    }

    /// Keep the candidates whose support frequency meets the cutoff.
    pub fn call(
        &self,
        observed: &[ObservedIndel],
        counts: &dyn AlleleCountSource,
    ) -> Vec<CandidateIndel> {
        let mut accepted = Vec::new();
        for entry in observed {
            let coverage = counts
                .coverage_at(&entry.indel.chrom, entry.indel.position)
                .max(entry.support);
            let frequency = entry.support as f32 / coverage.max(1) as f32;
            if frequency >= self.min_alt_frequency {
                accepted.push(entry.indel.clone());
            } else {
                debug!(
                    indel = %entry.indel,
                    support = entry.support,
                    coverage,
                    "candidate below frequency cutoff"
                );
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatCoverage(u32);

    impl AlleleCountSource for FlatCoverage {
        fn coverage_at(&self, _chrom: &str, _position: u32) -> u32 {
            self.0
        }
    }

    fn observed(pos: u32, support: u32) -> ObservedIndel {
        ObservedIndel {
            indel: CandidateIndel::new("chr1", pos, "A", "AT"),
            support,
        }
    }

    #[test]
    fn accepts_at_or_above_cutoff() {
        let caller = IndelTargetCaller::new(0.2);
        let accepted = caller.call(&[observed(10, 2), observed(20, 1)], &FlatCoverage(10));
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].position, 10);
    }

    #[test]
    fn zero_coverage_falls_back_to_support() {
        let caller = IndelTargetCaller::new(0.5);
        let accepted = caller.call(&[observed(10, 3)], &FlatCoverage(0));
        assert_eq!(accepted.len(), 1);
    }
}
