//! Windowed candidate state: block buckets, coexistence groups, clearing.
//!
//! Candidates accumulate in fixed-size genomic blocks as the extraction
//! scan advances. A block is cleared once the scan position has advanced a
//! full block past it; cleared candidates are handed to the orchestrator in
//! batches and purged two windows later, keeping the block immediately
//! behind the cleared boundary alive so indels can still combine across the
//! block edge.

use std::collections::BTreeMap;

use tracing::trace;

use crate::candidates::{group_key_for_read, CandidateIndel, CoexistenceGroups, ObservedIndel};

/// Default block length in reference bases.
pub const DEFAULT_BLOCK_SIZE: u32 = 1000;

/// A half-open, block-aligned reference interval that has been cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearedRegion {
    /// 0-based inclusive start.
    pub start: u32,
    /// 0-based exclusive end.
    pub end: u32,
}

/// One batch of candidates ready for target calling and realignment.
#[derive(Debug, Clone)]
pub struct CandidateBatch {
    /// Candidates from every visible block, canonically ordered.
    pub candidates: Vec<ObservedIndel>,
    /// Blocks newly cleared since the previous batch, or `None` when the
    /// watermark did not cross a block boundary.
    pub cleared_regions: Option<Vec<ClearedRegion>>,
    /// Position boundary this batch cleared through (block-aligned).
    pub cleared_through: u32,
    /// Whether this batch drained the whole chromosome.
    pub flush: bool,
}

#[derive(Debug, Default)]
struct BlockBucket {
    /// Candidates keyed by canonical identity, support aggregated.
    candidates: BTreeMap<String, ObservedIndel>,
    /// Coexistence tuples whose leading indel lives in this block.
    groups: CoexistenceGroups,
}

/// Per-chromosome candidate cache keyed by fixed-size genomic blocks.
///
/// Owned exclusively by one chromosome's orchestration loop; no interior
/// locking.
#[derive(Debug)]
pub struct RealignStateManager {
    block_size: u32,
    buckets: BTreeMap<u32, BlockBucket>,
    cleared_through: u32,
}

impl RealignStateManager {
    /// Create a manager with the given block size (bases).
    pub fn new(block_size: u32) -> Self {
        Self {
            block_size: block_size.max(1),
            buckets: BTreeMap::new(),
            cleared_through: 0,
        }
    }

    fn block_index(&self, position: u32) -> u32 {
        position.saturating_sub(1) / self.block_size
    }

    fn block_end(&self, index: u32) -> u32 {
        (index + 1) * self.block_size
    }

    /// Record the candidates one read produced, along with their
    /// coexistence tuple when the read carried more than one.
    pub fn add_candidates(&mut self, read_indels: &[CandidateIndel]) {
        for indel in read_indels {
            let index = self.block_index(indel.position);
            let bucket = self.buckets.entry(index).or_default();
            bucket
                .candidates
                .entry(indel.canonical_key())
                .and_modify(|entry| entry.support += 1)
                .or_insert_with(|| ObservedIndel {
                    indel: indel.clone(),
                    support: 1,
                });
        }

        let leading = read_indels.iter().min_by(|a, b| a.cmp_canonical(b));
        if let (Some(key), Some(leading)) = (group_key_for_read(read_indels), leading) {
            let index = self.block_index(leading.position);
            self.buckets.entry(index).or_default().groups.insert(key);
        }
    }

    /// Candidates from all blocks whose end lies at or before the
    /// watermark, plus newly cleared block regions.
    ///
    /// Returns `None` while the watermark is still inside the very first
    /// block. A `None` watermark flushes everything (end of chromosome).
    pub fn get_candidates_to_process(
        &mut self,
        max_position: Option<u32>,
    ) -> Option<CandidateBatch> {
        let (boundary, flush) = match max_position {
            Some(position) => {
                if position < self.block_size {
                    return None;
                }
                ((position / self.block_size) * self.block_size, false)
            }
            None => {
                let last = self
                    .buckets
                    .keys()
                    .next_back()
                    .map(|&index| self.block_end(index))
                    .unwrap_or(self.cleared_through);
                (last.max(self.cleared_through), true)
            }
        };

        let mut candidates: Vec<ObservedIndel> = self
            .buckets
            .iter()
            .filter(|(&index, _)| flush || self.block_end(index) <= boundary)
            .flat_map(|(_, bucket)| bucket.candidates.values().cloned())
            .collect();
        candidates.sort_by(|a, b| a.indel.cmp_canonical(&b.indel));

        let cleared_regions = if boundary > self.cleared_through {
            let regions = (self.cleared_through / self.block_size..boundary / self.block_size)
                .map(|index| ClearedRegion {
                    start: index * self.block_size,
                    end: self.block_end(index),
                })
                .collect();
            Some(regions)
        } else {
            None
        };

        self.cleared_through = boundary;
        trace!(boundary, flush, count = candidates.len(), "candidate batch");
        Some(CandidateBatch {
            candidates,
            cleared_regions,
            cleared_through: boundary,
            flush,
        })
    }

    /// Coexistence tuples visible at the watermark.
    pub fn get_candidate_groups(&self, max_position: Option<u32>) -> CoexistenceGroups {
        let mut groups = CoexistenceGroups::new();
        let boundary = match max_position {
            Some(position) => {
                if position < self.block_size {
                    return groups;
                }
                (position / self.block_size) * self.block_size
            }
            None => u32::MAX,
        };
        for (&index, bucket) in &self.buckets {
            if boundary == u32::MAX || self.block_end(index) <= boundary {
                groups.extend(&bucket.groups);
            }
        }
        groups
    }

    /// Retire state the orchestrator is finished with.
    ///
    /// Blocks two windows behind the cleared boundary are purged; the block
    /// immediately behind it is retained for cross-block combinations.
    pub fn done_processing(&mut self, batch: &CandidateBatch) {
        if batch.flush {
            self.buckets.clear();
            return;
        }
        let keep_from = (batch.cleared_through / self.block_size).saturating_sub(1);
        self.buckets.retain(|&index, _| index >= keep_from);
    }

    /// Number of live block buckets (for diagnostics).
    pub fn live_blocks(&self) -> usize {
        self.buckets.len()
    }
}
