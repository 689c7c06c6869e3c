//! In-memory extractor/writer/reference used by tests and benches.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::io::{AlignmentExtractor, IoError, RealignmentWriter, ReferenceProvider};
use crate::reads::ReadRecord;

/// Extractor over an owned, coordinate-sorted read list.
#[derive(Debug, Clone, Default)]
pub struct VecExtractor {
    reads: VecDeque<ReadRecord>,
}

impl VecExtractor {
    /// Wrap a sorted read list.
    pub fn new(reads: Vec<ReadRecord>) -> Self {
        Self {
            reads: reads.into(),
        }
    }
}

impl AlignmentExtractor for VecExtractor {
    fn next_alignment(&mut self) -> Result<Option<ReadRecord>, IoError> {
        Ok(self.reads.pop_front())
    }

    fn jump(&mut self, chrom: &str, position: u32) -> Result<(), IoError> {
        while let Some(front) = self.reads.front() {
            if front.chrom.as_ref() == chrom && front.pos >= position {
                break;
            }
            self.reads.pop_front();
        }
        Ok(())
    }
}

/// Writer that records everything handed to it.
#[derive(Debug, Default)]
pub struct CollectingWriter {
    /// Written reads with their remap tags, in arrival order.
    pub written: Vec<(ReadRecord, bool)>,
    /// Chromosome-boundary flush count.
    pub flushes: usize,
    /// Whether `finish` ran.
    pub finished: bool,
}

impl CollectingWriter {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads tagged as remapped.
    pub fn remapped(&self) -> impl Iterator<Item = &ReadRecord> {
        self.written
            .iter()
            .filter(|(_, remapped)| *remapped)
            .map(|(read, _)| read)
    }
}

impl RealignmentWriter for CollectingWriter {
    fn initialize(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    fn write_read(&mut self, read: &ReadRecord, was_remapped: bool) -> Result<(), IoError> {
        self.written.push((read.clone(), was_remapped));
        Ok(())
    }

    fn flush_chromosome(&mut self) -> Result<(), IoError> {
        self.flushes += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), IoError> {
        self.finished = true;
        Ok(())
    }
}

/// Reference provider over in-memory chromosome strings.
#[derive(Debug, Clone, Default)]
pub struct SliceReference {
    chromosomes: Vec<(Arc<str>, Arc<[u8]>)>,
    index: HashMap<Arc<str>, usize>,
}

impl SliceReference {
    /// Empty reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chromosome sequence.
    pub fn with_chromosome(mut self, name: impl Into<Arc<str>>, bases: &[u8]) -> Self {
        let name = name.into();
        self.index.insert(name.clone(), self.chromosomes.len());
        self.chromosomes.push((name, Arc::from(bases.to_vec())));
        self
    }
}

impl ReferenceProvider for SliceReference {
    fn chromosome(&self, name: &str) -> Result<Arc<[u8]>, IoError> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.chromosomes[i].1))
            .ok_or_else(|| IoError::UnknownChromosome(name.to_string()))
    }

    fn chromosome_names(&self) -> Vec<Arc<str>> {
        self.chromosomes
            .iter()
            .map(|(name, _)| Arc::clone(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::parse_cigar;

    fn read(chrom: &str, pos: u32) -> ReadRecord {
        ReadRecord::new(
            format!("r{pos}"),
            chrom,
            pos,
            30,
            parse_cigar("4M").expect("valid cigar"),
            b"ACGT".to_vec(),
            vec![30; 4],
        )
    }

    #[test]
    fn jump_skips_ahead() {
        let mut extractor =
            VecExtractor::new(vec![read("chr1", 10), read("chr1", 50), read("chr1", 90)]);
        extractor.jump("chr1", 40).expect("jump is infallible here");
        let next = extractor
            .next_alignment()
            .expect("no I/O involved")
            .expect("reads remain");
        assert_eq!(next.pos, 50);
    }

    #[test]
    fn missing_chromosome_is_reported() {
        let reference = SliceReference::new().with_chromosome("chr1", b"ACGT");
        assert!(matches!(
            reference.chromosome("chr9"),
            Err(IoError::UnknownChromosome(_))
        ));
    }
}
