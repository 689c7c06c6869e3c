//! Collaborator seams around the realignment core.
//!
//! The core is driven through three traits: a sequential alignment
//! extractor, an order-preserving writer, and a reference provider. Real
//! pipelines use the `rust-htslib` adapters in [`bam`]; tests and benches
//! use the in-memory pair in [`memory`].

pub mod bam;
mod memory;

use std::sync::Arc;

use thiserror::Error;

use crate::reads::ReadRecord;

pub use memory::{CollectingWriter, SliceReference, VecExtractor};

/// Errors from the I/O adapters.
#[derive(Debug, Error)]
pub enum IoError {
    /// htslib-level failure.
    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
    /// Chromosome absent from the reference or header.
    #[error("unknown chromosome {0:?}")]
    UnknownChromosome(String),
    /// A record that cannot be represented as a [`ReadRecord`].
    #[error("unrepresentable record {name:?}: {reason}")]
    BadRecord {
        /// Query name of the offending record.
        name: String,
        /// Why it cannot be converted.
        reason: String,
    },
    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Shared writer lock poisoned by a panicking worker.
    #[error("writer lock poisoned")]
    WriterPoisoned,
}

/// Sequential cursor over a coordinate-sorted read stream.
pub trait AlignmentExtractor {
    /// Next read, or `None` at end of stream.
    fn next_alignment(&mut self) -> Result<Option<ReadRecord>, IoError>;

    /// Seek to the first read at or after `position` on `chrom`.
    fn jump(&mut self, chrom: &str, position: u32) -> Result<(), IoError>;
}

/// Sink for realigned (and untouched) reads.
///
/// Implementations must preserve the relative order reads were handed in
/// within one chromosome.
pub trait RealignmentWriter {
    /// Called once before any read is written.
    fn initialize(&mut self) -> Result<(), IoError>;

    /// Hand over one read, tagged with whether it was remapped.
    fn write_read(&mut self, read: &ReadRecord, was_remapped: bool) -> Result<(), IoError>;

    /// Called once per chromosome boundary.
    fn flush_chromosome(&mut self) -> Result<(), IoError>;

    /// Called once at the very end of the run.
    fn finish(&mut self) -> Result<(), IoError>;
}

/// Reference sequence access, indexable by 0-based offset.
pub trait ReferenceProvider {
    /// Full base string for a chromosome.
    fn chromosome(&self, name: &str) -> Result<Arc<[u8]>, IoError>;

    /// Chromosome names in header order.
    fn chromosome_names(&self) -> Vec<Arc<str>>;
}
