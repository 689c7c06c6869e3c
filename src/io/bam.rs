//! `rust-htslib` adapters implementing the extractor/writer/reference seams.

use std::path::Path;
use std::sync::Arc;

use rust_htslib::bam::record::{Aux, Cigar, CigarString};
use rust_htslib::bam::{self, Read as _};
use rust_htslib::faidx;

use crate::align::{CigarOp, CigarOpKind};
use crate::io::{AlignmentExtractor, IoError, RealignmentWriter, ReferenceProvider};
use crate::reads::{ReadFlags, ReadRecord};

fn op_from_htslib(op: &Cigar) -> CigarOp {
    match *op {
        Cigar::Match(len) => CigarOp::new(CigarOpKind::Match, len),
        Cigar::Ins(len) => CigarOp::new(CigarOpKind::Insertion, len),
        Cigar::Del(len) => CigarOp::new(CigarOpKind::Deletion, len),
        Cigar::SoftClip(len) => CigarOp::new(CigarOpKind::SoftClip, len),
        Cigar::HardClip(len) => CigarOp::new(CigarOpKind::HardClip, len),
        Cigar::RefSkip(len) => CigarOp::new(CigarOpKind::RefSkip, len),
        Cigar::Equal(len) => CigarOp::new(CigarOpKind::SeqMatch, len),
        Cigar::Diff(len) => CigarOp::new(CigarOpKind::SeqMismatch, len),
        Cigar::Pad(_) => CigarOp::new(CigarOpKind::HardClip, 0),
    }
}

fn op_to_htslib(op: &CigarOp) -> Cigar {
    match op.kind {
        CigarOpKind::Match => Cigar::Match(op.len),
        CigarOpKind::Insertion => Cigar::Ins(op.len),
        CigarOpKind::Deletion => Cigar::Del(op.len),
        CigarOpKind::SoftClip => Cigar::SoftClip(op.len),
        CigarOpKind::HardClip => Cigar::HardClip(op.len),
        CigarOpKind::RefSkip => Cigar::RefSkip(op.len),
        CigarOpKind::SeqMatch => Cigar::Equal(op.len),
        CigarOpKind::SeqMismatch => Cigar::Diff(op.len),
    }
}

fn nm_value(record: &bam::Record) -> Option<u32> {
    match record.aux(b"NM").ok()? {
        Aux::U8(v) => Some(v as u32),
        Aux::U16(v) => Some(v as u32),
        Aux::U32(v) => Some(v),
        Aux::I8(v) => u32::try_from(v).ok(),
        Aux::I16(v) => u32::try_from(v).ok(),
        Aux::I32(v) => u32::try_from(v).ok(),
        _ => None,
    }
}

fn convert_record(record: &bam::Record, header: &bam::HeaderView) -> ReadRecord {
    let chrom: Arc<str> = if record.tid() >= 0 {
        String::from_utf8_lossy(header.tid2name(record.tid() as u32))
            .into_owned()
            .into()
    } else {
        Arc::from("*")
    };
    ReadRecord {
        name: String::from_utf8_lossy(record.qname()).into_owned(),
        chrom,
        pos: record.pos().max(0) as u32,
        mapq: record.mapq(),
        cigar: record
            .cigar()
            .iter()
            .map(op_from_htslib)
            .filter(|op| op.len > 0)
            .collect(),
        sequence: record.seq().as_bytes(),
        qualities: record.qual().to_vec(),
        flags: ReadFlags {
            is_mapped: !record.is_unmapped(),
            is_secondary: record.is_secondary(),
            is_supplementary: record.is_supplementary(),
            is_duplicate: record.is_duplicate(),
            is_proper_pair: record.is_proper_pair(),
            has_supplementary_tag: record.aux(b"SA").is_ok(),
        },
        edit_distance: nm_value(record),
    }
}

/// Indexed BAM cursor.
#[derive(Debug)]
pub struct BamExtractor {
    reader: bam::IndexedReader,
}

impl BamExtractor {
    /// Open an indexed BAM file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        Ok(Self {
            reader: bam::IndexedReader::from_path(path)?,
        })
    }
}

impl AlignmentExtractor for BamExtractor {
    fn next_alignment(&mut self) -> Result<Option<ReadRecord>, IoError> {
        let mut record = bam::Record::new();
        match self.reader.read(&mut record) {
            Some(Ok(())) => Ok(Some(convert_record(&record, self.reader.header()))),
            Some(Err(error)) => Err(error.into()),
            None => Ok(None),
        }
    }

    fn jump(&mut self, chrom: &str, position: u32) -> Result<(), IoError> {
        let tid = self
            .reader
            .header()
            .tid(chrom.as_bytes())
            .ok_or_else(|| IoError::UnknownChromosome(chrom.to_string()))?;
        let end = self
            .reader
            .header()
            .target_len(tid)
            .unwrap_or(u64::MAX >> 2) as i64;
        self.reader.fetch((tid, position as i64, end))?;
        Ok(())
    }
}

/// BAM writer rebuilding records from [`ReadRecord`]s.
///
/// Records are written in arrival order; with multiple chromosome workers,
/// within-chromosome order is preserved while chromosome batches interleave
/// in completion order (sort afterwards if coordinate order is required).
#[derive(Debug)]
pub struct BamRealignmentWriter {
    writer: bam::Writer,
    header: bam::HeaderView,
    written: u64,
}

// SAFETY: the `header`/`writer` fields wrap htslib raw pointers (`*mut
// sam_hdr_t` / `*mut htsFile`). rust-htslib itself marks `bam::Writer: Send`
// the same way; the pipeline only ever touches this writer behind a `Mutex`,
// so access is serialized and no pointer is shared concurrently.
unsafe impl Send for BamRealignmentWriter {}

impl BamRealignmentWriter {
    /// Create a writer targeting `path`, copying the header of the
    /// template BAM.
    pub fn from_paths<P: AsRef<Path>, T: AsRef<Path>>(
        path: P,
        template_bam: T,
    ) -> Result<Self, IoError> {
        let template = bam::Reader::from_path(template_bam)?;
        let header = bam::Header::from_template(template.header());
        let writer = bam::Writer::from_path(path, &header, bam::Format::Bam)?;
        Ok(Self {
            writer,
            header: bam::HeaderView::from_header(&header),
            written: 0,
        })
    }

    fn rebuild(&self, read: &ReadRecord) -> Result<bam::Record, IoError> {
        let mut record = bam::Record::new();
        let ops: Vec<Cigar> = read.cigar.iter().map(op_to_htslib).collect();
        record.set(
            read.name.as_bytes(),
            Some(&CigarString(ops)),
            &read.sequence,
            &read.qualities,
        );
        let tid = self
            .header
            .tid(read.chrom.as_bytes())
            .ok_or_else(|| IoError::UnknownChromosome(read.chrom.to_string()))?;
        record.set_tid(tid as i32);
        record.set_pos(read.pos as i64);
        record.set_mapq(read.mapq);

        let mut flags: u16 = 0;
        if !read.flags.is_mapped {
            flags |= 0x4;
        }
        if read.flags.is_proper_pair {
            flags |= 0x1 | 0x2;
        }
        if read.flags.is_secondary {
            flags |= 0x100;
        }
        if read.flags.is_duplicate {
            flags |= 0x400;
        }
        if read.flags.is_supplementary {
            flags |= 0x800;
        }
        record.set_flags(flags);

        if let Some(nm) = read.edit_distance {
            record.push_aux(b"NM", Aux::I32(nm as i32))?;
        }
        Ok(record)
    }
}

impl RealignmentWriter for BamRealignmentWriter {
    fn initialize(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    fn write_read(&mut self, read: &ReadRecord, _was_remapped: bool) -> Result<(), IoError> {
        let record = self.rebuild(read)?;
        self.writer.write(&record)?;
        self.written += 1;
        Ok(())
    }

    fn flush_chromosome(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), IoError> {
        tracing::info!(records = self.written, "BAM output complete");
        Ok(())
    }
}

/// Indexed FASTA reference provider.
#[derive(Debug)]
pub struct FaidxReference {
    reader: faidx::Reader,
}

impl FaidxReference {
    /// Open a faidx-indexed FASTA file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        Ok(Self {
            reader: faidx::Reader::from_path(path)?,
        })
    }
}

impl ReferenceProvider for FaidxReference {
    fn chromosome(&self, name: &str) -> Result<Arc<[u8]>, IoError> {
        let len = self.reader.fetch_seq_len(name) as usize;
        if len == 0 {
            return Err(IoError::UnknownChromosome(name.to_string()));
        }
        let bases = self.reader.fetch_seq(name, 0, len - 1)?;
        let upper: Vec<u8> = bases.iter().map(|b| b.to_ascii_uppercase()).collect();
        Ok(Arc::from(upper))
    }

    fn chromosome_names(&self) -> Vec<Arc<str>> {
        (0..self.reader.n_seqs())
            .filter_map(|i| self.reader.seq_name(i as i32).ok())
            .map(Arc::from)
            .collect()
    }
}
