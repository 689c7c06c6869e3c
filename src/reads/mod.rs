//! Read records and candidate discovery from their alignments.

mod finder;
mod record;

pub use finder::{CigarIndelFinder, IndelFinder};
pub use record::{ReadFlags, ReadRecord};
