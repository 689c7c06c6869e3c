//! Candidate indels: records, coexistence groups, ranking, target calling.

mod groups;
mod indel;
mod ranker;
mod targets;

pub use groups::{group_key_for_read, CoexistenceGroups, GroupKey, MAX_GROUP_SIZE};
pub use indel::{CandidateIndel, IndelKind, ObservedIndel};
pub use ranker::IndelRanker;
pub use targets::{AlleleCountSource, IndelTargetCaller};
