//! Evidence model for derived relationships: evidence kinds, confidence
//! combination, and commit-message patterns.

pub mod domain;
pub mod infrastructure;

pub use domain::{base_confidence, combine_confidence, merge_sources, EvidenceKind};
pub use infrastructure::{
    deprecation_pairs, evolution_pairs, extract_requirement_ids, requirement_pairs_in_order,
    test_colocation_target,
};
