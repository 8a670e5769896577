//! The eight pipeline stages. Each stage returns its payload verbatim for
//! the job's progress map and checks the stop flag between sub-steps.

pub mod chunking;
pub mod commits;
pub mod connectivity;
pub mod derivation;
pub mod embeddings;
pub mod reset_schema;
pub mod sprint_mapping;

/// Cap on per-stage failure records kept in the payload.
pub const MAX_FAILURES_RECORDED: usize = 20;
/// Slow-file entries kept per stage payload.
pub const SLOW_FILES_RECORDED: usize = 5;
