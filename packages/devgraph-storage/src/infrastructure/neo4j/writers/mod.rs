//! Batched writers, one per ingestion concern. Writers turn core records
//! into `UNWIND $rows` payloads; nothing outside this module builds write
//! Cypher.

mod chunk_writer;
mod cleanup;
mod commit_writer;
mod derivation_writer;
mod import_writer;
mod mention_writer;
mod sprint_writer;
mod symbol_writer;

pub use chunk_writer::ChunkWriter;
pub use cleanup::{CleanupPass, CleanupStats};
pub use commit_writer::{CommitWriter, CommitWriteStats};
pub use derivation_writer::{DerivationStats, RelationshipDeriver};
pub use import_writer::{ImportWriteStats, ImportWriter};
pub use mention_writer::MentionWriter;
pub use sprint_writer::{SprintMapStats, SprintWriter};
pub use symbol_writer::SymbolWriter;
