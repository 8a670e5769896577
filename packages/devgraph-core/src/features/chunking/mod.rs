//! Chunking: Markdown sections by heading, code by function/class spans
//! with a sliding-window fallback. Chunks are the unit of linking and
//! embedding.

pub mod domain;
pub mod infrastructure;

pub use domain::{ChunkKind, ChunkRecord};
pub use infrastructure::{CodeChunker, MarkdownChunker};
