//! Devgraph core: domain model and extraction for the developer knowledge
//! graph.
//!
//! Feature-first layout:
//! - `shared/`   : common models (nodes, edges, spans) and small utilities
//! - `features/` : vertical slices (git history, chunking, symbols, imports,
//!   linking, sprints, derivation evidence, embeddings)
//!
//! Everything in this crate is pure with respect to the graph store: the
//! features produce typed records (commits, chunks, symbols, mentions) and
//! the storage crate owns how they are persisted.

pub mod config;
pub mod error;
pub mod features;
pub mod shared;

pub use error::{CoreError, Result};
