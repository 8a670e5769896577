//! Devgraph storage: the Neo4j adapter and everything that speaks Cypher.
//!
//! - `infrastructure/` : connection management, schema DDL, batched writers
//! - `query/`          : the windowed subgraph engine and commit timeline
//! - `validator`       : read-only integrity checks and repairs
//!
//! The storage crate is the sole writer to the graph; extraction crates
//! hand it typed records and never see a session.

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod query;
pub mod validator;

pub use error::{ErrorKind, Result, StorageError};
pub use infrastructure::neo4j::{GraphClient, GraphConfig, SchemaManager, SchemaReport};
pub use query::SubgraphEngine;
pub use validator::DataValidator;
