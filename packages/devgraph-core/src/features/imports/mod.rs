//! Import graph extraction: resolve import statements to repository files
//! and accumulate `(File)-[:IMPORTS]->(File)` edge payloads.

pub mod domain;
pub mod infrastructure;

pub use domain::{ImportEdge, ImportHit};
pub use infrastructure::{
    build_python_module_index, collect_python_hits, collect_ts_hits, python_module_name,
    python_package_parts, resolve_python_from, resolve_python_module, resolve_ts_target,
};
