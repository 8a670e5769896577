//! Git history reading: commit enumeration, diffs, renames, and file
//! content at a revision. All temporal data in the graph is derived
//! strictly from git.

pub mod domain;
pub mod infrastructure;

pub use domain::{ChangeType, CommitDetail, CommitRecord, CommitSource, FileChange, FileEvent};
pub use infrastructure::{GitExecutor, GitHistoryReader};
