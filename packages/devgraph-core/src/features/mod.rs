pub mod chunking;
pub mod derivation;
pub mod embedding;
pub mod git_history;
pub mod imports;
pub mod linking;
pub mod sprints;
pub mod symbols;
