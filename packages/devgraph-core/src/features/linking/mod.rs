//! Document↔code linking: scan chunk text for file paths, commit hashes,
//! and other inline mentions, with confidence per resolution method.

pub mod domain;
pub mod infrastructure;

pub use domain::{CommitMention, FileMention};
pub use infrastructure::{
    build_basename_index, build_commit_prefix_index, find_commit_mentions, find_file_mentions,
    hash_commit_mentions, hash_file_mentions, FileIndex,
};
