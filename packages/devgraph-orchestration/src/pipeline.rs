//! Pipeline options and shared stage context.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use devgraph_storage::GraphClient;

use crate::registry::CancellationToken;

/// Ingestion profile. `quick` caps document/code limits and never runs
/// delta; `delta` passes the watermark downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestProfile {
    Full,
    Delta,
    Quick,
}

impl IngestProfile {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full" => Some(IngestProfile::Full),
            "delta" => Some(IngestProfile::Delta),
            "quick" => Some(IngestProfile::Quick),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IngestProfile::Full => "full",
            IngestProfile::Delta => "delta",
            IngestProfile::Quick => "quick",
        }
    }
}

/// Options accepted by `start()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOptions {
    pub profile: IngestProfile,
    pub reset_graph: bool,
    pub commit_limit: usize,
    pub doc_limit: Option<usize>,
    pub code_limit: Option<usize>,
    pub derive_relationships: bool,
    pub include_embeddings: bool,
    pub max_workers: usize,
    pub subpath: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            profile: IngestProfile::Full,
            reset_graph: true,
            commit_limit: 1000,
            doc_limit: None,
            code_limit: None,
            derive_relationships: true,
            include_embeddings: false,
            max_workers: 4,
            subpath: None,
        }
    }
}

impl IngestOptions {
    /// Apply profile-driven adjustments: quick caps limits, delta is the
    /// only profile that carries a watermark.
    pub fn normalized(mut self) -> Self {
        self.max_workers = self.max_workers.clamp(1, 16);
        self.subpath = self
            .subpath
            .map(|s| s.replace('\\', "/").trim_matches('/').to_string())
            .filter(|s| !s.is_empty());
        if self.profile == IngestProfile::Quick {
            self.doc_limit = Some(self.doc_limit.unwrap_or(50).min(50));
            self.code_limit = Some(self.code_limit.unwrap_or(100).min(100));
        }
        self
    }

    pub fn is_delta(&self) -> bool {
        self.profile == IngestProfile::Delta
    }
}

/// Everything a stage needs: the graph client, the repository root, the
/// job's cancellation token, and the normalized options.
pub struct StageContext {
    pub client: Arc<GraphClient>,
    pub repo_path: PathBuf,
    pub token: CancellationToken,
    pub options: IngestOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_parse() {
        assert_eq!(IngestProfile::parse("full"), Some(IngestProfile::Full));
        assert_eq!(IngestProfile::parse(" Delta "), Some(IngestProfile::Delta));
        assert_eq!(IngestProfile::parse("quick"), Some(IngestProfile::Quick));
        assert_eq!(IngestProfile::parse("hyper"), None);
    }

    #[test]
    fn test_quick_profile_caps_limits() {
        let options = IngestOptions {
            profile: IngestProfile::Quick,
            doc_limit: None,
            code_limit: Some(500),
            ..Default::default()
        }
        .normalized();
        assert_eq!(options.doc_limit, Some(50));
        assert_eq!(options.code_limit, Some(100));
    }

    #[test]
    fn test_subpath_normalization() {
        let options = IngestOptions {
            subpath: Some("\\src\\ui\\".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(options.subpath.as_deref(), Some("src/ui"));

        let options = IngestOptions {
            subpath: Some("/".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(options.subpath, None);
    }

    #[test]
    fn test_worker_clamp() {
        let options = IngestOptions {
            max_workers: 99,
            ..Default::default()
        }
        .normalized();
        assert_eq!(options.max_workers, 16);
    }
}
