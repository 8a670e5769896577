//! The ingestion job model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{OrchestrationError, Result};
use crate::pipeline::IngestProfile;

/// The eight pipeline stages, in execution order. Stage 4 is a summary
/// view over the chunking stage's code half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    ResetAndSchema,
    Commits,
    Chunking,
    CodeChunkSummary,
    SprintMapping,
    Derivation,
    Embeddings,
    Connectivity,
}

impl StageId {
    pub const ALL: [StageId; 8] = [
        StageId::ResetAndSchema,
        StageId::Commits,
        StageId::Chunking,
        StageId::CodeChunkSummary,
        StageId::SprintMapping,
        StageId::Derivation,
        StageId::Embeddings,
        StageId::Connectivity,
    ];

    /// 1-based stage index.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }

    pub fn description(&self) -> &'static str {
        match self {
            StageId::ResetAndSchema => "Reset and Schema",
            StageId::Commits => "Commit Ingestion",
            StageId::Chunking => "Repository Discovery & Chunking",
            StageId::CodeChunkSummary => "Code Chunk Summary",
            StageId::SprintMapping => "Sprint Mapping",
            StageId::Derivation => "Relationship Derivation",
            StageId::Embeddings => "Embeddings",
            StageId::Connectivity => "Enhanced Connectivity",
        }
    }

    /// Progress payload key (`stage_1` .. `stage_8`).
    pub fn progress_key(&self) -> String {
        format!("stage_{}", self.index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Stopping,
    Stopped,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Stopped | JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Stopping => "stopping",
            JobStatus::Stopped => "stopped",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Current-stage marker exposed through the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStage {
    pub index: usize,
    pub description: String,
    pub label: String,
}

/// One ingestion job. The registry serializes all transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub profile: IngestProfile,
    pub delta: bool,
    pub subpath: Option<String>,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub current_stage: Option<CurrentStage>,
    pub stages_completed: usize,
    pub total_stages: usize,
    pub percent_complete: Option<f64>,
    pub progress: BTreeMap<String, Value>,
    pub error: Option<String>,
    pub result: Option<Value>,
}

impl Job {
    pub fn new(profile: IngestProfile, subpath: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            delta: profile == IngestProfile::Delta,
            profile,
            subpath,
            status: JobStatus::Running,
            started_at: now,
            updated_at: now,
            finished_at: None,
            current_stage: None,
            stages_completed: 0,
            total_stages: StageId::ALL.len(),
            percent_complete: Some(0.0),
            progress: BTreeMap::new(),
            error: None,
            result: None,
        }
    }

    pub fn enter_stage(&mut self, stage: StageId) {
        let index = stage.index();
        self.current_stage = Some(CurrentStage {
            index,
            description: stage.description().to_string(),
            label: format!("Stage {}/{}: {}", index, self.total_stages, stage.description()),
        });
        self.updated_at = Utc::now();
    }

    /// Record a completed stage's payload verbatim.
    pub fn record_stage(&mut self, stage: StageId, payload: Value) {
        self.progress.insert(stage.progress_key(), payload);
        self.stages_completed = self.progress.len();
        self.percent_complete = Some(
            (self.stages_completed as f64 / self.total_stages as f64 * 1000.0).round() / 10.0,
        );
        self.updated_at = Utc::now();
    }

    pub fn request_stop(&mut self) -> Result<()> {
        if self.status != JobStatus::Running {
            return Err(OrchestrationError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "stopping".to_string(),
            });
        }
        self.status = JobStatus::Stopping;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn finalize(&mut self, status: JobStatus, result: Option<Value>, error: Option<String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(OrchestrationError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }
        let now = Utc::now();
        self.status = status;
        self.finished_at = Some(now);
        self.updated_at = now;
        self.current_stage = Some(CurrentStage {
            index: self.stages_completed,
            description: status.as_str().to_string(),
            label: {
                let mut label = status.as_str().to_string();
                if let Some(first) = label.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                label
            },
        });
        if let Some(result) = result {
            self.result = Some(result);
        }
        self.error = error;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_stage_indexes_and_keys() {
        assert_eq!(StageId::ResetAndSchema.index(), 1);
        assert_eq!(StageId::Connectivity.index(), 8);
        assert_eq!(StageId::Chunking.progress_key(), "stage_3");
    }

    #[test]
    fn test_record_stage_updates_percent() {
        let mut job = Job::new(IngestProfile::Full, None);
        job.record_stage(StageId::ResetAndSchema, json!({"ok": true}));
        assert_eq!(job.stages_completed, 1);
        assert_eq!(job.percent_complete, Some(12.5));

        job.record_stage(StageId::Commits, json!({"commits": 10}));
        assert_eq!(job.percent_complete, Some(25.0));
        assert_eq!(job.progress["stage_2"]["commits"], 10);
    }

    #[test]
    fn test_finalize_completed() {
        let mut job = Job::new(IngestProfile::Full, None);
        job.finalize(JobStatus::Completed, Some(json!({"score": 98.5})), None)
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.finished_at.is_some());
        assert_eq!(job.current_stage.as_ref().unwrap().label, "Completed");

        // Terminal jobs refuse further transitions.
        let err = job.finalize(JobStatus::Failed, None, None).unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_request_stop_only_while_running() {
        let mut job = Job::new(IngestProfile::Delta, None);
        assert!(job.delta);
        job.request_stop().unwrap();
        assert_eq!(job.status, JobStatus::Stopping);
        assert!(job.request_stop().is_err());

        job.finalize(JobStatus::Stopped, None, Some("stopped by user".into()))
            .unwrap();
        assert_eq!(job.status, JobStatus::Stopped);
    }

    #[test]
    fn test_job_serializes_with_snake_case_status() {
        let job = Job::new(IngestProfile::Quick, Some("src".into()));
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "running");
        assert_eq!(value["subpath"], "src");
        assert_eq!(value["total_stages"], 8);
    }
}
