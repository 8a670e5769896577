//! Job registry and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{OrchestrationError, Result};
use crate::job::{Job, JobStatus, StageId};
use crate::pipeline::IngestProfile;

/// Cooperative stop flag checked at stage and batch boundaries. In-flight
/// writes finish; the stop takes effect at the next boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    stopped: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Raise `Stopped` when the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_stopped() {
            Err(OrchestrationError::Stopped)
        } else {
            Ok(())
        }
    }
}

/// Process-wide job registry. Serializes lifecycle transitions through the
/// `running` slot and enforces the one-running-job rule.
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<Uuid, Job>,
    running: RwLock<Option<(Uuid, CancellationToken)>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running job. Rejected with the current job's id when
    /// one is already running.
    pub fn start(
        &self,
        profile: IngestProfile,
        subpath: Option<String>,
    ) -> Result<(Uuid, CancellationToken)> {
        let mut running = self.running.write();
        if let Some((current, _)) = running.as_ref() {
            return Err(OrchestrationError::AlreadyRunning(current.to_string()));
        }

        let job = Job::new(profile, subpath);
        let job_id = job.job_id;
        let token = CancellationToken::new();
        self.jobs.insert(job_id, job);
        *running = Some((job_id, token.clone()));
        Ok((job_id, token))
    }

    pub fn get(&self, job_id: &Uuid) -> Option<Job> {
        self.jobs.get(job_id).map(|entry| entry.clone())
    }

    /// The most recently updated job, for `status()` without an id.
    pub fn latest(&self) -> Option<Job> {
        self.jobs
            .iter()
            .max_by_key(|entry| entry.updated_at)
            .map(|entry| entry.clone())
    }

    pub fn running_job_id(&self) -> Option<Uuid> {
        self.running.read().as_ref().map(|(id, _)| *id)
    }

    pub fn enter_stage(&self, job_id: &Uuid, stage: StageId) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            job.enter_stage(stage);
        }
    }

    pub fn record_stage(&self, job_id: &Uuid, stage: StageId, payload: Value) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            job.record_stage(stage, payload);
        }
    }

    /// Request a stop of the running job; returns its id.
    pub fn request_stop(&self) -> Result<Uuid> {
        let running = self.running.read();
        let Some((job_id, token)) = running.as_ref() else {
            return Err(OrchestrationError::JobNotFound("no running job".into()));
        };
        token.stop();
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            job.request_stop()?;
        }
        Ok(*job_id)
    }

    /// Finalize a job and release the running slot.
    pub fn finalize(
        &self,
        job_id: &Uuid,
        status: JobStatus,
        result: Option<Value>,
        error: Option<String>,
    ) -> Result<()> {
        {
            let mut job = self
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| OrchestrationError::JobNotFound(job_id.to_string()))?;
            job.finalize(status, result, error)?;
        }
        let mut running = self.running.write();
        if running.as_ref().map(|(id, _)| id) == Some(job_id) {
            *running = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_flight() {
        let registry = JobRegistry::new();
        let (job_id, _token) = registry.start(IngestProfile::Full, None).unwrap();

        let err = registry.start(IngestProfile::Full, None).unwrap_err();
        match err {
            OrchestrationError::AlreadyRunning(current) => {
                assert_eq!(current, job_id.to_string());
            }
            other => panic!("expected AlreadyRunning, got {:?}", other),
        }

        registry
            .finalize(&job_id, JobStatus::Completed, Some(json!({})), None)
            .unwrap();
        // Slot released.
        assert!(registry.start(IngestProfile::Full, None).is_ok());
    }

    #[test]
    fn test_stop_flag_reaches_token() {
        let registry = JobRegistry::new();
        let (job_id, token) = registry.start(IngestProfile::Full, None).unwrap();
        assert!(token.check().is_ok());

        let stopped_id = registry.request_stop().unwrap();
        assert_eq!(stopped_id, job_id);
        assert!(token.is_stopped());
        assert!(matches!(token.check(), Err(OrchestrationError::Stopped)));
        assert_eq!(registry.get(&job_id).unwrap().status, JobStatus::Stopping);
    }

    #[test]
    fn test_stage_recording_via_registry() {
        let registry = JobRegistry::new();
        let (job_id, _) = registry.start(IngestProfile::Quick, Some("src".into())).unwrap();

        registry.enter_stage(&job_id, StageId::Commits);
        let job = registry.get(&job_id).unwrap();
        assert_eq!(job.current_stage.as_ref().unwrap().index, 2);

        registry.record_stage(&job_id, StageId::Commits, json!({"commits_ingested": 5}));
        let job = registry.get(&job_id).unwrap();
        assert_eq!(job.progress["stage_2"]["commits_ingested"], 5);
    }

    #[test]
    fn test_latest_returns_most_recent() {
        let registry = JobRegistry::new();
        let (first, _) = registry.start(IngestProfile::Full, None).unwrap();
        registry
            .finalize(&first, JobStatus::Failed, None, Some("boom".into()))
            .unwrap();
        let (second, _) = registry.start(IngestProfile::Full, None).unwrap();

        assert_eq!(registry.latest().unwrap().job_id, second);
        assert_eq!(registry.running_job_id(), Some(second));
    }
}
