//! Job lifecycle tests that need no graph store: registry single-flight,
//! cooperative cancellation, stage bookkeeping, and terminal transitions.

use serde_json::json;

use devgraph_orchestration::{
    CancellationToken, IngestProfile, Job, JobRegistry, JobStatus, OrchestrationError, StageId,
};

#[test]
fn full_lifecycle_completed() {
    let registry = JobRegistry::new();
    let (job_id, token) = registry.start(IngestProfile::Full, None).unwrap();

    for stage in StageId::ALL {
        assert!(token.check().is_ok());
        registry.enter_stage(&job_id, stage);
        registry.record_stage(&job_id, stage, json!({ "duration": 0.1 }));
    }

    let job = registry.get(&job_id).unwrap();
    assert_eq!(job.stages_completed, 8);
    assert_eq!(job.percent_complete, Some(100.0));
    assert_eq!(job.status, JobStatus::Running);

    registry
        .finalize(
            &job_id,
            JobStatus::Completed,
            Some(json!({ "final_statistics": { "quality_score": 97.5 } })),
            None,
        )
        .unwrap();

    let job = registry.get(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.finished_at.is_some());
    assert_eq!(
        job.result.unwrap()["final_statistics"]["quality_score"],
        97.5
    );
    assert!(registry.running_job_id().is_none());
}

#[test]
fn concurrent_start_rejected_with_running_id() {
    let registry = JobRegistry::new();
    let (job_id, _token) = registry.start(IngestProfile::Full, None).unwrap();

    match registry.start(IngestProfile::Quick, None) {
        Err(OrchestrationError::AlreadyRunning(current)) => {
            assert_eq!(current, job_id.to_string());
        }
        other => panic!("expected AlreadyRunning, got {:?}", other.map(|(id, _)| id)),
    }
}

#[test]
fn stop_finalizes_as_stopped_with_partial_progress() {
    let registry = JobRegistry::new();
    let (job_id, token) = registry.start(IngestProfile::Full, None).unwrap();

    registry.record_stage(&job_id, StageId::ResetAndSchema, json!({ "ok": true }));
    registry.record_stage(&job_id, StageId::Commits, json!({ "commits_ingested": 42 }));

    registry.request_stop().unwrap();
    assert!(matches!(token.check(), Err(OrchestrationError::Stopped)));
    assert_eq!(registry.get(&job_id).unwrap().status, JobStatus::Stopping);

    // The orchestrator observes the flag at the next boundary and
    // finalizes with the partial result attached.
    let partial = registry.get(&job_id).map(|job| json!({ "progress": job.progress }));
    registry
        .finalize(&job_id, JobStatus::Stopped, partial, Some("stopped".into()))
        .unwrap();

    let job = registry.get(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Stopped);
    assert_eq!(job.result.unwrap()["progress"]["stage_2"]["commits_ingested"], 42);
    // The slot is free again.
    assert!(registry.start(IngestProfile::Full, None).is_ok());
}

#[test]
fn token_is_shared_between_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_stopped());
    token.stop();
    assert!(clone.is_stopped());
}

#[test]
fn stage_progress_keys_are_stable() {
    let mut job = Job::new(IngestProfile::Full, None);
    job.record_stage(StageId::SprintMapping, json!({ "sprints_mapped": 3 }));
    assert!(job.progress.contains_key("stage_5"));
    assert_eq!(job.total_stages, 8);
}

#[test]
fn failed_jobs_keep_error_string() {
    let registry = JobRegistry::new();
    let (job_id, _) = registry.start(IngestProfile::Delta, Some("src".into())).unwrap();
    registry
        .finalize(
            &job_id,
            JobStatus::Failed,
            None,
            Some("[transaction] batch 3 failed after retries".into()),
        )
        .unwrap();

    let job = registry.get(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("batch 3"));
    assert_eq!(job.subpath.as_deref(), Some("src"));
    assert!(job.delta);
}
