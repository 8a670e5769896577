//! The ingestion orchestrator: runs the eight stages serially, records
//! each stage's payload, and finalizes the job atomically.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use devgraph_storage::GraphClient;

use crate::error::{OrchestrationError, Result};
use crate::job::{Job, JobStatus, StageId};
use crate::pipeline::{IngestOptions, IngestProfile, StageContext};
use crate::registry::JobRegistry;
use crate::report;
use crate::stages;

pub struct IngestionOrchestrator {
    client: Arc<GraphClient>,
    registry: Arc<JobRegistry>,
    repo_path: PathBuf,
}

impl IngestionOrchestrator {
    pub fn new(client: Arc<GraphClient>, registry: Arc<JobRegistry>, repo_path: PathBuf) -> Self {
        Self {
            client,
            registry,
            repo_path,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Start a job and drive it to completion. Returns the finalized job.
    pub async fn run_job(&self, options: IngestOptions) -> Result<Job> {
        let options = options.normalized();
        let (job_id, token) = self
            .registry
            .start(options.profile, options.subpath.clone())?;
        info!(
            "job {} started (profile {}, subpath {:?})",
            job_id,
            options.profile.as_str(),
            options.subpath
        );

        let ctx = StageContext {
            client: self.client.clone(),
            repo_path: self.repo_path.clone(),
            token,
            options,
        };

        let started = Instant::now();
        let outcome = self.run_stages(&job_id, &ctx, started).await;

        match outcome {
            Ok(final_report) => {
                self.registry
                    .finalize(&job_id, JobStatus::Completed, Some(final_report), None)?;
            }
            Err(e) if e.is_cancellation() => {
                info!("job {} stopped at a stage boundary", job_id);
                let partial = self
                    .registry
                    .get(&job_id)
                    .map(|job| json!({ "stages_completed": job.stages_completed,
                                        "progress": job.progress }));
                self.registry
                    .finalize(&job_id, JobStatus::Stopped, partial, Some(e.to_string()))?;
            }
            Err(e) => {
                error!("job {} failed: {}", job_id, e);
                self.registry
                    .finalize(&job_id, JobStatus::Failed, None, Some(e.to_string()))?;
            }
        }

        self.registry
            .get(&job_id)
            .ok_or(OrchestrationError::JobNotFound(job_id.to_string()))
    }

    async fn run_stages(
        &self,
        job_id: &Uuid,
        ctx: &StageContext,
        started: Instant,
    ) -> Result<serde_json::Value> {
        let options = &ctx.options;

        // Stage 1: reset + schema. Delta runs never reset.
        self.enter(job_id, StageId::ResetAndSchema);
        let reset = options.reset_graph && options.profile == IngestProfile::Full;
        let payload = stages::reset_schema::run(ctx, reset).await?;
        self.record(job_id, StageId::ResetAndSchema, payload);

        // Stage 2: commits.
        self.enter(job_id, StageId::Commits);
        let commits = stages::commits::run(ctx).await?;
        self.record(job_id, StageId::Commits, commits.payload.clone());

        // Stage 3: chunking.
        self.enter(job_id, StageId::Chunking);
        let chunking = stages::chunking::run(ctx, commits.changed_files.as_ref()).await?;
        self.record(job_id, StageId::Chunking, chunking.payload.clone());

        // Stage 4: code chunk summary (view over stage 3, no work).
        self.enter(job_id, StageId::CodeChunkSummary);
        let summary = stages::chunking::code_chunk_summary(&chunking.payload);
        self.record(job_id, StageId::CodeChunkSummary, summary);

        // Stage 5: sprint mapping.
        self.enter(job_id, StageId::SprintMapping);
        let payload = stages::sprint_mapping::run(ctx).await?;
        self.record(job_id, StageId::SprintMapping, payload);

        // Stage 6: derivation (skippable).
        self.enter(job_id, StageId::Derivation);
        let payload = if options.derive_relationships {
            stages::derivation::run(ctx, commits.since_timestamp.as_deref()).await?
        } else {
            json!({ "skipped": true, "reason": "derive_relationships disabled" })
        };
        self.record(job_id, StageId::Derivation, payload);

        // Stage 7: embeddings (optional).
        self.enter(job_id, StageId::Embeddings);
        let payload = stages::embeddings::run(ctx, options.include_embeddings).await?;
        self.record(job_id, StageId::Embeddings, payload);

        // Stage 8: enhanced connectivity.
        self.enter(job_id, StageId::Connectivity);
        let payload = stages::connectivity::run(ctx, chunking.docs_processed > 0).await?;
        self.record(job_id, StageId::Connectivity, payload);

        // Guards are fatal; best-effort stages above are not.
        report::assert_ingest_guards(&ctx.client).await?;

        let stages_completed = self
            .registry
            .get(job_id)
            .map(|job| job.stages_completed)
            .unwrap_or(0);
        report::generate_final_report(&ctx.client, started.elapsed().as_secs_f64(), stages_completed)
            .await
    }

    fn enter(&self, job_id: &Uuid, stage: StageId) {
        info!("stage {}/8: {}", stage.index(), stage.description());
        self.registry.enter_stage(job_id, stage);
    }

    fn record(&self, job_id: &Uuid, stage: StageId, payload: serde_json::Value) {
        self.registry.record_stage(job_id, stage, payload);
    }
}
