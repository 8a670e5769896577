//! Devgraph orchestration: the ingestion job model and the eight-stage
//! pipeline that drives extraction and storage.
//!
//! One job runs at a time. Every stage checks the cooperative stop flag
//! between sub-steps and records its payload verbatim under
//! `progress.stage_<i>`.

pub mod error;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod stages;

pub use error::{OrchestrationError, Result};
pub use job::{Job, JobStatus, StageId};
pub use orchestrator::IngestionOrchestrator;
pub use pipeline::{IngestOptions, IngestProfile};
pub use registry::{CancellationToken, JobRegistry};
