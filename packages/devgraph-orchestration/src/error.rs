use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error(transparent)]
    Core(#[from] devgraph_core::CoreError),

    #[error(transparent)]
    Storage(#[from] devgraph_storage::StorageError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Ingestion already in progress: {0}")]
    AlreadyRunning(String),

    #[error("Ingestion stopped by user request")]
    Stopped,

    #[error("Ingest guard violation: {0}")]
    GuardViolation(String),

    #[error("Stage {stage} failed: {message}")]
    StageFailed { stage: &'static str, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl OrchestrationError {
    /// Cancellation is not an error condition; the job finalizes as
    /// `stopped` instead of `failed`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OrchestrationError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_flag() {
        assert!(OrchestrationError::Stopped.is_cancellation());
        assert!(!OrchestrationError::Config("x".into()).is_cancellation());
    }

    #[test]
    fn test_storage_conversion() {
        fn inner() -> Result<()> {
            Err(devgraph_storage::StorageError::query("boom"))?;
            Ok(())
        }
        assert!(matches!(inner(), Err(OrchestrationError::Storage(_))));
    }
}
