//! Error types for devgraph-storage.

use std::fmt;
use thiserror::Error;

/// Storage error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Driver/connection errors.
    Database,
    /// Serialization of rows or parameters.
    Serialization,
    /// Schema DDL failures.
    Schema,
    /// Read query failures.
    Query,
    /// Write transaction failures, including exhausted batch retries.
    Transaction,
    /// Configuration errors.
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Schema => "schema",
            ErrorKind::Query => "query",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    /// A batch write that failed after all retries, carrying the failing
    /// batch index for the stage report.
    pub fn batch_failed(batch_index: usize, source: neo4rs::Error) -> Self {
        Self::new(
            ErrorKind::Transaction,
            format!("batch {} failed after retries: {}", batch_index, source),
        )
        .with_source(source)
    }
}

impl From<neo4rs::Error> for StorageError {
    fn from(err: neo4rs::Error) -> Self {
        StorageError::database(format!("neo4j error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::transaction("ROLLBACK failed");
        assert_eq!(format!("{}", err), "[transaction] ROLLBACK failed");
        assert_eq!(err.kind, ErrorKind::Transaction);
    }

    #[test]
    fn test_batch_failed_keeps_index() {
        let err = StorageError::batch_failed(3, neo4rs::Error::ConnectionError);
        assert!(err.message.contains("batch 3"));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let err: StorageError = json_err.into();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[test]
    fn test_result_propagation() {
        fn inner() -> Result<()> {
            Err(StorageError::query("boom"))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        assert_eq!(outer().unwrap_err().kind, ErrorKind::Query);
    }
}
