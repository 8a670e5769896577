use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("Git command failed: {0}")]
    GitCommand(String),

    #[error("Git command timed out after {0}s")]
    GitTimeout(u64),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::NotARepository("/tmp/nope".to_string());
        assert!(err.to_string().contains("/tmp/nope"));

        let err = CoreError::parse("bad header line");
        assert!(matches!(err, CoreError::Parse(_)));
    }

    #[test]
    fn test_io_conversion() {
        fn inner() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(inner(), Err(CoreError::Io(_))));
    }
}
