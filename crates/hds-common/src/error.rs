//! Error types for HDS

use thiserror::Error;

/// Result type alias for HDS operations
pub type Result<T> = std::result::Result<T, HdsError>;

/// Main error type for HDS
#[derive(Error, Debug)]
pub enum HdsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid date '{0}': expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HdsError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = HdsError::InvalidDate("06/01/2024".to_string());
        assert!(err.to_string().contains("06/01/2024"));

        let err = HdsError::config("worker_count must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: worker_count must be at least 1"
        );
    }
}
