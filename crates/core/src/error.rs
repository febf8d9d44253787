//! Error types for the Campus Assistant.
//!
//! This module defines a unified error enum that covers all error categories
//! in the workspace: configuration, I/O, providers (generation and
//! translation), knowledge store, sessions and prompts.

use thiserror::Error;

/// Unified error type for the Campus Assistant.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Provider failures are split into transient kinds (`Timeout`,
/// `RateLimited`, `Unavailable`) that the retry policy may retry, and
/// permanent ones (`Llm`, `Translation`).
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-retryable generation provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// A provider call exceeded its timeout
    #[error("Provider timeout: {0}")]
    Timeout(String),

    /// A provider rejected the call because of rate limiting or quota
    #[error("Provider rate limited: {0}")]
    RateLimited(String),

    /// Network failure or 5xx-equivalent provider response
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Non-retryable translation provider errors
    #[error("Translation error: {0}")]
    Translation(String),

    /// Knowledge base content errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// The knowledge store or its index cannot serve requests
    #[error("Knowledge store unavailable: {0}")]
    KnowledgeStoreUnavailable(String),

    /// Session persistence errors
    #[error("Session error: {0}")]
    Session(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Rejected caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether a retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Timeout(_) | AppError::RateLimited(_) | AppError::Unavailable(_)
        )
    }

    /// Whether the provider reported rate limiting or quota exhaustion.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RateLimited(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::Timeout("t".into()).is_transient());
        assert!(AppError::RateLimited("r".into()).is_transient());
        assert!(AppError::Unavailable("u".into()).is_transient());
        assert!(!AppError::Llm("bad request".into()).is_transient());
        assert!(!AppError::KnowledgeStoreUnavailable("down".into()).is_transient());
    }

    #[test]
    fn test_rate_limited_classification() {
        assert!(AppError::RateLimited("quota".into()).is_rate_limited());
        assert!(!AppError::Timeout("slow".into()).is_rate_limited());
    }

    #[test]
    fn test_serde_errors_convert() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
