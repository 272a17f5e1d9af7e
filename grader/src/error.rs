//! Grading Error Types
//!
//! [`GradingError`] separates failures by what the caller can do about them:
//! transport failures are worth retrying, validation and data-integrity failures
//! are not, and a rejected score is recorded on the affected submission only.

use sea_orm::DbErr;

/// Result alias used across the grading pipeline.
pub type GradingResult<T> = Result<T, GradingError>;

#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    /// A remote call failed: the document to upload was unreadable, the service was
    /// unreachable or timed out, or it answered with an error or an undecodable body.
    #[error("{service} service failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// The scoring service answered but did not produce a usable score.
    #[error("correctness score rejected: {0}")]
    RejectedScore(String),

    /// Bad input or an entity in the wrong state for the requested operation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced row does not exist.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl GradingError {
    pub fn transport(service: &'static str, message: impl Into<String>) -> Self {
        GradingError::Transport {
            service,
            message: message.into(),
        }
    }

    /// Whether re-running the whole task could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GradingError::Transport { .. } | GradingError::Database(_))
    }
}
