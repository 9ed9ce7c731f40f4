//! Domain errors surfaced by the conversion orchestrator.
//!
//! Unit-of-work failures (one page, one lesson of a batch) never reach this
//! type; they are absorbed into asset status and batch results. What remains
//! is "the work could not even be attempted" or "this lesson's conversion
//! failed", mapped to 404/400/500 equivalents at the call boundary.

use thiserror::Error;
use uuid::Uuid;

use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn lesson_not_found(lesson_id: Uuid) -> Self {
        PipelineError::NotFound(format!("lesson {lesson_id}"))
    }

    pub fn missing_pdf(lesson_id: Uuid) -> Self {
        PipelineError::Validation(format!("lesson {lesson_id} has no PDF media"))
    }

    /// HTTP-equivalent status code
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::NotFound(_) => 404,
            PipelineError::Validation(_) => 400,
            PipelineError::Internal(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<RepositoryError> for PipelineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => PipelineError::NotFound(what),
            other => PipelineError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PipelineError::NotFound("x".into()).status_code(), 404);
        assert_eq!(PipelineError::Validation("x".into()).status_code(), 400);
        assert_eq!(PipelineError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err: PipelineError = RepositoryError::NotFound("lesson 1".into()).into();
        assert!(matches!(err, PipelineError::NotFound(_)));

        let err: PipelineError = RepositoryError::Backend("disk full".into()).into();
        assert!(matches!(err, PipelineError::Internal(msg) if msg.contains("disk full")));
    }
}
