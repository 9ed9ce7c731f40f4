//! Request parsing helpers

use uuid::Uuid;

use crate::api::error::ApiError;

/// Parses a lesson identifier from a path segment
pub fn parse_lesson_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::InvalidRequest(format!("invalid lesson id: {raw}")))
}

/// Resolves the batch limit of a pending run
pub fn resolve_limit(requested: Option<usize>, default: usize) -> Result<usize, ApiError> {
    match requested {
        None => Ok(default),
        Some(0) => Err(ApiError::InvalidRequest("limit must be positive".into())),
        Some(limit) => Ok(limit),
    }
}
