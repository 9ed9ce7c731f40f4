//! Request and response bodies of the operator API.
//!
//! Domain results (`ProcessResult`, `BatchResult`, reports, pages) are
//! serialized as-is from [`crate::models`]; this module only holds the
//! envelopes that exist for HTTP.

use serde::{Deserialize, Serialize};

use crate::repository::StoreStats;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreStats>,
}

/// Query of `POST /pdf/pending`; falls back to the configured limit
#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    pub limit: Option<usize>,
}
