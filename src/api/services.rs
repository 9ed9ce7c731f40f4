use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use super::{
    error::ApiError,
    models::{HealthResponse, PendingQuery},
    state::AppState,
    utils::{parse_lesson_id, resolve_limit},
};

/// Convert one lesson's PDF (POST /lessons/{lesson_id}/pdf/process)
///
/// Responds 200 with the `ProcessResult` for `done` and `partial` outcomes;
/// a failed conversion is a 500 and leaves the asset `failed`.
pub async fn process_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = parse_lesson_id(&lesson_id)?;
    let result = state.processor.process_lesson(lesson_id).await?;
    Ok((StatusCode::OK, Json(result)))
}

/// Reset a lesson's asset to `pending` (POST /lessons/{lesson_id}/pdf/regenerate)
pub async fn regenerate_pdf(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = parse_lesson_id(&lesson_id)?;
    state.processor.regenerate_pdf(lesson_id).await?;
    info!(%lesson_id, "Lesson PDF queued for regeneration");
    Ok(StatusCode::NO_CONTENT)
}

/// Lesson with its PDF asset, if any (GET /lessons/{lesson_id}/pdf)
pub async fn get_lesson_pdf(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = parse_lesson_id(&lesson_id)?;
    let lesson = state.processor.get_lesson_with_pdf_asset(lesson_id).await?;
    Ok((StatusCode::OK, Json(lesson)))
}

/// Pages of the lesson's asset in page order (GET /lessons/{lesson_id}/pdf/pages)
pub async fn get_lesson_pages(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = parse_lesson_id(&lesson_id)?;
    let pages = state.processor.get_lesson_pages(lesson_id).await?;
    Ok((StatusCode::OK, Json(pages)))
}

/// Batch-convert pending lessons (POST /pdf/pending?limit=N)
pub async fn process_pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = resolve_limit(query.limit, state.processor.settings().pending_limit)?;
    let batch = state.processor.process_all_pending_lessons(limit).await?;
    Ok((StatusCode::OK, Json(batch)))
}

/// Re-run every failed asset (POST /pdf/retry)
pub async fn retry_failed(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.processor.retry_failed_assets().await?;
    Ok((StatusCode::OK, Json(report)))
}

/// Delete pages of failed assets (POST /pdf/cleanup)
pub async fn cleanup_pages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.processor.cleanup_orphaned_pages().await?;
    Ok((StatusCode::OK, Json(report)))
}

/// Health check endpoint (GET /health)
///
/// Store counts are approximate; the handler never scans partitions.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.as_ref().map(|store| store.stats()),
    };

    (StatusCode::OK, Json(response))
}
