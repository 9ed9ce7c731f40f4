//! PDF conversion orchestrator
//!
//! [`PdfProcessor`] converts a lesson's PDF into page images and keeps the
//! per-lesson [`PdfAsset`] in step with the outcome:
//!
//! ```text
//!   (none) ──process──▶ processing ──▶ done | partial | failed
//!      ▲                                  │
//!      └────────── regenerate ──▶ pending ◀┘
//! ```
//!
//! Batch operations (pending lessons, retry of failures, page cleanup) fan
//! out through [`WorkerPool`]; a failure in one unit of work is recorded or
//! logged and never aborts its siblings.

mod batch;
mod guard;
mod pages;

pub use pages::page_object_key;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::conversion::{ConversionClient, convert_pdf_to_images};
use crate::error::{PipelineError, Result};
use crate::models::{AssetStatus, Lesson, LessonWithAsset, PdfAsset, PdfPage, ProcessResult};
use crate::pool::WorkerPool;
use crate::repository::{AssetRepository, RepositoryError};
use crate::storage::ObjectStorage;

use guard::LessonLocks;

pub struct PdfProcessor {
    repo: Arc<dyn AssetRepository>,
    storage: Arc<dyn ObjectStorage>,
    converter: Arc<dyn ConversionClient>,
    settings: PipelineConfig,
    cancel: CancellationToken,
    lesson_locks: LessonLocks,
}

impl PdfProcessor {
    pub fn new(
        repo: Arc<dyn AssetRepository>,
        storage: Arc<dyn ObjectStorage>,
        converter: Arc<dyn ConversionClient>,
        settings: PipelineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            repo,
            storage,
            converter,
            settings,
            cancel,
            lesson_locks: LessonLocks::default(),
        }
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.settings
    }

    /// Token shared by every worker pool this processor starts
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn pool(&self, name: &'static str, workers: usize) -> WorkerPool {
        WorkerPool::new(name, workers, self.cancel.clone())
    }

    /// Convert one lesson's PDF and persist its pages.
    ///
    /// Returns a result even when only some pages were saved; errors mean the
    /// lesson could not be converted at all.
    pub async fn process_lesson(&self, lesson_id: Uuid) -> Result<ProcessResult> {
        let _guard = self.lesson_locks.acquire(lesson_id).await;
        info!(%lesson_id, "Processing lesson PDF");

        let LessonWithAsset { lesson, .. } = self.get_lesson_with_pdf_asset(lesson_id).await?;
        let pdf_url = Self::validate_lesson_has_pdf(&lesson)?.to_string();

        let asset = self.create_or_update_pdf_asset(lesson_id, &pdf_url).await?;

        let images = match convert_pdf_to_images(self.converter.as_ref(), &pdf_url).await {
            Ok(images) => images,
            Err(e) => {
                error!(%lesson_id, asset_id = %asset.id, error = %e, "PDF conversion failed");
                self.record_status(asset.id, AssetStatus::Failed, None, Some(e.to_string()))
                    .await;
                return Err(PipelineError::Internal(format!("PDF conversion failed: {e}")));
            }
        };

        let total_pages = images.len() as u32;
        info!(%lesson_id, asset_id = %asset.id, total_pages, "PDF converted, saving pages");

        let processed_pages = match self.save_pages_directly(asset.id, lesson_id, images).await {
            Ok(processed) => processed,
            Err(e) => {
                error!(%lesson_id, asset_id = %asset.id, error = %e, "Saving pages failed");
                self.record_status(
                    asset.id,
                    AssetStatus::Partial,
                    Some(total_pages),
                    Some(e.to_string()),
                )
                .await;
                return Err(PipelineError::Internal(format!("saving pages failed: {e}")));
            }
        };

        let (status, message) = if processed_pages == total_pages {
            (AssetStatus::Done, None)
        } else {
            let failed = total_pages - processed_pages;
            warn!(%lesson_id, asset_id = %asset.id, failed, total_pages, "Some pages were not saved");
            (
                AssetStatus::Partial,
                Some(format!("{failed} of {total_pages} pages failed to save")),
            )
        };

        if let Err(e) = self
            .repo
            .update_pdf_asset_status(asset.id, status, Some(total_pages), message)
            .await
        {
            error!(
                %lesson_id,
                asset_id = %asset.id,
                %status,
                processed_pages,
                total_pages,
                error = %e,
                "Final status not recorded; asset left in processing"
            );
            return Err(PipelineError::Internal(format!(
                "failed to update asset {} status: {e}",
                asset.id
            )));
        }

        info!(%lesson_id, asset_id = %asset.id, %status, processed_pages, total_pages, "Lesson PDF processed");

        Ok(ProcessResult {
            lesson_id,
            asset_id: asset.id,
            success: status == AssetStatus::Done,
            status,
            total_pages,
            processed_pages,
        })
    }

    /// Persist a status change whose failure must not mask the original error
    async fn record_status(
        &self,
        asset_id: Uuid,
        status: AssetStatus,
        total_pages: Option<u32>,
        message: Option<String>,
    ) {
        if let Err(e) = self
            .repo
            .update_pdf_asset_status(asset_id, status, total_pages, message)
            .await
        {
            error!(%asset_id, %status, error = %e, "Failed to update asset status");
        }
    }

    /// Returns the lesson's PDF URL, or a validation error if it has none
    pub fn validate_lesson_has_pdf(lesson: &Lesson) -> Result<&str> {
        lesson
            .pdf_url()
            .ok_or_else(|| PipelineError::missing_pdf(lesson.id))
    }

    pub async fn get_lesson_with_pdf_asset(&self, lesson_id: Uuid) -> Result<LessonWithAsset> {
        self.repo
            .get_by_id_with_pdf_asset(lesson_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => PipelineError::lesson_not_found(lesson_id),
                other => other.into(),
            })
    }

    /// Create the lesson's asset in `processing`, or reset the existing one.
    ///
    /// An existing asset keeps its recorded source URL.
    pub async fn create_or_update_pdf_asset(
        &self,
        lesson_id: Uuid,
        pdf_url: &str,
    ) -> Result<PdfAsset> {
        if let Some(existing) = self.repo.get_pdf_asset_by_lesson_id(lesson_id).await? {
            return self.reset_to_processing(existing).await;
        }

        let asset = PdfAsset::new(lesson_id, pdf_url, AssetStatus::Processing);
        match self.repo.create_pdf_asset(&asset).await {
            Ok(()) => {
                info!(%lesson_id, asset_id = %asset.id, "Created PDF asset");
                Ok(asset)
            }
            Err(RepositoryError::Conflict(_)) => {
                // Another writer created it between lookup and insert.
                let existing = self
                    .repo
                    .get_pdf_asset_by_lesson_id(lesson_id)
                    .await?
                    .ok_or_else(|| {
                        PipelineError::Internal(format!(
                            "asset for lesson {lesson_id} vanished after conflict"
                        ))
                    })?;
                self.reset_to_processing(existing).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn reset_to_processing(&self, mut asset: PdfAsset) -> Result<PdfAsset> {
        asset.status = AssetStatus::Processing;
        asset.error = None;
        self.repo.update_pdf_asset(&asset).await?;
        info!(lesson_id = %asset.lesson_id, asset_id = %asset.id, "Reset PDF asset for reprocessing");
        Ok(asset)
    }

    pub async fn get_pdf_pages_by_asset_id(&self, asset_id: Uuid) -> Result<Vec<PdfPage>> {
        Ok(self.repo.get_pdf_pages_by_asset_id(asset_id).await?)
    }

    /// Pages of the lesson's current asset; NotFound if lesson or asset is missing
    pub async fn get_lesson_pages(&self, lesson_id: Uuid) -> Result<Vec<PdfPage>> {
        let lesson = self.repo.get_by_id(lesson_id).await.map_err(|e| match e {
            RepositoryError::NotFound(_) => PipelineError::lesson_not_found(lesson_id),
            other => other.into(),
        })?;

        let asset = self
            .repo
            .get_pdf_asset_by_lesson_id(lesson.id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("pdf asset for lesson {lesson_id}")))?;

        self.get_pdf_pages_by_asset_id(asset.id).await
    }
}
