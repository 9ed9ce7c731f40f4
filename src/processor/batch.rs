use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::PdfProcessor;
use crate::error::Result;
use crate::models::{AssetStatus, BatchResult, CleanupReport, LessonOutcome, PdfAsset, RetryReport};

impl PdfProcessor {
    /// Convert up to `limit` lessons that are waiting for a first conversion.
    ///
    /// Per-lesson failures are captured in the result; only listing the
    /// candidates can fail the call.
    pub async fn process_all_pending_lessons(self: &Arc<Self>, limit: usize) -> Result<BatchResult> {
        let lessons = self.repo.get_pending_pdf_lessons(limit).await?;
        if lessons.is_empty() {
            info!("No pending lessons to process");
            return Ok(BatchResult::default());
        }

        let total = lessons.len();
        info!(total, limit, "Processing pending lessons");

        let this = Arc::clone(self);
        let results = self
            .pool("pending-lessons", self.settings.batch_workers)
            .run(
                lessons.into_iter().map(|lesson| lesson.id).collect(),
                move |lesson_id: Uuid| {
                    let this = this.clone();
                    async move {
                        match this.process_lesson(lesson_id).await {
                            Ok(result) => LessonOutcome {
                                lesson_id,
                                result: Some(result),
                                error: None,
                            },
                            Err(e) => {
                                warn!(%lesson_id, error = %e, "Lesson failed in batch");
                                LessonOutcome {
                                    lesson_id,
                                    result: None,
                                    error: Some(e.to_string()),
                                }
                            }
                        }
                    }
                },
            )
            .await;

        let processed = results.iter().filter(|outcome| outcome.succeeded()).count();
        info!(processed, total, "Pending lesson batch finished");

        Ok(BatchResult {
            processed,
            total,
            results,
        })
    }

    /// Re-run conversion for every lesson whose asset is `failed`
    pub async fn retry_failed_assets(self: &Arc<Self>) -> Result<RetryReport> {
        let assets = self.repo.get_failed_pdf_assets().await?;
        if assets.is_empty() {
            info!("No failed assets to retry");
            return Ok(RetryReport::default());
        }

        let attempted = assets.len();
        info!(attempted, "Retrying failed assets");

        let this = Arc::clone(self);
        let outcomes = self
            .pool("retry-failed", self.settings.retry_workers)
            .run(assets, move |asset: PdfAsset| {
                let this = this.clone();
                async move {
                    match this.process_lesson(asset.lesson_id).await {
                        Ok(result) => result.success,
                        Err(e) => {
                            error!(
                                asset_id = %asset.id,
                                lesson_id = %asset.lesson_id,
                                error = %e,
                                "Retry failed"
                            );
                            false
                        }
                    }
                }
            })
            .await;

        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        let report = RetryReport {
            attempted,
            succeeded,
            failed: attempted - succeeded,
        };
        info!(?report, "Retry of failed assets finished");
        Ok(report)
    }

    /// Delete the pages of every `failed` asset.
    ///
    /// Candidates are the failed assets; per-page deletion failures are
    /// logged and counted, never propagated.
    pub async fn cleanup_orphaned_pages(self: &Arc<Self>) -> Result<CleanupReport> {
        let assets = self.repo.get_failed_pdf_assets().await?;
        if assets.is_empty() {
            info!("No assets to clean up");
            return Ok(CleanupReport::default());
        }

        let assets_scanned = assets.len();
        info!(assets_scanned, "Cleaning up orphaned pages");

        let this = Arc::clone(self);
        let per_asset = self
            .pool("cleanup-assets", self.settings.cleanup_workers)
            .run(
                assets.into_iter().map(|asset| asset.id).collect(),
                move |asset_id: Uuid| {
                    let this = this.clone();
                    async move { this.delete_asset_pages(asset_id).await }
                },
            )
            .await;

        let report = per_asset.into_iter().fold(
            CleanupReport {
                assets_scanned,
                ..CleanupReport::default()
            },
            |mut report, (deleted, failed)| {
                report.pages_deleted += deleted;
                report.pages_failed += failed;
                report
            },
        );
        info!(?report, "Orphaned page cleanup finished");
        Ok(report)
    }

    /// Returns (deleted, failed) page counts
    async fn delete_asset_pages(&self, asset_id: Uuid) -> (usize, usize) {
        let pages = match self.repo.get_pdf_pages_by_asset_id(asset_id).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(%asset_id, error = %e, "Could not list pages for cleanup");
                return (0, 0);
            }
        };
        if pages.is_empty() {
            return (0, 0);
        }

        let repo = self.repo.clone();
        let results = self
            .pool("cleanup-pages", self.settings.page_delete_workers)
            .run(pages, move |page| {
                let repo = repo.clone();
                async move {
                    match repo.delete_pdf_page(page.id).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(
                                asset_id = %page.asset_id,
                                page = page.page_number,
                                error = %e,
                                "Failed to delete page"
                            );
                            false
                        }
                    }
                }
            })
            .await;

        let deleted = results.iter().filter(|ok| **ok).count();
        (deleted, results.len() - deleted)
    }

    /// Drop all pages and put the lesson's asset back to `pending`.
    ///
    /// Does not convert; call [`PdfProcessor::process_lesson`] afterwards.
    pub async fn regenerate_pdf(&self, lesson_id: Uuid) -> Result<()> {
        let _guard = self.lesson_locks.acquire(lesson_id).await;

        let lesson_with_asset = self.get_lesson_with_pdf_asset(lesson_id).await?;
        let pdf_url = Self::validate_lesson_has_pdf(&lesson_with_asset.lesson)?;

        match lesson_with_asset.asset {
            Some(asset) => {
                match self.repo.delete_pdf_pages_by_asset_id(asset.id).await {
                    Ok(removed) => info!(%lesson_id, asset_id = %asset.id, removed, "Deleted pages for regeneration"),
                    Err(e) => error!(%lesson_id, asset_id = %asset.id, error = %e, "Failed to delete pages"),
                }
                self.record_status(asset.id, AssetStatus::Pending, None, None)
                    .await;
            }
            None => {
                let asset = PdfAsset::new(lesson_id, pdf_url, AssetStatus::Pending);
                self.repo.create_pdf_asset(&asset).await?;
                info!(%lesson_id, asset_id = %asset.id, "Created pending PDF asset");
            }
        }

        Ok(())
    }
}
