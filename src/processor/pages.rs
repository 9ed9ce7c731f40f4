use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::PdfProcessor;
use crate::conversion::decode_image;
use crate::error::{PipelineError, Result};
use crate::models::PdfPage;
use crate::repository::{AssetRepository, RepositoryError};
use crate::storage::ObjectStorage;

/// Object key for a rendered page: `lessons/{asset_id}/page-{n}.jpg`
pub fn page_object_key(asset_id: Uuid, page_number: u32) -> String {
    format!("lessons/{}/page-{}.jpg", asset_id, page_number)
}

struct PageJob {
    asset_id: Uuid,
    lesson_id: Uuid,
    page_number: u32,
    image: String,
}

impl PdfProcessor {
    /// Upload and record every page image concurrently.
    ///
    /// Returns how many pages are persisted afterwards, counting pages that
    /// already existed. A failing page is logged and skipped; the only error
    /// is a cancelled run that left pages unattempted.
    pub async fn save_pages_directly(
        &self,
        asset_id: Uuid,
        lesson_id: Uuid,
        images: Vec<String>,
    ) -> Result<u32> {
        if images.is_empty() {
            return Ok(0);
        }

        let total = images.len();
        let jobs: Vec<PageJob> = images
            .into_iter()
            .enumerate()
            .map(|(idx, image)| PageJob {
                asset_id,
                lesson_id,
                page_number: idx as u32 + 1,
                image,
            })
            .collect();

        let repo = self.repo.clone();
        let storage = self.storage.clone();
        let outcomes = self
            .pool("page-save", self.settings.page_save_workers)
            .run(jobs, move |job| {
                let repo = repo.clone();
                let storage = storage.clone();
                async move { save_page(repo, storage, job).await }
            })
            .await;

        if outcomes.len() < total && self.cancel.is_cancelled() {
            return Err(PipelineError::Internal(format!(
                "page save cancelled after {} of {} pages",
                outcomes.len(),
                total
            )));
        }

        let saved = outcomes.into_iter().filter(|saved| *saved).count() as u32;
        debug!(%asset_id, %lesson_id, saved, total, "Page save finished");
        Ok(saved)
    }
}

async fn save_page(
    repo: Arc<dyn AssetRepository>,
    storage: Arc<dyn ObjectStorage>,
    job: PageJob,
) -> bool {
    let PageJob {
        asset_id,
        lesson_id,
        page_number,
        image,
    } = job;

    match repo.get_pdf_page_by_asset_and_number(asset_id, page_number).await {
        Ok(Some(_)) => {
            debug!(%asset_id, page = page_number, "Page already saved");
            return true;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(%asset_id, %lesson_id, page = page_number, error = %e, "Page lookup failed");
            return false;
        }
    }

    let data = match decode_image(&image) {
        Ok(data) => data,
        Err(e) => {
            warn!(%asset_id, %lesson_id, page = page_number, error = %e, "Page image is not valid base64");
            return false;
        }
    };

    let key = page_object_key(asset_id, page_number);
    let url = match storage
        .upload(data, &key, mime::IMAGE_JPEG.essence_str())
        .await
    {
        Ok(url) => url,
        Err(e) => {
            warn!(%asset_id, %lesson_id, page = page_number, error = %e, "Page upload failed");
            return false;
        }
    };

    match repo
        .create_pdf_page(&PdfPage::new(asset_id, page_number, url))
        .await
    {
        Ok(()) => true,
        // A concurrent run persisted this page first.
        Err(RepositoryError::Conflict(_)) => true,
        Err(e) => {
            warn!(%asset_id, %lesson_id, page = page_number, error = %e, "Page record not saved");
            false
        }
    }
}
