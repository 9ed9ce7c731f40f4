//! Persistence for lessons, PDF assets and PDF pages
//!
//! The orchestrator only sees the [`AssetRepository`] trait, a narrowed view
//! of the lesson repository. [`FjallRepository`] is the embedded
//! implementation: one Fjall partition per record type plus two secondary
//! indexes (lesson -> asset, page id -> page key).
//!
//! ## Invariants
//!
//! - At most one asset per lesson (`create_pdf_asset` rejects a second one)
//! - At most one page per `(asset_id, page_number)` (`create_pdf_page`
//!   returns [`RepositoryError::Conflict`] for duplicates)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lessonpdf::repository::FjallRepository;
//!
//! let repo = FjallRepository::open("data/lessonpdf")?;
//! repo.put_lesson(&lesson)?;
//! let pages = repo.get_pdf_pages_by_asset_id(asset_id).await?;
//! ```
pub mod error;
pub mod partitions;
pub mod store;

pub use error::{RepositoryError, Result};
pub use store::{FjallRepository, StoreStats};

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{AssetStatus, Lesson, LessonWithAsset, PdfAsset, PdfPage};

#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Fails with [`RepositoryError::NotFound`] if the lesson does not exist
    async fn get_by_id(&self, lesson_id: Uuid) -> Result<Lesson>;

    /// Fails with [`RepositoryError::NotFound`] if the lesson does not exist
    async fn get_by_id_with_pdf_asset(&self, lesson_id: Uuid) -> Result<LessonWithAsset>;

    /// Lessons with PDF media and no asset (or a `pending` one), oldest first
    async fn get_pending_pdf_lessons(&self, limit: usize) -> Result<Vec<Lesson>>;

    async fn get_pdf_asset_by_lesson_id(&self, lesson_id: Uuid) -> Result<Option<PdfAsset>>;

    async fn create_pdf_asset(&self, asset: &PdfAsset) -> Result<()>;

    async fn update_pdf_asset(&self, asset: &PdfAsset) -> Result<()>;

    /// Overwrites status, total pages and error with exactly the given values
    async fn update_pdf_asset_status(
        &self,
        asset_id: Uuid,
        status: AssetStatus,
        total_pages: Option<u32>,
        error: Option<String>,
    ) -> Result<()>;

    async fn get_failed_pdf_assets(&self) -> Result<Vec<PdfAsset>>;

    async fn get_pdf_page_by_asset_and_number(
        &self,
        asset_id: Uuid,
        page_number: u32,
    ) -> Result<Option<PdfPage>>;

    async fn create_pdf_page(&self, page: &PdfPage) -> Result<()>;

    /// Pages ordered by page number
    async fn get_pdf_pages_by_asset_id(&self, asset_id: Uuid) -> Result<Vec<PdfPage>>;

    async fn delete_pdf_page(&self, page_id: Uuid) -> Result<()>;

    /// Returns the number of pages removed
    async fn delete_pdf_pages_by_asset_id(&self, asset_id: Uuid) -> Result<usize>;
}
