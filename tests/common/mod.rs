//! Shared fakes for integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use lessonpdf::config::PipelineConfig;
use lessonpdf::conversion::{ConversionClient, RemoteError, RemoteTask, encode_image};
use lessonpdf::models::{AssetStatus, Lesson, LessonWithAsset, PdfAsset, PdfPage};
use lessonpdf::processor::PdfProcessor;
use lessonpdf::repository::{self, AssetRepository, FjallRepository, RepositoryError};
use lessonpdf::storage::{self, ObjectStorage, StorageClient, StorageError};

/// `n` distinct page images, encoded the way the converter returns them
pub fn page_images(n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| encode_image(format!("jpeg-page-{i}").as_bytes()))
        .collect()
}

/// Conversion client that returns a fixed list of pages.
///
/// `fail` makes the token step fail; `delay` stalls `add_file` so tests can
/// observe overlapping conversions.
pub struct FakeConverter {
    pages: Mutex<Vec<String>>,
    fail: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeConverter {
    pub fn with_pages(n: usize) -> Self {
        Self {
            pages: Mutex::new(page_images(n)),
            fail: AtomicBool::new(false),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let converter = Self::with_pages(0);
        converter.set_failing(true);
        converter
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_pages(&self, pages: Vec<String>) {
        *self.pages.lock().unwrap() = pages;
    }

    /// Completed or attempted conversions
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversionClient for FakeConverter {
    async fn get_token(&self) -> Result<String, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: 401,
                body: "invalid public key".into(),
            });
        }
        Ok("token".into())
    }

    async fn create_task(&self, _token: &str) -> Result<RemoteTask, RemoteError> {
        Ok(RemoteTask {
            task_id: Uuid::new_v4().to_string(),
            server: "render.test".into(),
        })
    }

    async fn add_file(
        &self,
        _token: &str,
        _task_id: &str,
        _pdf_url: &str,
        _server: &str,
    ) -> Result<String, RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("lesson.pdf".into())
    }

    async fn process_task(
        &self,
        _token: &str,
        _task_id: &str,
        _server_filename: &str,
        _server: &str,
    ) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn download_task(
        &self,
        _token: &str,
        _task_id: &str,
        _server: &str,
    ) -> Result<Bytes, RemoteError> {
        Ok(Bytes::new())
    }

    fn extract_images_from_zip(&self, _zip: &[u8]) -> Result<Vec<String>, RemoteError> {
        Ok(self.pages.lock().unwrap().clone())
    }
}

/// In-memory storage that rejects uploads of chosen page numbers
pub struct FailingStorage {
    inner: StorageClient,
    fail_pages: HashSet<u32>,
    uploads: AtomicUsize,
    cancel_on_upload: Mutex<Option<CancellationToken>>,
}

impl FailingStorage {
    pub fn new(fail_pages: impl IntoIterator<Item = u32>) -> Self {
        Self {
            inner: StorageClient::in_memory(),
            fail_pages: fail_pages.into_iter().collect(),
            uploads: AtomicUsize::new(0),
            cancel_on_upload: Mutex::new(None),
        }
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Cancel `token` as soon as the first upload arrives
    pub fn cancel_on_first_upload(&self, token: CancellationToken) {
        *self.cancel_on_upload.lock().unwrap() = Some(token);
    }
}

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> storage::Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.cancel_on_upload.lock().unwrap().take() {
            token.cancel();
        }
        let failing = self
            .fail_pages
            .iter()
            .any(|page| filename.ends_with(&format!("/page-{page}.jpg")));
        if failing {
            return Err(StorageError::UploadFailed(format!("injected failure for {filename}")));
        }
        self.inner.upload(data, filename, content_type).await
    }
}

/// Fjall repository with injectable write failures
pub struct FlakyRepository {
    inner: Arc<FjallRepository>,
    fail_deletes: Mutex<HashSet<Uuid>>,
    fail_creates: Mutex<HashSet<u32>>,
    fail_status: Mutex<HashSet<AssetStatus>>,
}

impl FlakyRepository {
    pub fn new(inner: Arc<FjallRepository>) -> Self {
        Self {
            inner,
            fail_deletes: Mutex::new(HashSet::new()),
            fail_creates: Mutex::new(HashSet::new()),
            fail_status: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_delete_of(&self, page_id: Uuid) {
        self.fail_deletes.lock().unwrap().insert(page_id);
    }

    /// Fail `create_pdf_page` for this page number with a backend error
    pub fn fail_page_create_of(&self, page_number: u32) {
        self.fail_creates.lock().unwrap().insert(page_number);
    }

    /// Fail every status update that moves an asset to `status`
    pub fn fail_status_update_to(&self, status: AssetStatus) {
        self.fail_status.lock().unwrap().insert(status);
    }
}

#[async_trait]
impl AssetRepository for FlakyRepository {
    async fn get_by_id(&self, lesson_id: Uuid) -> repository::Result<Lesson> {
        self.inner.get_by_id(lesson_id).await
    }

    async fn get_by_id_with_pdf_asset(&self, lesson_id: Uuid) -> repository::Result<LessonWithAsset> {
        self.inner.get_by_id_with_pdf_asset(lesson_id).await
    }

    async fn get_pending_pdf_lessons(&self, limit: usize) -> repository::Result<Vec<Lesson>> {
        self.inner.get_pending_pdf_lessons(limit).await
    }

    async fn get_pdf_asset_by_lesson_id(&self, lesson_id: Uuid) -> repository::Result<Option<PdfAsset>> {
        self.inner.get_pdf_asset_by_lesson_id(lesson_id).await
    }

    async fn create_pdf_asset(&self, asset: &PdfAsset) -> repository::Result<()> {
        self.inner.create_pdf_asset(asset).await
    }

    async fn update_pdf_asset(&self, asset: &PdfAsset) -> repository::Result<()> {
        self.inner.update_pdf_asset(asset).await
    }

    async fn update_pdf_asset_status(
        &self,
        asset_id: Uuid,
        status: AssetStatus,
        total_pages: Option<u32>,
        error: Option<String>,
    ) -> repository::Result<()> {
        if self.fail_status.lock().unwrap().contains(&status) {
            return Err(RepositoryError::Backend(format!("injected status failure for {asset_id}")));
        }
        self.inner
            .update_pdf_asset_status(asset_id, status, total_pages, error)
            .await
    }

    async fn get_failed_pdf_assets(&self) -> repository::Result<Vec<PdfAsset>> {
        self.inner.get_failed_pdf_assets().await
    }

    async fn get_pdf_page_by_asset_and_number(
        &self,
        asset_id: Uuid,
        page_number: u32,
    ) -> repository::Result<Option<PdfPage>> {
        self.inner
            .get_pdf_page_by_asset_and_number(asset_id, page_number)
            .await
    }

    async fn create_pdf_page(&self, page: &PdfPage) -> repository::Result<()> {
        if self.fail_creates.lock().unwrap().contains(&page.page_number) {
            return Err(RepositoryError::Backend(format!(
                "injected create failure for page {}",
                page.page_number
            )));
        }
        self.inner.create_pdf_page(page).await
    }

    async fn get_pdf_pages_by_asset_id(&self, asset_id: Uuid) -> repository::Result<Vec<PdfPage>> {
        self.inner.get_pdf_pages_by_asset_id(asset_id).await
    }

    async fn delete_pdf_page(&self, page_id: Uuid) -> repository::Result<()> {
        if self.fail_deletes.lock().unwrap().contains(&page_id) {
            return Err(RepositoryError::Backend(format!("injected delete failure for {page_id}")));
        }
        self.inner.delete_pdf_page(page_id).await
    }

    async fn delete_pdf_pages_by_asset_id(&self, asset_id: Uuid) -> repository::Result<usize> {
        self.inner.delete_pdf_pages_by_asset_id(asset_id).await
    }
}

/// Processor wired to a temporary fjall store and in-memory fakes
pub struct Harness {
    pub store: Arc<FjallRepository>,
    pub repo: Arc<FlakyRepository>,
    pub storage: Arc<FailingStorage>,
    pub converter: Arc<FakeConverter>,
    pub processor: Arc<PdfProcessor>,
    pub cancel: CancellationToken,
    _temp_dir: TempDir,
}

impl Harness {
    pub fn new(converter: FakeConverter) -> Self {
        Self::with_storage(converter, FailingStorage::new([]))
    }

    pub fn with_storage(converter: FakeConverter, storage: FailingStorage) -> Self {
        Self::with_settings(converter, storage, PipelineConfig::default())
    }

    pub fn with_settings(
        converter: FakeConverter,
        storage: FailingStorage,
        settings: PipelineConfig,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            FjallRepository::open(temp_dir.path().join("lessons")).expect("Failed to open store"),
        );
        let repo = Arc::new(FlakyRepository::new(store.clone()));
        let storage = Arc::new(storage);
        let converter = Arc::new(converter);
        let cancel = CancellationToken::new();

        let processor = Arc::new(PdfProcessor::new(
            repo.clone(),
            storage.clone(),
            converter.clone(),
            settings,
            cancel.clone(),
        ));

        Self {
            store,
            repo,
            storage,
            converter,
            processor,
            cancel,
            _temp_dir: temp_dir,
        }
    }

    /// Register a lesson whose media is a PDF
    pub fn add_pdf_lesson(&self) -> Uuid {
        let id = Uuid::now_v7();
        self.add_lesson(id, Some(format!("https://cdn.example.com/lessons/{id}.pdf")));
        id
    }

    pub fn add_lesson(&self, id: Uuid, media_url: Option<String>) {
        self.store
            .put_lesson(&Lesson::new(id, format!("Lesson {id}"), media_url))
            .expect("Failed to store lesson");
    }

    pub async fn asset(&self, lesson_id: Uuid) -> Option<PdfAsset> {
        self.store
            .get_pdf_asset_by_lesson_id(lesson_id)
            .await
            .expect("Failed to load asset")
    }

    pub async fn pages(&self, asset_id: Uuid) -> Vec<PdfPage> {
        self.store
            .get_pdf_pages_by_asset_id(asset_id)
            .await
            .expect("Failed to load pages")
    }
}
