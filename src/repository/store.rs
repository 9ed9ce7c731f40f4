use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{AssetStatus, Lesson, LessonWithAsset, PdfAsset, PdfPage};

use super::AssetRepository;
use super::error::{RepositoryError, Result};
use super::partitions::{
    decode_uuid, encode_asset_key, encode_lesson_key, encode_page_id_key, encode_page_key,
    encode_page_prefix,
};

/// Fjall-backed storage for lessons, PDF assets and pages
pub struct FjallRepository {
    keyspace: Keyspace,
    lessons: PartitionHandle,
    assets: PartitionHandle,
    asset_by_lesson: PartitionHandle,
    pages: PartitionHandle,
    page_ids: PartitionHandle,
    // Serializes check-then-insert for the uniqueness invariants
    write_lock: Mutex<()>,
}

impl FjallRepository {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall repository at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let lessons = keyspace.open_partition("lessons", PartitionCreateOptions::default())?;
        let assets = keyspace.open_partition("pdf_assets", PartitionCreateOptions::default())?;
        let asset_by_lesson =
            keyspace.open_partition("asset_by_lesson", PartitionCreateOptions::default())?;
        let pages = keyspace.open_partition("pdf_pages", PartitionCreateOptions::default())?;
        let page_ids = keyspace.open_partition("page_ids", PartitionCreateOptions::default())?;

        info!("Fjall repository opened successfully");
        Ok(Self {
            keyspace,
            lessons,
            assets,
            asset_by_lesson,
            pages,
            page_ids,
            write_lock: Mutex::new(()),
        })
    }

    /// Store or replace a lesson record.
    ///
    /// Lessons belong to the course catalog; this exists for seeding and tooling.
    pub fn put_lesson(&self, lesson: &Lesson) -> Result<()> {
        let value = serde_json::to_vec(lesson)?;
        self.lessons.insert(encode_lesson_key(lesson.id), value)?;
        debug!(lesson_id = %lesson.id, "Stored lesson");
        Ok(())
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Approximate record counts from partition metadata; does not scan
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            lesson_count: self.lessons.approximate_len(),
            asset_count: self.assets.approximate_len(),
            page_count: self.pages.approximate_len(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_json<T: DeserializeOwned>(partition: &PartitionHandle, key: &[u8]) -> Result<Option<T>> {
        match partition.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn load_lesson(&self, lesson_id: Uuid) -> Result<Lesson> {
        Self::read_json(&self.lessons, &encode_lesson_key(lesson_id))?
            .ok_or_else(|| RepositoryError::NotFound(format!("lesson {lesson_id}")))
    }

    fn load_asset(&self, asset_id: Uuid) -> Result<Option<PdfAsset>> {
        Self::read_json(&self.assets, &encode_asset_key(asset_id))
    }

    fn asset_for_lesson(&self, lesson_id: Uuid) -> Result<Option<PdfAsset>> {
        let Some(raw) = self.asset_by_lesson.get(encode_lesson_key(lesson_id))? else {
            return Ok(None);
        };
        let asset_id = decode_uuid(&raw).ok_or_else(|| {
            RepositoryError::Backend(format!("corrupt asset index for lesson {lesson_id}"))
        })?;
        self.load_asset(asset_id)
    }

    fn write_asset(&self, asset: &PdfAsset) -> Result<()> {
        let value = serde_json::to_vec(asset)?;
        self.assets.insert(encode_asset_key(asset.id), value)?;
        Ok(())
    }
}

#[async_trait]
impl AssetRepository for FjallRepository {
    async fn get_by_id(&self, lesson_id: Uuid) -> Result<Lesson> {
        self.load_lesson(lesson_id)
    }

    async fn get_by_id_with_pdf_asset(&self, lesson_id: Uuid) -> Result<LessonWithAsset> {
        let lesson = self.load_lesson(lesson_id)?;
        let asset = self.asset_for_lesson(lesson_id)?;
        Ok(LessonWithAsset { lesson, asset })
    }

    async fn get_pending_pdf_lessons(&self, limit: usize) -> Result<Vec<Lesson>> {
        let mut pending = Vec::new();

        for item in self.lessons.iter() {
            let (_, value) = item?;
            let lesson: Lesson = serde_json::from_slice(&value)?;
            if lesson.pdf_url().is_none() {
                continue;
            }
            match self.asset_for_lesson(lesson.id)? {
                None => pending.push(lesson),
                Some(asset) if asset.status == AssetStatus::Pending => pending.push(lesson),
                Some(_) => {}
            }
        }

        pending.sort_by_key(|lesson| lesson.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn get_pdf_asset_by_lesson_id(&self, lesson_id: Uuid) -> Result<Option<PdfAsset>> {
        self.asset_for_lesson(lesson_id)
    }

    async fn create_pdf_asset(&self, asset: &PdfAsset) -> Result<()> {
        let _guard = self.lock();

        let index_key = encode_lesson_key(asset.lesson_id);
        if self.asset_by_lesson.contains_key(&index_key)? {
            return Err(RepositoryError::Conflict(format!(
                "lesson {} already has a PDF asset",
                asset.lesson_id
            )));
        }

        let mut batch = self.keyspace.batch();
        batch.insert(&self.assets, encode_asset_key(asset.id), serde_json::to_vec(asset)?);
        batch.insert(&self.asset_by_lesson, index_key, asset.id.to_string().into_bytes());
        batch.commit()?;

        debug!(asset_id = %asset.id, lesson_id = %asset.lesson_id, "Created PDF asset");
        Ok(())
    }

    async fn update_pdf_asset(&self, asset: &PdfAsset) -> Result<()> {
        let _guard = self.lock();

        if self.load_asset(asset.id)?.is_none() {
            return Err(RepositoryError::NotFound(format!("pdf asset {}", asset.id)));
        }
        let mut updated = asset.clone();
        updated.updated_at = Utc::now();
        self.write_asset(&updated)
    }

    async fn update_pdf_asset_status(
        &self,
        asset_id: Uuid,
        status: AssetStatus,
        total_pages: Option<u32>,
        error: Option<String>,
    ) -> Result<()> {
        let _guard = self.lock();

        let mut asset = self
            .load_asset(asset_id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("pdf asset {asset_id}")))?;
        asset.status = status;
        asset.total_pages = total_pages;
        asset.error = error;
        asset.updated_at = Utc::now();
        self.write_asset(&asset)?;

        debug!(%asset_id, %status, ?total_pages, "Updated PDF asset status");
        Ok(())
    }

    async fn get_failed_pdf_assets(&self) -> Result<Vec<PdfAsset>> {
        let mut failed = Vec::new();
        for item in self.assets.iter() {
            let (_, value) = item?;
            let asset: PdfAsset = serde_json::from_slice(&value)?;
            if asset.status == AssetStatus::Failed {
                failed.push(asset);
            }
        }
        failed.sort_by_key(|asset| asset.updated_at);
        Ok(failed)
    }

    async fn get_pdf_page_by_asset_and_number(
        &self,
        asset_id: Uuid,
        page_number: u32,
    ) -> Result<Option<PdfPage>> {
        Self::read_json(&self.pages, &encode_page_key(asset_id, page_number))
    }

    async fn create_pdf_page(&self, page: &PdfPage) -> Result<()> {
        let _guard = self.lock();

        let key = encode_page_key(page.asset_id, page.page_number);
        if self.pages.contains_key(&key)? {
            return Err(RepositoryError::Conflict(format!(
                "page {} of asset {} already exists",
                page.page_number, page.asset_id
            )));
        }

        let mut batch = self.keyspace.batch();
        batch.insert(&self.pages, key.clone(), serde_json::to_vec(page)?);
        batch.insert(&self.page_ids, encode_page_id_key(page.id), key);
        batch.commit()?;
        Ok(())
    }

    async fn get_pdf_pages_by_asset_id(&self, asset_id: Uuid) -> Result<Vec<PdfPage>> {
        let mut pages = Vec::new();
        for item in self.pages.prefix(encode_page_prefix(asset_id)) {
            let (_, value) = item?;
            pages.push(serde_json::from_slice(&value)?);
        }
        Ok(pages)
    }

    async fn delete_pdf_page(&self, page_id: Uuid) -> Result<()> {
        let _guard = self.lock();

        let id_key = encode_page_id_key(page_id);
        let page_key = self
            .page_ids
            .get(&id_key)?
            .ok_or_else(|| RepositoryError::NotFound(format!("pdf page {page_id}")))?;

        let mut batch = self.keyspace.batch();
        batch.remove(&self.pages, page_key.to_vec());
        batch.remove(&self.page_ids, id_key);
        batch.commit()?;
        Ok(())
    }

    async fn delete_pdf_pages_by_asset_id(&self, asset_id: Uuid) -> Result<usize> {
        let _guard = self.lock();

        let mut batch = self.keyspace.batch();
        let mut removed = 0;
        for item in self.pages.prefix(encode_page_prefix(asset_id)) {
            let (key, value) = item?;
            let page: PdfPage = serde_json::from_slice(&value)?;
            batch.remove(&self.pages, key.to_vec());
            batch.remove(&self.page_ids, encode_page_id_key(page.id));
            removed += 1;
        }
        batch.commit()?;

        debug!(%asset_id, removed, "Deleted PDF pages");
        Ok(removed)
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreStats {
    pub lesson_count: usize,
    pub asset_count: usize,
    pub page_count: usize,
}
