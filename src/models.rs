//! Domain records for the PDF conversion pipeline.
//!
//! - [`Lesson`] is owned by the course catalog; this crate only reads it.
//! - [`PdfAsset`] tracks one lesson's conversion attempt and its outcome.
//! - [`PdfPage`] is one rendered page image, unique per `(asset_id, page_number)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    /// Source media uploaded by the instructor; only `.pdf` URLs are convertible.
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lesson {
    pub fn new(id: Uuid, title: impl Into<String>, media_url: Option<String>) -> Self {
        Self {
            id,
            title: title.into(),
            media_url,
            created_at: Utc::now(),
        }
    }

    /// Returns the media URL when it points at a PDF document.
    pub fn pdf_url(&self) -> Option<&str> {
        self.media_url
            .as_deref()
            .filter(|url| !url.is_empty() && url.ends_with(".pdf"))
    }
}

/// A lesson joined with its current PDF asset, if one exists.
#[derive(Debug, Clone, Serialize)]
pub struct LessonWithAsset {
    pub lesson: Lesson,
    pub asset: Option<PdfAsset>,
}

/// Conversion state of a [`PdfAsset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Pending,
    Processing,
    Partial,
    Done,
    Failed,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Processing => "processing",
            AssetStatus::Partial => "partial",
            AssetStatus::Done => "done",
            AssetStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AssetStatus::Pending),
            "processing" => Ok(AssetStatus::Processing),
            "partial" => Ok(AssetStatus::Partial),
            "done" => Ok(AssetStatus::Done),
            "failed" => Ok(AssetStatus::Failed),
            other => Err(format!("unknown asset status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfAsset {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub source_pdf_url: String,
    pub status: AssetStatus,
    pub total_pages: Option<u32>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PdfAsset {
    pub fn new(lesson_id: Uuid, source_pdf_url: impl Into<String>, status: AssetStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            lesson_id,
            source_pdf_url: source_pdf_url.into(),
            status,
            total_pages: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfPage {
    pub id: Uuid,
    pub asset_id: Uuid,
    /// 1-based
    pub page_number: u32,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl PdfPage {
    pub fn new(asset_id: Uuid, page_number: u32, image_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            asset_id,
            page_number,
            image_url: image_url.into(),
            created_at: Utc::now(),
        }
    }
}

/// Outcome of converting a single lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub lesson_id: Uuid,
    pub asset_id: Uuid,
    pub success: bool,
    pub status: AssetStatus,
    pub total_pages: u32,
    pub processed_pages: u32,
}

/// Per-lesson entry of a [`BatchResult`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonOutcome {
    pub lesson_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LessonOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.success)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Lessons whose conversion finished with every page saved
    pub processed: usize,
    pub total: usize,
    pub results: Vec<LessonOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub assets_scanned: usize,
    pub pages_deleted: usize,
    pub pages_failed: usize,
}
