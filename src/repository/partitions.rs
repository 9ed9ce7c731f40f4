/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `lessons`: lesson:{lesson_id} -> Lesson (JSON)
/// - `pdf_assets`: asset:{asset_id} -> PdfAsset (JSON)
/// - `asset_by_lesson`: lesson:{lesson_id} -> asset_id (string)
/// - `pdf_pages`: page:{asset_id}:{page_number:010} -> PdfPage (JSON)
/// - `page_ids`: pageid:{page_id} -> page key (bytes)
use uuid::Uuid;

/// Encode a lesson key: lesson:{lesson_id}
///
/// Also used as the `asset_by_lesson` index key.
pub fn encode_lesson_key(lesson_id: Uuid) -> Vec<u8> {
    format!("lesson:{}", lesson_id).into_bytes()
}

/// Encode an asset key: asset:{asset_id}
pub fn encode_asset_key(asset_id: Uuid) -> Vec<u8> {
    format!("asset:{}", asset_id).into_bytes()
}

/// Encode a page key: page:{asset_id}:{page_number:010}
///
/// Zero padding keeps a prefix scan in page order.
pub fn encode_page_key(asset_id: Uuid, page_number: u32) -> Vec<u8> {
    format!("page:{}:{:010}", asset_id, page_number).into_bytes()
}

/// Encode a page prefix for range scan: page:{asset_id}:
pub fn encode_page_prefix(asset_id: Uuid) -> Vec<u8> {
    format!("page:{}:", asset_id).into_bytes()
}

/// Encode a page id index key: pageid:{page_id}
pub fn encode_page_id_key(page_id: Uuid) -> Vec<u8> {
    format!("pageid:{}", page_id).into_bytes()
}

/// Decode a stored asset id (value of the `asset_by_lesson` index)
pub fn decode_uuid(value: &[u8]) -> Option<Uuid> {
    std::str::from_utf8(value).ok()?.parse().ok()
}
