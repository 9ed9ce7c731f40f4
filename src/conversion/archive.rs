//! Page image packing: zip extraction and data-URI encoding

use std::io::{Cursor, Read};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::RemoteError;

pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Extract rendered pages from a download, in page order.
///
/// Single-page documents come back as a bare JPEG rather than an archive.
/// `max_bytes` caps the total unpacked size across all pages; an entry whose
/// declared or actual size crosses it fails with [`RemoteError::TooLarge`].
pub fn extract_images(bytes: &[u8], max_bytes: u64) -> Result<Vec<String>, RemoteError> {
    if bytes.starts_with(&JPEG_MAGIC) {
        let size = bytes.len() as u64;
        if size > max_bytes {
            return Err(RemoteError::TooLarge {
                size,
                limit: max_bytes,
            });
        }
        return Ok(vec![encode_image(bytes)]);
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RemoteError::Archive(e.to_string()))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| is_jpeg_name(name))
        .map(str::to_string)
        .collect();
    names.sort_by_key(|name| (trailing_number(name).unwrap_or(u32::MAX), name.clone()));

    let mut images = Vec::with_capacity(names.len());
    let mut unpacked: u64 = 0;
    for name in &names {
        let entry = archive
            .by_name(name)
            .map_err(|e| RemoteError::Archive(format!("{name}: {e}")))?;
        if entry.is_dir() {
            continue;
        }

        let remaining = max_bytes - unpacked;
        let declared = entry.size();
        if declared > remaining {
            return Err(RemoteError::TooLarge {
                size: unpacked + declared,
                limit: max_bytes,
            });
        }

        // Declared sizes can lie; never read more than one byte past the budget.
        let mut data = Vec::with_capacity(usize::try_from(declared).unwrap_or(0));
        entry
            .take(remaining.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| RemoteError::Archive(format!("{name}: {e}")))?;

        let size = data.len() as u64;
        if size > remaining {
            return Err(RemoteError::TooLarge {
                size: unpacked + size,
                limit: max_bytes,
            });
        }
        unpacked += size;
        images.push(encode_image(&data));
    }

    if images.is_empty() {
        return Err(RemoteError::NoImages);
    }

    tracing::debug!(pages = images.len(), unpacked, "Extracted page images");
    Ok(images)
}

pub fn encode_image(data: &[u8]) -> String {
    format!("{}{}", JPEG_DATA_URI_PREFIX, BASE64.encode(data))
}

/// Inverse of [`encode_image`]; the data-URI prefix is optional
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = encoded
        .strip_prefix(JPEG_DATA_URI_PREFIX)
        .unwrap_or(encoded);
    BASE64.decode(payload.trim())
}

fn is_jpeg_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !lower.ends_with('/') && (lower.ends_with(".jpg") || lower.ends_with(".jpeg"))
}

/// `docs/lesson-0012.jpg` -> 12
fn trailing_number(name: &str) -> Option<u32> {
    let file = name.rsplit('/').next()?;
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    let start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx)?;
    stem[start..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::CompressionMethod;
    use zip::write::SimpleFileOptions;

    const LIMIT: u64 = 1024 * 1024;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_pages_sorted_numerically() {
        let zip = build_zip(&[
            ("lesson-10.jpg", b"ten"),
            ("lesson-2.jpg", b"two"),
            ("lesson-1.jpg", b"one"),
            ("readme.txt", b"skip me"),
        ]);

        let images = extract_images(&zip, LIMIT).unwrap();
        let decoded: Vec<Vec<u8>> = images.iter().map(|i| decode_image(i).unwrap()).collect();
        assert_eq!(decoded, vec![b"one".to_vec(), b"two".to_vec(), b"ten".to_vec()]);
        assert!(images.iter().all(|i| i.starts_with(JPEG_DATA_URI_PREFIX)));
    }

    #[test]
    fn test_bare_jpeg_is_single_page() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        let images = extract_images(&jpeg, LIMIT).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(decode_image(&images[0]).unwrap(), jpeg);
    }

    #[test]
    fn test_archive_without_images() {
        let zip = build_zip(&[("notes.txt", b"nothing here")]);
        assert!(matches!(extract_images(&zip, LIMIT), Err(RemoteError::NoImages)));
    }

    #[test]
    fn test_garbage_is_archive_error() {
        assert!(matches!(
            extract_images(b"definitely not a zip", LIMIT),
            Err(RemoteError::Archive(_))
        ));
    }

    #[test]
    fn test_highly_compressed_entry_is_rejected() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file("page-1.jpg", options).unwrap();
        writer.write_all(&vec![0u8; 4 * 1024 * 1024]).unwrap();
        let zip = writer.finish().unwrap().into_inner();
        assert!(zip.len() < 64 * 1024);

        assert!(matches!(
            extract_images(&zip, LIMIT),
            Err(RemoteError::TooLarge { limit: LIMIT, .. })
        ));
    }

    #[test]
    fn test_limit_covers_all_pages() {
        let page = vec![7u8; 600];
        let zip = build_zip(&[("p-1.jpg", &page), ("p-2.jpg", &page)]);

        assert_eq!(extract_images(&zip, 1200).unwrap().len(), 2);
        assert!(matches!(
            extract_images(&zip, 1000),
            Err(RemoteError::TooLarge { size: 1200, limit: 1000 })
        ));
    }

    #[test]
    fn test_oversized_bare_jpeg() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert!(matches!(
            extract_images(&jpeg, 4),
            Err(RemoteError::TooLarge { size: 6, limit: 4 })
        ));
    }

    #[test]
    fn test_decode_accepts_raw_base64() {
        assert_eq!(decode_image("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_image("data:image/jpeg;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_image("data:image/jpeg;base64,***").is_err());
    }

    #[test]
    fn test_trailing_number() {
        assert_eq!(trailing_number("out/doc-0012.jpg"), Some(12));
        assert_eq!(trailing_number("7.jpeg"), Some(7));
        assert_eq!(trailing_number("cover.jpg"), None);
    }
}
