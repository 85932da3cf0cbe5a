//! Paper diary scans: validation, JPEG normalization and storage paths.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::entry::Mood;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// `image/jpg` is not registered but browsers still send it.
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

const MAX_WIDTH: u32 = 1920;
const MAX_HEIGHT: u32 = 2400;
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadError {
    #[error("Image file is required")]
    Missing,

    #[error("Image must be 10MB or smaller (current: {:.2}MB)", mebibytes(.0))]
    TooLarge(usize),

    #[error("Unsupported image type '{0}': allowed types are JPEG, PNG, WebP")]
    UnsupportedType(String),

    #[error("Image could not be decoded: {0}")]
    Undecodable(String),
}

fn mebibytes(bytes: &usize) -> f64 {
    *bytes as f64 / 1024.0 / 1024.0
}

/// A scanned page as received from the client.
#[derive(Debug, Clone)]
pub struct PaperDiaryUpload {
    pub date: NaiveDate,
    pub mood: Mood,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl PaperDiaryUpload {
    /// Size and type checks. Runs before anything is decoded or stored.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::Missing);
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge(self.bytes.len()));
        }
        let mime = self.mime_type.trim().to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(UploadError::UnsupportedType(self.mime_type.clone()));
        }
        Ok(())
    }
}

/// Re-encodes any accepted image as a JPEG that fits within 1920x2400.
pub fn normalize_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, UploadError> {
    let img = image::load_from_memory(bytes).map_err(|e| UploadError::Undecodable(e.to_string()))?;

    let img = if img.width() > MAX_WIDTH || img.height() > MAX_HEIGHT {
        img.resize(MAX_WIDTH, MAX_HEIGHT, FilterType::Triangle)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| UploadError::Undecodable(e.to_string()))?;
    Ok(out.into_inner())
}

/// Runs [`normalize_to_jpeg`] on the blocking pool; decoding a 10MB scan
/// would otherwise stall a runtime worker.
pub async fn normalize_off_runtime(bytes: Vec<u8>) -> AppResult<Vec<u8>> {
    let jpeg = tokio::task::spawn_blocking(move || normalize_to_jpeg(&bytes))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;
    Ok(jpeg)
}

/// `<user>/<date>_<millis>.jpg`, unique across repeated uploads for a date.
pub fn object_path(user_id: Uuid, date: NaiveDate, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}_{}.jpg",
        user_id,
        date.format("%Y-%m-%d"),
        now.timestamp_millis()
    )
}

/// Recovers the object path of a stored image from its public URL.
pub fn object_path_from_url(user_id: Uuid, url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let file_name = parsed.path_segments()?.last()?;
    if file_name.is_empty() {
        return None;
    }
    Some(format!("{}/{}", user_id, file_name))
}

/// Inline form used when there is no object storage to hold the image.
pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg))
}
