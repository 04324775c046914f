//! Encoded payload builder.
//!
//! Compresses an extracted raster to JPEG and names it
//! `<prefix>-<unix-ms>.jpg`. No storage side effects happen here: the
//! resulting [`UploadPayload`] is handed to whatever uploads it.

use super::backend::{BackendError, ImageBackend};
use super::params::EncodeParams;
use super::rust_backend::{OUTPUT_EXTENSION, OUTPUT_MIME_TYPE};
use crate::cache::hash_bytes;
use crate::naming::payload_file_name;
use image::DynamicImage;
use std::time::{SystemTime, UNIX_EPOCH};

/// Encoded image ready for upload. Owned by the caller once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    /// Pixel size of the encoded image.
    pub width: u32,
    pub height: u32,
}

impl UploadPayload {
    /// SHA-256 of the encoded bytes.
    pub fn digest(&self) -> String {
        hash_bytes(&self.bytes)
    }
}

/// Encode `raster` and wrap it with its generated file name and MIME type.
///
/// Deterministic for a given raster, quality and timestamp.
pub fn build_payload(
    backend: &impl ImageBackend,
    raster: &DynamicImage,
    params: &EncodeParams,
    file_prefix: &str,
    timestamp_ms: u64,
) -> Result<UploadPayload, BackendError> {
    let bytes = backend.encode(raster, params)?;
    Ok(UploadPayload {
        bytes,
        file_name: payload_file_name(file_prefix, timestamp_ms, OUTPUT_EXTENSION),
        mime_type: OUTPUT_MIME_TYPE.to_string(),
        width: raster.width(),
        height: raster.height(),
    })
}

/// Milliseconds since the Unix epoch (0 if the clock is before it).
pub fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
