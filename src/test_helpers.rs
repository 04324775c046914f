//! Shared test utilities for the folio-crop test suite.
//!
//! Synthetic image builders (encoded bytes and rasters) and a save handler
//! that records what it was given.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let bytes = jpeg_bytes(1200, 800);
//! let mut handler = RecordingHandler::failing(1);
//! ```

use crate::storage::StorageError;
use crate::types::DisplaySettings;
use crate::workflow::{SaveHandler, UploadPayload};
use image::{DynamicImage, ImageEncoder, Rgb, RgbImage};

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// A JPEG of the given size, encoded in memory.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// A PNG of the given size, encoded in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Raster whose left half is pure red and right half pure blue.
pub fn quadrant_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    }))
}

// =========================================================================
// Save handler
// =========================================================================

/// One call received by a [`RecordingHandler`].
#[derive(Debug, Clone)]
pub struct SaveCall {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub byte_len: usize,
    pub display: DisplaySettings,
}

/// Save handler that records calls and rejects the first `failures` of them.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub calls: Vec<SaveCall>,
    failures: usize,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            calls: Vec::new(),
            failures,
        }
    }
}

impl SaveHandler for RecordingHandler {
    fn save(
        &mut self,
        payload: &UploadPayload,
        display: DisplaySettings,
    ) -> Result<(), StorageError> {
        self.calls.push(SaveCall {
            file_name: payload.file_name.clone(),
            width: payload.width,
            height: payload.height,
            byte_len: payload.bytes.len(),
            display,
        });
        if self.failures > 0 {
            self.failures -= 1;
            return Err(StorageError::Rejected("storage unavailable".into()));
        }
        Ok(())
    }
}
