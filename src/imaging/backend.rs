//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the crop pipeline
//! needs: identify, decode, extract and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests swap in a recording wrapper to count how often each
//! operation runs.

use super::params::{EncodeParams, ExtractParams};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Empty crop: {width}x{height} has no area")]
    EmptyCrop { width: f64, height: f64 },
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image (natural or displayed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_f64(self) -> (f64, f64) {
        (f64::from(self.width), f64::from(self.height))
    }

    pub fn pixels(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all four operations so the loader, the
/// session and the encode jobs stay backend-agnostic.
pub trait ImageBackend {
    /// Sniff the format and read dimensions from the header only.
    fn identify(&self, bytes: &[u8]) -> Result<(ImageFormat, Dimensions), BackendError>;

    /// Fully decode the bytes into a raster.
    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, BackendError>;

    /// Cut the source rectangle out of a natural-resolution raster.
    fn extract(
        &self,
        source: &DynamicImage,
        params: &ExtractParams,
    ) -> Result<DynamicImage, BackendError>;

    /// Compress a raster into JPEG bytes.
    fn encode(&self, raster: &DynamicImage, params: &EncodeParams)
    -> Result<Vec<u8>, BackendError>;
}
