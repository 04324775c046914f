//! Parameter types for image operations.
//!
//! These structs describe *what* to cut and encode, not *how*. They sit between
//! the pure geometry in [`geometry`](super::geometry), which decides which
//! pixels to keep, and the [`backend`](super::backend), which does the pixel
//! work. Swapping the backend (e.g. for a recording one in tests) leaves the
//! planning untouched.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`PixelRect`] — An integer rectangle in natural-resolution source pixels.
//! - [`ExtractParams`] — Which source rectangle to cut; the output raster has its size.
//! - [`EncodeParams`] — How to compress the extracted raster.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    /// 0.95 of maximum, the canvas export quality the dashboard always used.
    fn default() -> Self {
        Self(95)
    }
}

/// Rectangle in natural-resolution source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Parameters for cutting a rectangle out of the natural-resolution raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractParams {
    /// Source rectangle; the extracted raster is exactly this size.
    pub source: PixelRect,
}

impl ExtractParams {
    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.source.width, self.source.height)
    }
}

/// Parameters for compressing an extracted raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeParams {
    pub quality: Quality,
}
