//! Source image loading.
//!
//! Turns user-selected bytes into a [`SourceImage`]: the decoded bitmap at
//! natural resolution plus the size it is displayed at in the editor. The
//! header is read first so oversize input is rejected before a full decode
//! allocates the raster.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::geometry::fit_display;
use super::rust_backend::mime_type_for;
use crate::cache::hash_bytes;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::sync::Arc;

/// Default decoded-pixel ceiling (about a 48 MP photo).
pub const DEFAULT_MAX_PIXELS: u64 = 48_000_000;

/// How large the image is rendered in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplaySize {
    /// Rendered at natural resolution.
    #[default]
    Natural,
    /// Rendered at an explicit size reported by the UI layer.
    Exact(Dimensions),
    /// Rendered inside a max box without upscaling.
    FitWithin { max_width: u32, max_height: u32 },
}

impl DisplaySize {
    fn resolve(self, natural: Dimensions) -> Dimensions {
        match self {
            Self::Natural => natural,
            Self::Exact(dims) => dims,
            Self::FitWithin {
                max_width,
                max_height,
            } => fit_display(natural, max_width, max_height),
        }
    }
}

/// Options for [`load_source`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// MIME type declared by whatever selected the file, if known.
    pub declared_mime: Option<String>,
    pub display: DisplaySize,
    /// Upper bound on `width * height` of the source.
    pub max_pixels: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            declared_mime: None,
            display: DisplaySize::Natural,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// A decoded source image. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Size the image is rendered at in the editor.
    pub display: Dimensions,
    /// True resolution of the decoded bitmap.
    pub natural: Dimensions,
    pub format: ImageFormat,
    pub mime_type: &'static str,
    /// SHA-256 of the selected bytes.
    pub fingerprint: String,
    raster: Arc<DynamicImage>,
}

impl SourceImage {
    pub fn raster(&self) -> &DynamicImage {
        &self.raster
    }

    /// Shared handle for work that may outlive a borrow of the session.
    pub(crate) fn shared_raster(&self) -> Arc<DynamicImage> {
        Arc::clone(&self.raster)
    }

    /// `(natural / display)` per axis.
    pub fn scale(&self) -> (f64, f64) {
        (
            f64::from(self.natural.width) / f64::from(self.display.width),
            f64::from(self.natural.height) / f64::from(self.display.height),
        )
    }
}

/// Decode user-selected bytes into a [`SourceImage`].
///
/// Fails with [`BackendError::InvalidImage`] for a non-`image/*` declared
/// type, unrecognised or undecodable data, oversize input, or a zero
/// display size.
pub fn load_source(
    backend: &impl ImageBackend,
    bytes: &[u8],
    options: &LoadOptions,
) -> Result<SourceImage, BackendError> {
    if let Some(mime) = options.declared_mime.as_deref()
        && !mime.trim().to_ascii_lowercase().starts_with("image/")
    {
        return Err(BackendError::InvalidImage(format!(
            "expected an image/* file, got {mime}"
        )));
    }

    let (format, header) = backend.identify(bytes)?;
    if header.pixels() > options.max_pixels {
        return Err(BackendError::InvalidImage(format!(
            "{}x{} exceeds the {} pixel limit",
            header.width, header.height, options.max_pixels
        )));
    }
    let mime_type = mime_type_for(format).ok_or_else(|| {
        BackendError::InvalidImage(format!("unsupported image format: {format:?}"))
    })?;

    let raster = backend.decode(bytes, format)?;
    let natural = Dimensions::new(raster.width(), raster.height());
    let display = options.display.resolve(natural);
    if natural.width == 0 || natural.height == 0 || display.width == 0 || display.height == 0 {
        return Err(BackendError::InvalidImage(format!(
            "zero-sized image (natural {}x{}, display {}x{})",
            natural.width, natural.height, display.width, display.height
        )));
    }

    log::debug!(
        "loaded {mime_type} source: natural {}x{}, display {}x{}",
        natural.width,
        natural.height,
        display.width,
        display.height
    );

    Ok(SourceImage {
        display,
        natural,
        format,
        mime_type,
        fingerprint: hash_bytes(bytes),
        raster: Arc::new(raster),
    })
}

/// Read a file and load it, declaring the MIME type implied by its extension.
pub fn load_source_file(
    backend: &impl ImageBackend,
    path: &Path,
    options: &LoadOptions,
) -> Result<SourceImage, BackendError> {
    let bytes = std::fs::read(path)?;
    let mut options = options.clone();
    if options.declared_mime.is_none() {
        options.declared_mime = ImageFormat::from_path(path)
            .ok()
            .and_then(mime_type_for)
            .map(str::to_string);
    }
    load_source(backend, &bytes, &options)
}
