//! Pure Rust image backend on top of the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify (format + header size) | `image::ImageReader::with_guessed_format` + `into_dimensions` |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory_with_format` |
//! | Extract | `image::DynamicImage::crop_imm` on the natural-resolution raster |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, ExtractParams};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Formats whose decoders are compiled in, with their MIME types.
const DECODABLE_FORMATS: &[(ImageFormat, &str)] = &[
    (ImageFormat::Jpeg, "image/jpeg"),
    (ImageFormat::Png, "image/png"),
    (ImageFormat::Tiff, "image/tiff"),
    (ImageFormat::WebP, "image/webp"),
];

/// MIME type of the encoded payload.
pub const OUTPUT_MIME_TYPE: &str = "image/jpeg";

/// File extension of the encoded payload.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// MIME types the loader can actually decode.
pub fn supported_mime_types() -> Vec<&'static str> {
    DECODABLE_FORMATS
        .iter()
        .filter(|(fmt, _)| fmt.reading_enabled())
        .map(|(_, mime)| *mime)
        .collect()
}

/// MIME type for a decodable format, or `None` if its decoder is not compiled in.
pub fn mime_type_for(format: ImageFormat) -> Option<&'static str> {
    DECODABLE_FORMATS
        .iter()
        .find(|(fmt, _)| *fmt == format && fmt.reading_enabled())
        .map(|(_, mime)| *mime)
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<(ImageFormat, Dimensions), BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| BackendError::InvalidImage("unrecognised image data".into()))?;
        if mime_type_for(format).is_none() {
            return Err(BackendError::InvalidImage(format!(
                "unsupported image format: {format:?}"
            )));
        }
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::InvalidImage(format!("failed to read header: {e}")))?;
        Ok((format, Dimensions { width, height }))
    }

    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, BackendError> {
        image::load_from_memory_with_format(bytes, format)
            .map_err(|e| BackendError::InvalidImage(format!("failed to decode {format:?}: {e}")))
    }

    fn extract(
        &self,
        source: &DynamicImage,
        params: &ExtractParams,
    ) -> Result<DynamicImage, BackendError> {
        let r = params.source;
        let fits = r.x.checked_add(r.width).is_some_and(|right| right <= source.width())
            && r.y.checked_add(r.height).is_some_and(|bottom| bottom <= source.height());
        if !fits {
            return Err(BackendError::InvalidImage(format!(
                "crop {}x{}+{}+{} outside {}x{} bitmap",
                r.width,
                r.height,
                r.x,
                r.y,
                source.width(),
                source.height()
            )));
        }
        Ok(source.crop_imm(r.x, r.y, r.width, r.height))
    }

    fn encode(
        &self,
        raster: &DynamicImage,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError> {
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, params.quality.value() as u8);
        // JPEG has no alpha channel
        DynamicImage::ImageRgb8(raster.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{PixelRect, Quality};
    use crate::test_helpers::{jpeg_bytes, png_bytes, quadrant_image};

    #[test]
    fn supported_mime_types_match_decodable_formats() {
        let mimes = supported_mime_types();
        for expected in &["image/jpeg", "image/png", "image/tiff", "image/webp"] {
            assert!(mimes.contains(expected), "expected {expected} in supported types");
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let (format, dims) = RustBackend::new().identify(&jpeg_bytes(200, 150)).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_eq!(dims, Dimensions::new(200, 150));
    }

    #[test]
    fn identify_synthetic_png() {
        let (format, dims) = RustBackend::new().identify(&png_bytes(64, 48)).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(dims, Dimensions::new(64, 48));
    }

    #[test]
    fn identify_garbage_is_invalid_image() {
        let err = RustBackend::new()
            .identify(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidImage(_)));
    }

    #[test]
    fn decode_truncated_jpeg_is_invalid_image() {
        let bytes = jpeg_bytes(100, 100);
        let truncated = &bytes[..bytes.len() / 3];
        let err = RustBackend::new()
            .decode(truncated, ImageFormat::Jpeg)
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidImage(_)));
    }

    #[test]
    fn extract_takes_exact_rectangle() {
        // Left half red, right half blue
        let source = quadrant_image(200, 100);
        let params = ExtractParams {
            source: PixelRect {
                x: 100,
                y: 0,
                width: 100,
                height: 100,
            },
        };
        let out = RustBackend::new().extract(&source, &params).unwrap();
        assert_eq!((out.width(), out.height()), (100, 100));
        let px = out.to_rgb8().get_pixel(50, 50).0;
        assert_eq!(px, [0, 0, 255]);
    }

    #[test]
    fn extract_outside_bitmap_errors() {
        let source = quadrant_image(50, 50);
        let params = ExtractParams {
            source: PixelRect {
                x: 40,
                y: 0,
                width: 20,
                height: 10,
            },
        };
        assert!(RustBackend::new().extract(&source, &params).is_err());
    }

    #[test]
    fn encode_produces_decodable_jpeg() {
        let raster = quadrant_image(120, 80);
        let bytes = RustBackend::new()
            .encode(&raster, &EncodeParams::default())
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
    }

    #[test]
    fn encode_drops_alpha() {
        let raster = DynamicImage::new_rgba8(16, 16);
        let bytes = RustBackend::new()
            .encode(&raster, &EncodeParams::default())
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn lower_quality_produces_smaller_output() {
        let raster = DynamicImage::ImageRgb8(image::RgbImage::from_fn(128, 128, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        }));
        let backend = RustBackend::new();
        let high = backend
            .encode(&raster, &EncodeParams { quality: Quality::new(95) })
            .unwrap();
        let low = backend
            .encode(&raster, &EncodeParams { quality: Quality::new(20) })
            .unwrap();
        assert!(low.len() < high.len());
    }
}
