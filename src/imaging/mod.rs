//! Image processing — the crop-to-upload core.
//!
//! | Stage | Module | Crate / function |
//! |---|---|---|
//! | **Load** | [`loader`] | `image::ImageReader` (header), `image::load_from_memory_with_format` |
//! | **Crop state** | [`crop`] | pure geometry |
//! | **Extract** | [`geometry::plan_extraction`] + [`ImageBackend::extract`] | `DynamicImage::crop_imm` |
//! | **Encode** | [`encode`] | `JpegEncoder` at quality 95 |
//!
//! The module is split into:
//! - **Geometry**: pure functions for regions, ratios and scale mapping (unit testable)
//! - **Parameters**: data structures describing extract/encode operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Stages**: loader, crop manager and payload builder built on the two above

pub mod backend;
pub mod crop;
pub mod encode;
pub mod geometry;
pub mod loader;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use crop::CropManager;
pub use encode::{UploadPayload, build_payload, unix_millis_now};
pub use geometry::{AspectRatio, CommittedCrop, CropRect, CropUnit, RegionUpdate};
pub use loader::{DisplaySize, LoadOptions, SourceImage, load_source, load_source_file};
pub use params::{EncodeParams, ExtractParams, PixelRect, Quality};
pub use rust_backend::RustBackend;
