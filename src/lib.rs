//! # folio-crop
//!
//! Aspect-constrained crop-to-upload pipeline for portfolio images. A
//! dashboard owner selects a local image, frames it with an optional fixed
//! aspect ratio, and the committed region is cut from the full-resolution
//! bitmap, encoded as JPEG and stored under a public URL together with how it
//! should fill its frame.
//!
//! # Architecture: Crop-to-Upload Pipeline
//!
//! ```text
//! 1. Load      bytes        →  SourceImage      (decode, natural + display size)
//! 2. Crop      SourceImage  →  CommittedCrop    (ratio, centring, clamping)
//! 3. Extract   crop         →  raster           (display px → natural px)
//! 4. Encode    raster       →  UploadPayload    (JPEG q95, <prefix>-<ms>.jpg)
//! 5. Save      payload      →  AssetRecord      (upload, replace old asset)
//! ```
//!
//! Stages 1–4 are pure with respect to storage: nothing leaves the process
//! until the [`workflow::SaveHandler`] is called with a finished payload.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Loader, crop state manager, extraction geometry, JPEG encoding, backend trait |
//! | [`workflow`] | Editing session: state machine, encode jobs with stale-result rejection, save callback |
//! | [`cache`] | Content-addressed payload cache so a failed save can be retried without re-encoding |
//! | [`storage`] | `ObjectStore` trait, filesystem store, and the asset-replacing save handler |
//! | [`render`] | Maud rendering of stored assets with their object-fit |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`types`] | Persisted types: `AssetRecord`, `DisplaySettings`, `ObjectFit` |
//! | [`naming`] | Upload file names and object keys |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Percent Regions, Pixel Commits
//!
//! The crop manager stores its region in percent of the displayed image, so
//! the selection survives the editor being laid out at another size. Commit
//! converts it to display pixels, and extraction scales those by
//! `natural / display` per axis. Cutting always reads the natural-resolution
//! raster; the downscaled preview is never the source of output pixels.
//!
//! ## Generation Tokens Instead of Locks
//!
//! The session is single-threaded. Slow work is handed out as an
//! [`workflow::EncodeJob`] stamped with the session generation and the crop it
//! was built for, and results that no longer match are discarded. A new file
//! selection therefore never races with a late encode of the previous one.
//!
//! ## Storage Behind a Trait
//!
//! Upload and delete are collaborators, not globals: bucket names come from
//! config and the store is passed in. The bundled [`storage::LocalStore`]
//! writes `<root>/<bucket>/<key>`; any other backend implements
//! [`storage::ObjectStore`].

pub mod cache;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod render;
pub mod storage;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;
