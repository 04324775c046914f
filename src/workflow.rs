//! Editing session: select → crop → commit → encode → save.
//!
//! [`EditSession`] owns the one loaded source, its [`CropManager`], the last
//! committed crop and a [`PayloadCache`]. It moves through
//!
//! ```text
//!            select_file                edit               commit
//! NoImage ───────────────▶ ImageLoaded ──────▶ Editing ◀──────────▶ Committed
//!    ▲                                          ▲   edit               │
//!    │                save ok / cancel          │  save failed         │
//!    └──────────────────────────────────────────┴──────────────────────┘
//! ```
//!
//! ## Encode jobs
//!
//! Extraction and encoding are the slow part. [`EditSession::prepare`] hands
//! out an [`EncodeJob`] that owns a shared handle to the raster and can run
//! anywhere; its result is fed back through [`EditSession::finish`]. Every
//! job carries the session generation and the cache key of the crop it was
//! built for. Selecting another file or cancelling bumps the generation, and
//! editing the crop changes the key, so results that arrive late are
//! rejected with [`WorkflowError::Stale`] instead of being applied.
//!
//! [`EditSession::save`] runs the whole sequence in place and then calls the
//! [`SaveHandler`] once with the finished payload.

use crate::cache::{PayloadCache, hash_extract_params};
use crate::imaging::geometry::plan_extraction;
use crate::imaging::{
    AspectRatio, BackendError, CommittedCrop, CropManager, CropRect, EncodeParams,
    ExtractParams, ImageBackend, LoadOptions, Quality, RegionUpdate, SourceImage, build_payload,
    load_source,
};
use crate::storage::StorageError;
use crate::types::DisplaySettings;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use crate::imaging::UploadPayload;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Imaging error: {0}")]
    Imaging(#[from] BackendError),
    #[error("Upload failed: {0}")]
    Upload(#[from] StorageError),
    #[error("No image loaded")]
    NoImage,
    #[error("Stale result discarded (generation {job}, current {current})")]
    Stale { job: u64, current: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    NoImage,
    ImageLoaded,
    Editing,
    Committed,
}

/// Receives the finished payload together with the display settings.
///
/// An `Err` leaves the session in `Editing` with its committed crop and
/// cached payload, so the save can be retried.
pub trait SaveHandler {
    fn save(&mut self, payload: &UploadPayload, display: DisplaySettings)
    -> Result<(), StorageError>;
}

impl<F> SaveHandler for F
where
    F: FnMut(&UploadPayload, DisplaySettings) -> Result<(), StorageError>,
{
    fn save(
        &mut self,
        payload: &UploadPayload,
        display: DisplaySettings,
    ) -> Result<(), StorageError> {
        self(payload, display)
    }
}

/// Knobs that stay fixed for the life of a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub quality: Quality,
    pub file_prefix: String,
    pub load: LoadOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            file_prefix: "image".to_string(),
            load: LoadOptions::default(),
        }
    }
}

/// Outcome of [`EditSession::prepare`].
#[derive(Debug)]
pub enum Prepared {
    /// The payload for this exact crop was already built.
    Ready(UploadPayload),
    /// The crop still has to be extracted and encoded.
    Pending(EncodeJob),
}

/// Extract + encode work detached from the session.
#[derive(Debug)]
pub struct EncodeJob {
    generation: u64,
    key: String,
    raster: Arc<DynamicImage>,
    extract: ExtractParams,
    encode: EncodeParams,
    file_prefix: String,
    timestamp_ms: u64,
}

impl EncodeJob {
    pub fn extract_params(&self) -> &ExtractParams {
        &self.extract
    }

    /// Cut and encode. Never touches the session.
    pub fn run(self, backend: &impl ImageBackend) -> EncodedPayload {
        let result = backend.extract(&self.raster, &self.extract).and_then(|cropped| {
            build_payload(
                backend,
                &cropped,
                &self.encode,
                &self.file_prefix,
                self.timestamp_ms,
            )
        });
        EncodedPayload {
            generation: self.generation,
            key: self.key,
            result,
        }
    }
}

/// Result of an [`EncodeJob`], to be handed back to [`EditSession::finish`].
#[derive(Debug)]
pub struct EncodedPayload {
    generation: u64,
    key: String,
    result: Result<UploadPayload, BackendError>,
}

pub struct EditSession<B: ImageBackend> {
    backend: B,
    settings: SessionSettings,
    state: EditorState,
    source: Option<SourceImage>,
    manager: Option<CropManager>,
    committed: Option<CommittedCrop>,
    cache: PayloadCache,
    generation: u64,
}

impl<B: ImageBackend> EditSession<B> {
    pub fn new(backend: B, settings: SessionSettings) -> Self {
        Self {
            backend,
            settings,
            state: EditorState::NoImage,
            source: None,
            manager: None,
            committed: None,
            cache: PayloadCache::new(),
            generation: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn crop(&self) -> Option<&CropManager> {
        self.manager.as_ref()
    }

    pub fn committed(&self) -> Option<CommittedCrop> {
        self.committed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cached_payloads(&self) -> usize {
        self.cache.len()
    }

    /// Replace the loaded source with freshly selected bytes.
    ///
    /// Whatever was loaded before is dropped first, so a failed load leaves
    /// the session in `NoImage`.
    pub fn select_file(
        &mut self,
        bytes: &[u8],
        declared_mime: Option<&str>,
    ) -> Result<&SourceImage, WorkflowError> {
        let mut options = self.settings.load.clone();
        if let Some(mime) = declared_mime {
            options.declared_mime = Some(mime.to_string());
        }
        self.reset();
        let loaded = load_source(&self.backend, bytes, &options);
        self.install(loaded)
    }

    /// [`select_file`](Self::select_file) for a file on disk, declaring the
    /// MIME type implied by its extension.
    pub fn select_path(&mut self, path: &Path) -> Result<&SourceImage, WorkflowError> {
        self.reset();
        let loaded = crate::imaging::load_source_file(&self.backend, path, &self.settings.load);
        self.install(loaded)
    }

    fn install(
        &mut self,
        loaded: Result<SourceImage, BackendError>,
    ) -> Result<&SourceImage, WorkflowError> {
        let source = loaded?;
        log::debug!(
            "session generation {}: source {} loaded",
            self.generation,
            &source.fingerprint[..12]
        );
        self.manager = Some(CropManager::new(source.display));
        self.state = EditorState::ImageLoaded;
        Ok(self.source.insert(source))
    }

    /// Drop the source and invalidate any job in flight.
    pub fn cancel(&mut self) {
        self.reset();
        log::debug!("session generation {}: cancelled", self.generation);
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.source = None;
        self.manager = None;
        self.committed = None;
        self.cache.clear();
        self.state = EditorState::NoImage;
    }

    fn manager_mut(&mut self) -> Result<&mut CropManager, WorkflowError> {
        self.manager.as_mut().ok_or(WorkflowError::NoImage)
    }

    /// Switch the ratio constraint; the region is re-centred.
    pub fn set_aspect_ratio(&mut self, aspect: AspectRatio) -> Result<CropRect, WorkflowError> {
        let manager = self.manager_mut()?;
        manager.set_aspect_ratio(aspect);
        let region = manager.region_pixels();
        self.mark_edited();
        Ok(region)
    }

    /// Apply a drag/resize step. Returns the region in display pixels.
    pub fn update_region(&mut self, update: RegionUpdate) -> Result<CropRect, WorkflowError> {
        let region = self.manager_mut()?.update_region(update);
        self.mark_edited();
        Ok(region)
    }

    fn mark_edited(&mut self) {
        self.committed = None;
        self.state = EditorState::Editing;
    }

    pub fn commit(&mut self) -> Result<CommittedCrop, WorkflowError> {
        let crop = self.manager.as_ref().ok_or(WorkflowError::NoImage)?.commit();
        self.committed = Some(crop);
        self.state = EditorState::Committed;
        Ok(crop)
    }

    fn current_key(&self) -> Option<String> {
        let source = self.source.as_ref()?;
        let crop = self.committed.as_ref()?;
        Some(hash_extract_params(
            &source.fingerprint,
            crop,
            self.settings.quality,
        ))
    }

    /// Resolve the payload for the committed crop, committing the current
    /// region first if nothing is committed yet.
    pub fn prepare(&mut self, timestamp_ms: u64) -> Result<Prepared, WorkflowError> {
        if self.source.is_none() {
            return Err(WorkflowError::NoImage);
        }
        if self.committed.is_none() {
            self.commit()?;
        }
        let (Some(source), Some(crop), Some(key)) =
            (self.source.as_ref(), self.committed, self.current_key())
        else {
            return Err(WorkflowError::NoImage);
        };

        if let Some(payload) = self.cache.find(&key) {
            log::debug!("reusing cached payload {}", payload.file_name);
            return Ok(Prepared::Ready(payload.clone()));
        }

        let extract = match plan_extraction(&crop, source.display, source.natural) {
            Ok(params) => params,
            Err(e) => {
                self.state = EditorState::Editing;
                return Err(e.into());
            }
        };

        Ok(Prepared::Pending(EncodeJob {
            generation: self.generation,
            key,
            raster: source.shared_raster(),
            extract,
            encode: EncodeParams {
                quality: self.settings.quality,
            },
            file_prefix: self.settings.file_prefix.clone(),
            timestamp_ms,
        }))
    }

    /// Apply a finished job. Results for an older generation or a crop that
    /// is no longer committed are discarded.
    pub fn finish(&mut self, encoded: EncodedPayload) -> Result<UploadPayload, WorkflowError> {
        if encoded.generation != self.generation
            || self.current_key().as_deref() != Some(encoded.key.as_str())
        {
            log::warn!(
                "discarding stale encode result from generation {}",
                encoded.generation
            );
            return Err(WorkflowError::Stale {
                job: encoded.generation,
                current: self.generation,
            });
        }
        match encoded.result {
            Ok(payload) => {
                self.cache.insert(encoded.key, payload.clone());
                Ok(payload)
            }
            Err(e) => {
                self.state = EditorState::Editing;
                Err(e.into())
            }
        }
    }

    /// Build the payload for the committed crop and hand it to `handler`.
    ///
    /// On success the source is released and the session returns to
    /// `NoImage`. On failure the session is `Editing` with the committed
    /// crop and any built payload kept for a retry.
    pub fn save(
        &mut self,
        handler: &mut impl SaveHandler,
        display: DisplaySettings,
        timestamp_ms: u64,
    ) -> Result<UploadPayload, WorkflowError> {
        let payload = match self.prepare(timestamp_ms)? {
            Prepared::Ready(payload) => payload,
            Prepared::Pending(job) => {
                let encoded = job.run(&self.backend);
                self.finish(encoded)?
            }
        };

        if let Err(e) = handler.save(&payload, display) {
            self.state = EditorState::Editing;
            log::debug!("save of {} failed, kept for retry: {e}", payload.file_name);
            return Err(e.into());
        }

        log::debug!(
            "saved {} ({}x{}, {} bytes)",
            payload.file_name,
            payload.width,
            payload.height,
            payload.bytes.len()
        );
        self.reset();
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{RecordedOp, RecordingBackend};
    use crate::imaging::geometry::RATIO_TOLERANCE;
    use crate::imaging::{Dimensions, DisplaySize, RustBackend};
    use crate::test_helpers::{RecordingHandler, jpeg_bytes};
    use crate::types::ObjectFit;

    fn session() -> EditSession<RecordingBackend> {
        EditSession::new(RecordingBackend::new(), SessionSettings::default())
    }

    fn loaded(w: u32, h: u32) -> EditSession<RecordingBackend> {
        let mut s = session();
        s.select_file(&jpeg_bytes(w, h), Some("image/jpeg")).unwrap();
        s
    }

    fn count(s: &EditSession<RecordingBackend>, pred: fn(&RecordedOp) -> bool) -> usize {
        s.backend().count(pred)
    }

    #[test]
    fn state_machine_transitions() {
        let mut s = session();
        assert_eq!(s.state(), EditorState::NoImage);

        s.select_file(&jpeg_bytes(100, 50), None).unwrap();
        assert_eq!(s.state(), EditorState::ImageLoaded);

        s.set_aspect_ratio(AspectRatio::SQUARE).unwrap();
        assert_eq!(s.state(), EditorState::Editing);

        s.commit().unwrap();
        assert_eq!(s.state(), EditorState::Committed);

        s.update_region(RegionUpdate::pixels().with_position(10.0, 0.0))
            .unwrap();
        assert_eq!(s.state(), EditorState::Editing);
        assert!(s.committed().is_none());
    }

    #[test]
    fn edits_without_image_fail() {
        let mut s = session();
        assert!(matches!(
            s.set_aspect_ratio(AspectRatio::SQUARE),
            Err(WorkflowError::NoImage)
        ));
        assert!(matches!(s.commit(), Err(WorkflowError::NoImage)));
        let mut handler = RecordingHandler::new();
        assert!(matches!(
            s.save(&mut handler, DisplaySettings::default(), 1),
            Err(WorkflowError::NoImage)
        ));
        assert!(handler.calls.is_empty());
    }

    #[test]
    fn invalid_file_leaves_no_image() {
        let mut s = loaded(40, 40);
        let err = s.select_file(b"not an image", Some("image/png")).unwrap_err();
        assert!(matches!(err, WorkflowError::Imaging(BackendError::InvalidImage(_))));
        assert_eq!(s.state(), EditorState::NoImage);
        assert!(s.source().is_none());
    }

    #[test]
    fn save_uploads_once_and_resets() {
        let mut s = loaded(200, 100);
        s.set_aspect_ratio(AspectRatio::SQUARE).unwrap();
        s.commit().unwrap();

        let mut handler = RecordingHandler::new();
        let display = DisplaySettings {
            object_fit: ObjectFit::Contain,
        };
        let payload = s.save(&mut handler, display, 1_700_000_000_000).unwrap();

        assert_eq!(payload.file_name, "image-1700000000000.jpg");
        assert_eq!((payload.width, payload.height), (100, 100));
        assert_eq!(handler.calls.len(), 1);
        assert_eq!(handler.calls[0].display, display);
        assert_eq!(handler.calls[0].byte_len, payload.bytes.len());
        assert_eq!(s.state(), EditorState::NoImage);
        assert!(s.source().is_none());
    }

    #[test]
    fn save_without_commit_uses_current_region() {
        let mut s = loaded(64, 48);
        let mut handler = RecordingHandler::new();
        let payload = s.save(&mut handler, DisplaySettings::default(), 5).unwrap();
        assert_eq!((payload.width, payload.height), (64, 48));
    }

    #[test]
    fn empty_crop_never_reaches_handler() {
        let mut s = loaded(100, 100);
        s.update_region(RegionUpdate::pixels().with_width(0.0)).unwrap();
        s.commit().unwrap();

        let mut handler = RecordingHandler::new();
        let err = s
            .save(&mut handler, DisplaySettings::default(), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Imaging(BackendError::EmptyCrop { .. })
        ));
        assert!(handler.calls.is_empty());
        assert_eq!(s.state(), EditorState::Editing);
        assert!(s.source().is_some());
        assert_eq!(count(&s, |op| matches!(op, RecordedOp::Extract { .. })), 0);
    }

    #[test]
    fn retry_after_failed_save_reuses_payload() {
        let mut s = loaded(300, 200);
        s.set_aspect_ratio(AspectRatio::LANDSCAPE).unwrap();
        let committed = s.commit().unwrap();

        let mut handler = RecordingHandler::failing(1);
        let err = s
            .save(&mut handler, DisplaySettings::default(), 111)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Upload(StorageError::Rejected(_))));
        assert_eq!(s.state(), EditorState::Editing);
        assert_eq!(s.committed(), Some(committed));
        assert_eq!(s.cached_payloads(), 1);

        // A different timestamp on retry must not produce a new payload
        let payload = s.save(&mut handler, DisplaySettings::default(), 222).unwrap();
        assert_eq!(payload.file_name, "image-111.jpg");
        assert_eq!(handler.calls.len(), 2);
        assert_eq!(handler.calls[0].file_name, handler.calls[1].file_name);

        assert_eq!(count(&s, |op| matches!(op, RecordedOp::Decode(_))), 1);
        assert_eq!(count(&s, |op| matches!(op, RecordedOp::Extract { .. })), 1);
        assert_eq!(count(&s, |op| matches!(op, RecordedOp::Encode { .. })), 1);
    }

    #[test]
    fn encode_failure_returns_to_editing() {
        let mut s = EditSession::new(
            RecordingBackend::failing_encode("out of memory"),
            SessionSettings::default(),
        );
        s.select_file(&jpeg_bytes(20, 20), None).unwrap();
        s.commit().unwrap();

        let mut handler = RecordingHandler::new();
        let err = s
            .save(&mut handler, DisplaySettings::default(), 1)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Imaging(BackendError::Encode(_))));
        assert_eq!(s.state(), EditorState::Editing);
        assert!(handler.calls.is_empty());
    }

    #[test]
    fn result_for_previous_file_is_stale() {
        let mut s = loaded(80, 80);
        s.commit().unwrap();
        let Prepared::Pending(job) = s.prepare(1).unwrap() else {
            panic!("expected a pending job");
        };

        s.select_file(&jpeg_bytes(90, 90), None).unwrap();
        s.commit().unwrap();

        let encoded = job.run(&RustBackend::new());
        assert!(matches!(s.finish(encoded), Err(WorkflowError::Stale { .. })));
        assert_eq!(s.cached_payloads(), 0);
    }

    #[test]
    fn result_for_previous_crop_is_stale() {
        let mut s = loaded(80, 80);
        s.commit().unwrap();
        let Prepared::Pending(job) = s.prepare(1).unwrap() else {
            panic!("expected a pending job");
        };

        s.set_aspect_ratio(AspectRatio::PORTRAIT).unwrap();
        s.commit().unwrap();

        let encoded = job.run(&RustBackend::new());
        assert!(matches!(s.finish(encoded), Err(WorkflowError::Stale { .. })));
    }

    #[test]
    fn result_after_cancel_is_stale() {
        let mut s = loaded(80, 80);
        s.commit().unwrap();
        let Prepared::Pending(job) = s.prepare(1).unwrap() else {
            panic!("expected a pending job");
        };
        s.cancel();
        assert_eq!(s.state(), EditorState::NoImage);

        let encoded = job.run(&RustBackend::new());
        assert!(matches!(s.finish(encoded), Err(WorkflowError::Stale { .. })));
    }

    #[test]
    fn finished_job_is_cached() {
        let mut s = loaded(80, 60);
        s.commit().unwrap();
        let Prepared::Pending(job) = s.prepare(9).unwrap() else {
            panic!("expected a pending job");
        };
        let encoded = job.run(s.backend());
        let payload = s.finish(encoded).unwrap();
        assert_eq!((payload.width, payload.height), (80, 60));

        match s.prepare(10).unwrap() {
            Prepared::Ready(cached) => assert_eq!(cached, payload),
            Prepared::Pending(_) => panic!("expected the cached payload"),
        }
    }

    #[test]
    fn extraction_scales_display_crop_to_natural() {
        let mut s = EditSession::new(
            RecordingBackend::new(),
            SessionSettings {
                load: LoadOptions {
                    display: DisplaySize::Exact(Dimensions::new(500, 250)),
                    ..LoadOptions::default()
                },
                ..SessionSettings::default()
            },
        );
        s.select_file(&jpeg_bytes(2000, 1000), None).unwrap();
        s.update_region(
            RegionUpdate::pixels()
                .with_position(100.0, 50.0)
                .with_width(100.0)
                .with_height(50.0),
        )
        .unwrap();
        s.commit().unwrap();

        let mut handler = RecordingHandler::new();
        let payload = s.save(&mut handler, DisplaySettings::default(), 1).unwrap();
        assert_eq!((payload.width, payload.height), (400, 200));
        assert!(s.backend().get_operations().contains(&RecordedOp::Extract {
            x: 400,
            y: 200,
            width: 400,
            height: 200
        }));
    }

    #[test]
    fn landscape_crop_of_1200x800_end_to_end() {
        let mut s = loaded(1200, 800);
        let centred = s.set_aspect_ratio(AspectRatio::LANDSCAPE).unwrap();
        assert!((centred.ratio() - 16.0 / 9.0).abs() < RATIO_TOLERANCE);

        s.update_region(RegionUpdate::pixels().with_position(centred.x + 40.0, centred.y - 20.0))
            .unwrap();
        s.commit().unwrap();

        let mut saved = Vec::new();
        let mut handler = |payload: &UploadPayload, _display: DisplaySettings| {
            saved.push(payload.clone());
            Ok::<(), StorageError>(())
        };
        let payload = s.save(&mut handler, DisplaySettings::default(), 1).unwrap();

        assert_eq!(saved.len(), 1);
        assert!(payload.width <= 1200);
        let ratio = f64::from(payload.width) / f64::from(payload.height);
        assert!((ratio - 16.0 / 9.0).abs() < 0.01, "ratio {ratio}");
        let decoded = image::load_from_memory(&payload.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (payload.width, payload.height));
    }
}
