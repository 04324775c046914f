//! Encoded payload cache for save retries.
//!
//! Extraction plus JPEG encoding is the only expensive step between commit
//! and upload. When the save callback fails (storage down, network blip) the
//! user retries with the same crop, and this cache lets the session hand back
//! the payload it already built instead of cutting and encoding again.
//!
//! # Cache keys
//!
//! The cache is **content-addressed**, in the same spirit as an incremental
//! build cache:
//!
//! - **source fingerprint**: SHA-256 of the selected file's bytes, computed
//!   once at load time ([`hash_bytes`]).
//! - **params hash**: SHA-256 over the fingerprint, the committed crop's
//!   exact `f64` bits and the encode quality ([`hash_extract_params`]).
//!
//! Any change to the crop, the quality or the source gives a new key, so a
//! stale payload can never be served for a different selection. The file
//! name is *not* part of the key: a retry reuses the original name.

use crate::imaging::{CommittedCrop, Quality, UploadPayload};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// In-memory map from params hash to a finished payload.
#[derive(Debug, Default)]
pub struct PayloadCache {
    entries: HashMap<String, UploadPayload>,
}

impl PayloadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, key: &str) -> Option<&UploadPayload> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, payload: UploadPayload) {
        self.entries.insert(key, payload);
    }

    /// Drop everything, e.g. when a new source is selected.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SHA-256 of a byte slice, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of everything that determines an encoded payload.
pub fn hash_extract_params(fingerprint: &str, crop: &CommittedCrop, quality: Quality) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"extract\0");
    hasher.update(fingerprint.as_bytes());
    hasher.update(b"\0");
    for v in [crop.x, crop.y, crop.width, crop.height] {
        hasher.update(v.to_bits().to_le_bytes());
    }
    hasher.update(quality.value().to_le_bytes());
    format!("{:x}", hasher.finalize())
}
