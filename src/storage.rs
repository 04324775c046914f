//! Object storage collaborators.
//!
//! The crop pipeline never talks to storage directly. It hands a finished
//! [`UploadPayload`] to a [`SaveHandler`]; the production handler,
//! [`AssetSaver`], uploads it through an [`ObjectStore`] and removes the
//! asset it replaces.
//!
//! ## Buckets
//!
//! Bucket names are configuration ([`StorageConfig`](crate::config::StorageConfig)),
//! resolved by the caller and passed to every call:
//!
//! | [`Bucket`] | Default name |
//! |---|---|
//! | `profile` | `profile-images` |
//! | `project` | `project-images` |
//! | `logo` | `company-logos` |
//! | `resume` | `resumes` |
//!
//! ## Local store layout
//!
//! ```text
//! <root>/
//! ├── profile-images/
//! │   └── profile-1739912345678.jpg
//! └── project-images/
//!     └── image-1739912399999.jpg
//! ```
//!
//! Public URLs are `<public_base_url>/<bucket>/<key>`.

use crate::imaging::UploadPayload;
use crate::naming::{is_placeholder_url, is_valid_object_key, object_key_from_url};
use crate::types::{AssetRecord, DisplaySettings};
use crate::workflow::SaveHandler;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("Storage rejected the request: {0}")]
    Rejected(String),
}

/// Logical bucket an asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Profile,
    Project,
    Logo,
    Resume,
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "profile" | "profile-images" => Ok(Self::Profile),
            "project" | "project-images" => Ok(Self::Project),
            "logo" | "company-logos" => Ok(Self::Logo),
            "resume" | "resumes" => Ok(Self::Resume),
            other => Err(format!(
                "unknown bucket '{other}' (expected profile, project, logo or resume)"
            )),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Profile => "profile",
            Self::Project => "project",
            Self::Logo => "logo",
            Self::Resume => "resume",
        })
    }
}

/// Key-addressed binary storage returning public URLs.
pub trait ObjectStore {
    /// Store `payload` under `bucket/key`, overwriting any existing object.
    /// Returns the object's public URL.
    fn upload(&self, bucket: &str, key: &str, payload: &UploadPayload)
    -> Result<String, StorageError>;

    /// Remove `bucket/key`. Removing a missing object succeeds.
    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Filesystem-backed [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn from_config(config: &crate::config::StorageConfig) -> Self {
        Self::new(&config.root, &config.public_base_url)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk path of `bucket/key`, validating both segments.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        for segment in [bucket, key] {
            if !is_valid_object_key(segment) {
                return Err(StorageError::InvalidKey(segment.to_string()));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

impl ObjectStore for LocalStore {
    fn upload(
        &self,
        bucket: &str,
        key: &str,
        payload: &UploadPayload,
    ) -> Result<String, StorageError> {
        let path = self.object_path(bucket, key)?;
        let dir = self.root.join(bucket);
        std::fs::create_dir_all(&dir)?;

        // Write-then-rename so readers never see a partial object
        let partial = dir.join(format!(".{key}.partial"));
        std::fs::write(&partial, &payload.bytes)?;
        if let Err(e) = std::fs::rename(&partial, &path) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }

        log::info!(
            "stored {bucket}/{key} ({} bytes, sha256 {})",
            payload.bytes.len(),
            payload.digest()
        );
        Ok(self.public_url(bucket, key))
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                log::info!("deleted {bucket}/{key}");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{bucket}/{key}", self.public_base_url.trim_end_matches('/'))
    }
}

/// Save handler that uploads to a bucket and replaces the previous asset.
///
/// After a successful upload the previously stored asset is deleted, unless
/// it is a placeholder URL or has the same key. Delete failures are logged
/// and otherwise ignored: the new asset is already live.
pub struct AssetSaver<'a, S: ObjectStore> {
    store: &'a S,
    bucket: String,
    placeholder_hosts: Vec<String>,
    current: Option<AssetRecord>,
}

impl<'a, S: ObjectStore> AssetSaver<'a, S> {
    pub fn new(
        store: &'a S,
        bucket: impl Into<String>,
        placeholder_hosts: &[String],
        current: Option<AssetRecord>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            placeholder_hosts: placeholder_hosts.to_vec(),
            current,
        }
    }

    /// The asset currently referenced (the new one after a successful save).
    pub fn current(&self) -> Option<&AssetRecord> {
        self.current.as_ref()
    }

    pub fn into_current(self) -> Option<AssetRecord> {
        self.current
    }

    fn remove_replaced(&self, old: &AssetRecord, new_key: &str) {
        if is_placeholder_url(&old.url, &self.placeholder_hosts) {
            return;
        }
        let key = if is_valid_object_key(&old.key) {
            Some(old.key.as_str())
        } else {
            object_key_from_url(&old.url)
        };
        let Some(key) = key else {
            return;
        };
        let bucket = if old.bucket.is_empty() {
            self.bucket.as_str()
        } else {
            old.bucket.as_str()
        };
        if bucket == self.bucket && key == new_key {
            return;
        }
        if let Err(e) = self.store.delete(bucket, key) {
            log::warn!("failed to delete replaced asset {bucket}/{key}: {e}");
        }
    }
}

impl<S: ObjectStore> SaveHandler for AssetSaver<'_, S> {
    fn save(
        &mut self,
        payload: &UploadPayload,
        display: DisplaySettings,
    ) -> Result<(), StorageError> {
        let url = self
            .store
            .upload(&self.bucket, &payload.file_name, payload)?;

        if let Some(old) = self.current.take() {
            self.remove_replaced(&old, &payload.file_name);
        }

        self.current = Some(AssetRecord {
            url,
            bucket: self.bucket.clone(),
            key: payload.file_name.clone(),
            display,
        });
        Ok(())
    }
}
