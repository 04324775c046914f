//! Tool configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` in the config directory is merged on
//! top of them table by table, so it only needs the keys it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! root = "storage"                                 # LocalStore root directory
//! public_base_url = "http://localhost:8000/storage"
//! placeholder_hosts = ["placehold.co"]             # Never deleted on replace
//!
//! [storage.buckets]
//! profile_images = "profile-images"
//! project_images = "project-images"
//! company_logos = "company-logos"
//! resumes = "resumes"
//!
//! [upload]
//! quality = 95                  # JPEG quality (1-100)
//! file_prefix = "image"         # Uploaded as <prefix>-<unix-ms>.jpg
//! max_source_pixels = 48000000  # Larger sources are rejected before decoding
//!
//! [editor]
//! max_display_width = 800       # Box the source is shown in while cropping
//! max_display_height = 500
//! default_fit = "cover"         # cover | contain
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only change where uploads land
//! [storage]
//! root = "/srv/portfolio/storage"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::loader::DEFAULT_MAX_PIXELS;
use crate::imaging::{DisplaySize, LoadOptions, Quality};
use crate::naming::is_valid_object_key;
use crate::storage::Bucket;
use crate::types::ObjectFit;
use crate::workflow::SessionSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Where uploads are stored and how they are addressed.
    pub storage: StorageConfig,
    /// Encoding and naming of uploaded images.
    pub upload: UploadConfig,
    /// Editor presentation.
    pub editor: EditorConfig,
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.upload.quality) {
            return Err(ConfigError::Validation(
                "upload.quality must be 1-100".into(),
            ));
        }
        if self.upload.max_source_pixels == 0 {
            return Err(ConfigError::Validation(
                "upload.max_source_pixels must be non-zero".into(),
            ));
        }
        if self.editor.max_display_width == 0 || self.editor.max_display_height == 0 {
            return Err(ConfigError::Validation(
                "editor.max_display_width and editor.max_display_height must be non-zero".into(),
            ));
        }
        if self.storage.public_base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.public_base_url must not be empty".into(),
            ));
        }
        for bucket in [Bucket::Profile, Bucket::Project, Bucket::Logo, Bucket::Resume] {
            let name = self.storage.buckets.name(bucket);
            if !is_valid_object_key(name) {
                return Err(ConfigError::Validation(format!(
                    "storage.buckets: invalid bucket name {name:?} for {bucket}"
                )));
            }
        }
        Ok(())
    }

    /// Session settings for an editor driven by this config.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            quality: Quality::new(self.upload.quality),
            file_prefix: self.upload.file_prefix.clone(),
            load: LoadOptions {
                declared_mime: None,
                display: DisplaySize::FitWithin {
                    max_width: self.editor.max_display_width,
                    max_height: self.editor.max_display_height,
                },
                max_pixels: self.upload.max_source_pixels,
            },
        }
    }
}

/// Object storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory of the local object store.
    pub root: PathBuf,
    /// Prefix of every public URL: `<public_base_url>/<bucket>/<key>`.
    pub public_base_url: String,
    /// Hosts serving stock placeholder images.
    pub placeholder_hosts: Vec<String>,
    pub buckets: BucketNames,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
            public_base_url: "http://localhost:8000/storage".to_string(),
            placeholder_hosts: vec!["placehold.co".to_string()],
            buckets: BucketNames::default(),
        }
    }
}

/// Bucket name for each [`Bucket`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BucketNames {
    pub profile_images: String,
    pub project_images: String,
    pub company_logos: String,
    pub resumes: String,
}

impl BucketNames {
    pub fn name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Profile => &self.profile_images,
            Bucket::Project => &self.project_images,
            Bucket::Logo => &self.company_logos,
            Bucket::Resume => &self.resumes,
        }
    }
}

impl Default for BucketNames {
    fn default() -> Self {
        Self {
            profile_images: "profile-images".to_string(),
            project_images: "project-images".to_string(),
            company_logos: "company-logos".to_string(),
            resumes: "resumes".to_string(),
        }
    }
}

/// Upload encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// JPEG quality (1 = worst, 100 = best).
    pub quality: u32,
    /// File name prefix of uploaded images.
    pub file_prefix: String,
    /// Largest accepted source, in decoded pixels.
    pub max_source_pixels: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            quality: 95,
            file_prefix: "image".to_string(),
            max_source_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Editor presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// The source is displayed inside this box (never upscaled) while cropping.
    pub max_display_width: u32,
    pub max_display_height: u32,
    /// Object fit stored with new uploads unless overridden.
    pub default_fit: ObjectFit,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_display_width: 800,
            max_display_height: 500,
            default_fit: ObjectFit::Cover,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ToolConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ToolConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<ToolConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# folio-crop Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Only the keys you want to change are needed.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Root directory of the local object store. Objects live at <root>/<bucket>/<key>.
root = "storage"

# Public URLs are <public_base_url>/<bucket>/<key>.
public_base_url = "http://localhost:8000/storage"

# Images served from these hosts are stock placeholders. They are never
# deleted when an upload replaces them.
placeholder_hosts = ["placehold.co"]

# Bucket name per asset kind.
[storage.buckets]
profile_images = "profile-images"
project_images = "project-images"
company_logos = "company-logos"
resumes = "resumes"

# ---------------------------------------------------------------------------
# Upload encoding
# ---------------------------------------------------------------------------
[upload]
# JPEG quality (1 = worst, 100 = best).
quality = 95

# Uploaded images are named <file_prefix>-<unix-ms>.jpg.
file_prefix = "image"

# Sources with more decoded pixels than this are rejected before decoding.
max_source_pixels = 48000000

# ---------------------------------------------------------------------------
# Editor
# ---------------------------------------------------------------------------
[editor]
# The source is displayed inside this box while cropping. Crop regions given
# in pixels refer to this displayed size.
max_display_width = 800
max_display_height = 500

# How uploads fill their frame when rendered: "cover" or "contain".
default_fit = "cover"
"##
}
