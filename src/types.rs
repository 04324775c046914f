//! Shared types persisted alongside uploaded assets.
//!
//! These are serialized to JSON (asset records) and TOML (config defaults),
//! so their serde representation is part of the on-disk format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a stored image fills its frame when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFit {
    /// Fill the frame, cropping overflow.
    #[default]
    Cover,
    /// Fit inside the frame, letterboxing.
    Contain,
}

impl ObjectFit {
    /// The CSS `object-fit` keyword.
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Contain => "contain",
        }
    }
}

impl FromStr for ObjectFit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cover" => Ok(Self::Cover),
            "contain" => Ok(Self::Contain),
            other => Err(format!("invalid object fit '{other}' (expected cover or contain)")),
        }
    }
}

impl fmt::Display for ObjectFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}

/// Rendering hint stored with an asset. Never affects pixel extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplaySettings {
    pub object_fit: ObjectFit,
}

/// Persisted reference to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Public URL returned by the object store.
    pub url: String,
    pub bucket: String,
    /// Object key inside the bucket.
    pub key: String,
    #[serde(default)]
    pub display: DisplaySettings,
}

impl AssetRecord {
    /// Load a record from a JSON file.
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the record as pretty JSON.
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}
