//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every block starts
//! with what the entity *is* (source image, crop, stored asset) and shows
//! paths, keys and URLs as indented context lines underneath.
//!
//! # Output Format
//!
//! ## Crop
//!
//! ```text
//! Source portrait.jpg
//!     1200x800 image/jpeg, displayed at 750x500
//! Crop 16:9
//!     Display: 0,40 750x422
//!     Source: 0,64 1200x675
//! Stored profile-images/profile-1739912345678.jpg
//!     1200x675 image/jpeg, 182.4 KB
//!     URL: http://localhost:8000/storage/profile-images/profile-1739912345678.jpg
//!     Fit: cover
//!     Replaced: profile-images/profile-1739000000000.jpg
//! ```
//!
//! ## Delete
//!
//! ```text
//! Deleted profile-images/profile-1739912345678.jpg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::ToolConfig;
use crate::imaging::rust_backend::supported_mime_types;
use crate::imaging::{AspectRatio, CommittedCrop, ExtractParams, SourceImage, UploadPayload};
use crate::storage::Bucket;
use crate::types::AssetRecord;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_bytes(len: usize) -> String {
    const KB: f64 = 1024.0;
    let len_f = len as f64;
    if len_f < KB {
        format!("{len} B")
    } else if len_f < KB * KB {
        format!("{:.1} KB", len_f / KB)
    } else {
        format!("{:.1} MB", len_f / (KB * KB))
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

// ============================================================================
// Crop
// ============================================================================

/// Format the loaded source.
pub fn format_source(label: &str, source: &SourceImage) -> Vec<String> {
    let mut lines = vec![format!("Source {label}")];
    let detail = if source.display == source.natural {
        format!(
            "{}x{} {}",
            source.natural.width, source.natural.height, source.mime_type
        )
    } else {
        format!(
            "{}x{} {}, displayed at {}x{}",
            source.natural.width,
            source.natural.height,
            source.mime_type,
            source.display.width,
            source.display.height
        )
    };
    lines.push(format!("{}{detail}", indent(1)));
    lines
}

/// Format the committed crop, in display pixels and, when planned, in
/// source pixels.
pub fn format_crop(
    aspect: AspectRatio,
    crop: &CommittedCrop,
    extract: Option<&ExtractParams>,
) -> Vec<String> {
    let mut lines = vec![format!("Crop {aspect}")];
    lines.push(format!(
        "{}Display: {},{} {}x{}",
        indent(1),
        crop.x.round(),
        crop.y.round(),
        crop.width.round(),
        crop.height.round()
    ));
    if let Some(params) = extract {
        let r = params.source;
        lines.push(format!(
            "{}Source: {},{} {}x{}",
            indent(1),
            r.x,
            r.y,
            r.width,
            r.height
        ));
    }
    lines
}

/// Format a stored asset and the one it replaced, if any.
pub fn format_upload(
    record: &AssetRecord,
    payload: &UploadPayload,
    replaced: Option<&AssetRecord>,
) -> Vec<String> {
    let mut lines = vec![format!("Stored {}/{}", record.bucket, record.key)];
    lines.push(format!(
        "{}{}x{} {}, {}",
        indent(1),
        payload.width,
        payload.height,
        payload.mime_type,
        format_bytes(payload.bytes.len())
    ));
    lines.push(format!("{}URL: {}", indent(1), record.url));
    lines.push(format!("{}Fit: {}", indent(1), record.display.object_fit));
    if let Some(old) = replaced
        && old.url != record.url
    {
        let what = if old.key.is_empty() {
            old.url.clone()
        } else {
            format!("{}/{}", old.bucket, old.key)
        };
        lines.push(format!("{}Replaced: {what}", indent(1)));
    }
    lines
}

pub fn print_crop_output(
    label: &str,
    source: &SourceImage,
    aspect: AspectRatio,
    crop: &CommittedCrop,
    extract: Option<&ExtractParams>,
) {
    print_lines(&format_source(label, source));
    print_lines(&format_crop(aspect, crop, extract));
}

pub fn print_upload_output(
    record: &AssetRecord,
    payload: &UploadPayload,
    replaced: Option<&AssetRecord>,
) {
    print_lines(&format_upload(record, payload, replaced));
}

// ============================================================================
// Delete
// ============================================================================

pub fn format_delete(bucket: &str, key: &str) -> Vec<String> {
    vec![format!("Deleted {bucket}/{key}")]
}

pub fn print_delete_output(bucket: &str, key: &str) {
    print_lines(&format_delete(bucket, key));
}

// ============================================================================
// Check
// ============================================================================

/// Format the effective configuration.
pub fn format_check(config: &ToolConfig, config_dir: &Path) -> Vec<String> {
    let storage = &config.storage;
    let mut lines = vec![format!("Config {}", config_dir.join("config.toml").display())];

    lines.push("Storage".to_string());
    lines.push(format!("{}Root: {}", indent(1), storage.root.display()));
    lines.push(format!("{}Public URL: {}", indent(1), storage.public_base_url));
    for bucket in [Bucket::Profile, Bucket::Project, Bucket::Logo, Bucket::Resume] {
        lines.push(format!(
            "{}{bucket}: {}",
            indent(1),
            storage.buckets.name(bucket)
        ));
    }
    if !storage.placeholder_hosts.is_empty() {
        lines.push(format!(
            "{}Placeholders: {}",
            indent(1),
            storage.placeholder_hosts.join(", ")
        ));
    }

    lines.push("Upload".to_string());
    lines.push(format!(
        "{}{}-<unix-ms>.jpg at quality {}",
        indent(1),
        config.upload.file_prefix,
        config.upload.quality
    ));
    lines.push(format!(
        "{}Max source: {} pixels",
        indent(1),
        config.upload.max_source_pixels
    ));
    lines.push(format!(
        "{}Accepts: {}",
        indent(1),
        supported_mime_types().join(", ")
    ));

    lines.push("Editor".to_string());
    lines.push(format!(
        "{}Display box: {}x{}, fit {}",
        indent(1),
        config.editor.max_display_width,
        config.editor.max_display_height,
        config.editor.default_fit
    ));
    lines
}

pub fn print_check_output(config: &ToolConfig, config_dir: &Path) {
    print_lines(&format_check(config, config_dir));
}
