//! Object naming for uploaded assets.
//!
//! Uploaded images are stored flat inside a bucket under a generated name:
//!
//! - `profile-1739912345678.jpg` → prefix `profile`, timestamp in Unix ms
//! - `image-1739912345678.jpg` → the default prefix
//!
//! The object key of a stored asset is recovered from its public URL by
//! taking the last path segment, which is how the previous asset is found
//! when it gets replaced. Placeholder URLs (stock images served by a
//! placeholder host) are never treated as stored objects.

/// Build `<prefix>-<timestamp_ms>.<ext>`.
///
/// The prefix is reduced to `[A-Za-z0-9_-]`; an empty result falls back to
/// `image`.
pub fn payload_file_name(prefix: &str, timestamp_ms: u64, ext: &str) -> String {
    let clean: String = prefix
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let prefix = if clean.is_empty() { "image" } else { clean.as_str() };
    format!("{prefix}-{timestamp_ms}.{ext}")
}

/// Whether `key` is a valid flat object key.
///
/// Rejects empty keys, path separators and dot segments.
pub fn is_valid_object_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\'])
        && !key.chars().any(char::is_control)
}

/// Object key of a stored asset: the last path segment of its URL.
///
/// Query strings and fragments are ignored. Returns `None` when the last
/// segment is not a valid key.
pub fn object_key_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let key = path.rsplit('/').next()?;
    is_valid_object_key(key).then_some(key)
}

/// Whether `url` points at one of the placeholder hosts.
pub fn is_placeholder_url(url: &str, placeholder_hosts: &[String]) -> bool {
    placeholder_hosts
        .iter()
        .any(|host| !host.is_empty() && url.contains(host.as_str()))
}
