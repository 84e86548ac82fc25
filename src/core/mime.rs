//! Attachment content-type resolution.

/// Content type used when nothing better is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Resolve a content type from a filename's extension.
///
/// Absent filenames, names without an extension, and unknown extensions all
/// resolve to [`DEFAULT_MIME_TYPE`].
#[must_use]
pub fn mime_type_for(filename: Option<&str>) -> String {
    filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .and_then(|name| mime_guess::from_path(name).first_raw())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}
