//! Caller-supplied filename handling
//!
//! Filenames arrive from the client and are never trusted. Only the sanitized
//! form is ever placed in a response header or a saved file name.

/// Name used when the caller supplies no usable filename
pub const DEFAULT_FILENAME: &str = "document.pdf";

/// Prefix added to the name of every rewritten document
pub const OUTPUT_PREFIX: &str = "compressed_";

const MAX_FILENAME_LEN: usize = 200;

/// Reduce a caller-supplied filename to a single safe path segment
///
/// Keeps the last segment after any `/` or `\` separator, replaces every
/// character outside `[A-Za-z0-9._ -]` with `_`, strips leading dots and
/// surrounding whitespace, and caps the length. Falls back to
/// [`DEFAULT_FILENAME`] when nothing usable remains.
///
/// # Example
///
/// ```rust
/// use pdfpress_domain::compression::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd.pdf"), "passwd.pdf");
/// ```
pub fn sanitize_filename(raw: &str) -> String {
    let last_segment = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = last_segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim().trim_start_matches('.').trim_start();

    // ASCII-only at this point, so byte slicing stays on char boundaries
    let capped = &trimmed[..trimmed.len().min(MAX_FILENAME_LEN)];

    if capped.is_empty() || capped.chars().all(|c| c == '_' || c == '.') {
        DEFAULT_FILENAME.to_string()
    } else {
        capped.to_string()
    }
}

/// Name under which the rewritten document is offered to the caller
pub fn output_filename(sanitized: &str) -> String {
    format!("{OUTPUT_PREFIX}{sanitized}")
}
