//! Filename derivation and collision-free path resolution for admitted images.
//!
//! Candidate names come from, in order: the `Content-Disposition` header, the
//! last URL path segment, and a synthesized `image_<timestamp>.<ext>` name.
//! A candidate that fails [`is_safe_filename`] is never repaired in place; the
//! resolver moves on to the next source instead.

use std::path::{Path, PathBuf};

use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use tracing::debug;
use url::Url;

use crate::fetch::headers::declared_content_type;

/// Longest accepted filename, in characters.
pub const MAX_FILENAME_CHARS: usize = 254;

/// Sequences that make a filename unsafe to use verbatim.
const FORBIDDEN_SEQUENCES: &[&str] = &[
    "..", "/", "\\", ":", "*", "?", "\"", "'", "<", ">", "|",
];

/// Derives a safe filename for a response fetched from `url`.
#[must_use]
pub fn resolve_filename(url: &Url, headers: &HeaderMap) -> String {
    if let Some(name) = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_content_disposition)
    {
        if is_safe_filename(&name) {
            return name;
        }
        debug!(candidate = %name, "unsafe Content-Disposition filename ignored");
    }

    if let Some(name) = filename_from_url(url) {
        if is_safe_filename(&name) {
            return name;
        }
        debug!(candidate = %name, "unsafe URL filename ignored");
    }

    let content_type = declared_content_type(headers);
    timestamped_filename(extension_from_content_type(content_type.as_deref()))
}

/// Returns false for names containing traversal or shell-meaningful sequences,
/// control characters, or more than [`MAX_FILENAME_CHARS`] characters.
#[must_use]
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_FILENAME_CHARS
        && !name.chars().any(char::is_control)
        && !FORBIDDEN_SEQUENCES.iter().any(|seq| name.contains(seq))
}

/// Maps an image MIME type to a file extension, defaulting to `.jpg`.
#[must_use]
pub fn extension_from_content_type(content_type: Option<&str>) -> &'static str {
    match content_type.unwrap_or_default() {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/tiff" => ".tiff",
        _ => ".jpg",
    }
}

/// Returns `directory/filename`, or the first free `stem_N.ext` for N = 1, 2, ...
///
/// Never returns a path that exists at the time of the call; given the same
/// directory contents it always returns the same path.
#[must_use]
pub fn unique_path(directory: &Path, filename: &str) -> PathBuf {
    unique_path_avoiding(directory, filename, None)
}

/// Like [`unique_path`], but also treats `reserved` as taken even when it
/// does not exist yet (the ledger file before its first write).
#[must_use]
pub fn unique_path_avoiding(directory: &Path, filename: &str, reserved: Option<&Path>) -> PathBuf {
    let is_free = |path: &Path| !path.exists() && reserved.is_none_or(|r| r != path);

    let candidate = directory.join(filename);
    if is_free(&candidate) {
        return candidate;
    }

    let (stem, ext) = split_extension(filename);
    (1u64..)
        .map(|i| directory.join(format!("{stem}_{i}{ext}")))
        .find(|path| is_free(path))
        .unwrap_or(candidate)
}

/// Splits `name` into stem and extension (with its dot). A leading dot is
/// part of the stem, so `.hidden` has no extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Last URL path segment, percent-decoded, when it carries an extension.
fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(
        |error| {
            debug!(segment = %last, %error, "URL decoding failed, using raw segment");
            last.to_string()
        },
        std::borrow::Cow::into_owned,
    );
    decoded.contains('.').then_some(decoded)
}

fn timestamped_filename(extension: &str) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("image_{stamp}{extension}")
}

/// Extracts the filename parameter from a `Content-Disposition` header.
///
/// Handles:
/// - `attachment; filename="example.png"`
/// - `attachment; filename=example.png`
/// - `attachment; filename*=UTF-8''example%20file.png` (RFC 5987)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim()) {
                let decoded = decoded.into_owned();
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        }
    }

    let pos = header.find("filename=")?;
    let value = header[pos + 9..].trim();
    let name = if let Some(stripped) = value.strip_prefix('"') {
        &stripped[..stripped.find('"')?]
    } else {
        let end = value.find(';').unwrap_or(value.len());
        value[..end].trim().trim_matches('\'')
    };
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::{CONTENT_TYPE, HeaderValue};
    use tempfile::TempDir;

    fn headers(pairs: &[(reqwest::header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn assert_timestamped(name: &str, ext: &str) {
        let stamp = name
            .strip_prefix("image_")
            .and_then(|rest| rest.strip_suffix(ext))
            .unwrap_or_else(|| panic!("expected image_<timestamp>{ext}, got {name}"));
        assert_eq!(stamp.len(), 15, "unexpected timestamp in {name}");
        assert!(stamp.chars().all(|c| c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn test_content_disposition_takes_priority() {
        let h = headers(&[(CONTENT_DISPOSITION, r#"inline; filename="kitten.png""#)]);
        assert_eq!(
            resolve_filename(&url("https://example.com/cat.png"), &h),
            "kitten.png"
        );
    }

    #[test]
    fn test_url_segment_used_without_content_disposition() {
        let h = HeaderMap::new();
        assert_eq!(
            resolve_filename(&url("https://example.com/img/cat.png?size=large"), &h),
            "cat.png"
        );
    }

    #[test]
    fn test_url_segment_is_percent_decoded() {
        assert_eq!(
            resolve_filename(&url("https://example.com/my%20cat.png"), &HeaderMap::new()),
            "my cat.png"
        );
    }

    #[test]
    fn test_unsafe_content_disposition_falls_back_to_url() {
        let h = headers(&[(CONTENT_DISPOSITION, r#"attachment; filename="../../etc/passwd""#)]);
        assert_eq!(
            resolve_filename(&url("https://example.com/cat.png"), &h),
            "cat.png"
        );
    }

    #[test]
    fn test_segment_without_extension_synthesizes_name_from_content_type() {
        let h = headers(&[(CONTENT_TYPE, "image/webp")]);
        let name = resolve_filename(&url("https://example.com/images/42"), &h);
        assert_timestamped(&name, ".webp");
    }

    #[test]
    fn test_empty_path_defaults_to_jpg() {
        let name = resolve_filename(&url("https://example.com/"), &HeaderMap::new());
        assert_timestamped(&name, ".jpg");
    }

    #[test]
    fn test_encoded_traversal_in_url_is_never_returned() {
        let h = headers(&[(CONTENT_TYPE, "image/png")]);
        let name = resolve_filename(&url("https://example.com/..%2F..%2Fetc%2Fshadow.png"), &h);
        assert!(!name.contains(".."));
        assert!(!name.contains('/'));
        assert_timestamped(&name, ".png");
    }

    #[test]
    fn test_unsafe_names_are_detected() {
        for name in [
            "..",
            "../cat.png",
            "dir/cat.png",
            "dir\\cat.png",
            "C:cat.png",
            "cat*.png",
            "cat?.png",
            "\"cat\".png",
            "'cat'.png",
            "<cat>.png",
            "cat|rm.png",
            "cat\0.png",
            "",
        ] {
            assert!(!is_safe_filename(name), "{name:?} should be unsafe");
        }
    }

    #[test]
    fn test_length_limit_is_254_characters() {
        let ok = format!("{}.png", "a".repeat(250));
        let too_long = format!("{}.png", "a".repeat(251));
        assert!(is_safe_filename(&ok));
        assert!(!is_safe_filename(&too_long));
    }

    #[test]
    fn test_ordinary_names_are_safe() {
        for name in ["cat.png", "cat (1).png", "日本語.jpg", "photo-2024_01.jpeg"] {
            assert!(is_safe_filename(name), "{name:?} should be safe");
        }
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(extension_from_content_type(Some("image/png")), ".png");
        assert_eq!(extension_from_content_type(Some("image/svg+xml")), ".svg");
        assert_eq!(extension_from_content_type(Some("image/tiff")), ".tiff");
        assert_eq!(extension_from_content_type(Some("image/jpeg")), ".jpg");
        assert_eq!(extension_from_content_type(Some("application/x-unknown")), ".jpg");
        assert_eq!(extension_from_content_type(None), ".jpg");
    }

    #[test]
    fn test_parse_content_disposition_variants() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="a.png""#),
            Some("a.png".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=a.png; size=10"),
            Some("a.png".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''a%20b.png"),
            Some("a b.png".to_string())
        );
        assert_eq!(parse_content_disposition("attachment"), None);
        assert_eq!(parse_content_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_unique_path_returns_requested_name_when_free() {
        let dir = TempDir::new().unwrap();
        assert_eq!(unique_path(dir.path(), "cat.png"), dir.path().join("cat.png"));
    }

    #[test]
    fn test_unique_path_counts_from_one() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cat.png"), b"1").unwrap();
        std::fs::write(dir.path().join("cat_1.png"), b"2").unwrap();

        assert_eq!(unique_path(dir.path(), "cat.png"), dir.path().join("cat_2.png"));
    }

    #[test]
    fn test_unique_path_is_stable_until_file_created() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cat.png"), b"1").unwrap();

        let first = unique_path(dir.path(), "cat.png");
        let again = unique_path(dir.path(), "cat.png");
        assert_eq!(first, again);

        std::fs::write(&first, b"2").unwrap();
        let next = unique_path(dir.path(), "cat.png");
        assert_ne!(next, first);
        assert!(!next.exists());
    }

    #[test]
    fn test_reserved_path_is_skipped_even_when_absent() {
        let dir = TempDir::new().unwrap();
        let ledger = dir.path().join("download_metadata.json");

        assert_eq!(
            unique_path_avoiding(dir.path(), "download_metadata.json", Some(&ledger)),
            dir.path().join("download_metadata_1.json")
        );
        assert_eq!(
            unique_path_avoiding(dir.path(), "cat.png", Some(&ledger)),
            dir.path().join("cat.png")
        );
    }

    #[test]
    fn test_unique_path_without_extension_and_hidden_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cat"), b"1").unwrap();
        std::fs::write(dir.path().join(".cat"), b"1").unwrap();

        assert_eq!(unique_path(dir.path(), "cat"), dir.path().join("cat_1"));
        assert_eq!(unique_path(dir.path(), ".cat"), dir.path().join(".cat_1"));
    }

    #[test]
    fn test_unique_path_splits_on_last_dot() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cat.tar.gz"), b"1").unwrap();
        assert_eq!(
            unique_path(dir.path(), "cat.tar.gz"),
            dir.path().join("cat.tar_1.gz")
        );
    }
}
