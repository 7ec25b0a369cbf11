//! Response header policy: declared content type and declared length.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use tracing::{debug, warn};

use super::constants::{ALLOWED_CONTENT_TYPES, INFORMATIONAL_SECURITY_HEADERS};
use super::outcome::RejectReason;
use crate::config::FetchConfig;

/// Checks declared headers before any body bytes are written.
///
/// A missing content type is tolerated. A disallowed one is rejected when
/// `enforce_content_type` is set and only logged otherwise. A numeric
/// `Content-Length` above the ceiling is rejected; an unparseable one is
/// ignored and the ceiling is enforced while streaming instead.
///
/// # Errors
///
/// Returns [`RejectReason::ContentType`] or [`RejectReason::TooLarge`].
pub fn check_response_headers(headers: &HeaderMap, config: &FetchConfig) -> Result<(), RejectReason> {
    let content_type = declared_content_type(headers);

    if let Some(content_type) = content_type.as_deref()
        && !ALLOWED_CONTENT_TYPES.contains(&content_type)
    {
        if config.enforce_content_type {
            return Err(RejectReason::ContentType(content_type.to_string()));
        }
        warn!(content_type, "content type may not be an image; continuing");
    }

    if let Some(size) = declared_content_length(headers)
        && size > config.max_file_size
    {
        return Err(RejectReason::TooLarge {
            size,
            limit: config.max_file_size,
        });
    }

    if !content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
    {
        let missing: Vec<&str> = INFORMATIONAL_SECURITY_HEADERS
            .iter()
            .copied()
            .filter(|name| !headers.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            warn!(missing = %missing.join(", "), "response lacks security headers");
        }
    }

    Ok(())
}

/// Declared MIME type, lowercased and stripped of parameters. Empty values
/// count as absent.
pub(crate) fn declared_content_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = raw.split(';').next().unwrap_or_default().trim();
    (!mime.is_empty()).then(|| mime.to_ascii_lowercase())
}

/// Declared `Content-Length`, if present and numeric.
pub(crate) fn declared_content_length(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(CONTENT_LENGTH)?.to_str().ok()?;
    match raw.trim().parse::<u64>() {
        Ok(size) => Some(size),
        Err(_) => {
            debug!(content_length = raw, "ignoring unparseable Content-Length");
            None
        }
    }
}
