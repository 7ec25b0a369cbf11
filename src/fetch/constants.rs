//! Constants for the fetch pipeline (limits, timeouts, header policy).

use std::time::Duration;

/// Default download directory, relative to the working directory.
pub const DEFAULT_DOWNLOAD_DIR: &str = "Fetched_Images";

/// Ledger file name, stored inside the download directory.
pub const DEFAULT_LEDGER_FILE_NAME: &str = "download_metadata.json";

/// Default size ceiling for a single image (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default connect/read timeout for GET requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the preliminary HEAD probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum number of redirects followed.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Write buffer size for streaming bodies to disk.
pub const STREAM_CHUNK_SIZE: usize = 8192;

/// Image MIME types accepted when content-type enforcement is on.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
    "image/svg+xml",
    "image/tiff",
];

/// Headers whose absence on a non-image response is worth a warning.
pub const INFORMATIONAL_SECURITY_HEADERS: &[&str] = &[
    "x-content-type-options",
    "x-frame-options",
    "content-security-policy",
];
