//! Runtime configuration for a [`Fetcher`](crate::Fetcher).

use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::constants::{
    DEFAULT_DOWNLOAD_DIR, DEFAULT_LEDGER_FILE_NAME, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_REDIRECTS,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_TIMEOUT,
};
use crate::validate::UrlPolicy;

/// Limits, locations and strictness toggles for the fetch pipeline.
///
/// [`FetchConfig::default`] is the strict profile: every check enabled.
/// [`FetchConfig::permissive`] keeps the size ceiling and URL rules but only
/// warns about non-image content types, skips the HEAD probe and admits
/// byte-identical content again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Directory receiving admitted files and the ledger.
    pub download_dir: PathBuf,
    /// Ledger file name inside `download_dir`.
    pub ledger_file_name: String,
    /// Maximum accepted body size in bytes, declared or measured.
    pub max_file_size: u64,
    /// Connect and read-inactivity timeout for the GET request.
    pub timeout: Duration,
    /// Timeout for the HEAD probe.
    pub probe_timeout: Duration,
    /// Redirects followed before failing with `too-many-redirects`.
    pub max_redirects: usize,
    /// Send a HEAD request first and reject early on its headers.
    pub head_probe: bool,
    /// Reject disallowed content types instead of only warning.
    pub enforce_content_type: bool,
    /// Reject content whose digest is already in the ledger.
    pub deduplicate: bool,
    /// Accept loopback/unspecified hosts.
    pub allow_local_addresses: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            ledger_file_name: DEFAULT_LEDGER_FILE_NAME.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeout: DEFAULT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            head_probe: true,
            enforce_content_type: true,
            deduplicate: true,
            allow_local_addresses: false,
        }
    }
}

impl FetchConfig {
    /// Strict defaults rooted at `download_dir`.
    #[must_use]
    pub fn with_download_dir(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            ..Self::default()
        }
    }

    /// Lenient profile for quick one-off fetches.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            head_probe: false,
            enforce_content_type: false,
            deduplicate: false,
            ..Self::default()
        }
    }

    /// Full path of the ledger file.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.download_dir.join(&self.ledger_file_name)
    }

    pub(crate) fn url_policy(&self) -> UrlPolicy {
        UrlPolicy {
            allow_local_addresses: self.allow_local_addresses,
        }
    }
}
