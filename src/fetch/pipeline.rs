//! The fetch-and-admit pipeline.
//!
//! [`Fetcher::fetch`] runs one URL through validation, the HTTP exchange,
//! bounded streaming into a hidden working file, deduplication against the
//! ledger and finalisation at a collision-free path. Every early return drops
//! the working file, which deletes it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::HttpClient;
use super::error::{FetchError, SetupError};
use super::headers::check_response_headers;
use super::outcome::{Admission, FetchOutcome, RejectReason};
use super::stream::{StreamResult, stream_to_sink};
use crate::config::FetchConfig;
use crate::filename::{resolve_filename, unique_path_avoiding};
use crate::hasher::ContentDigest;
use crate::ledger::{Ledger, LedgerEntry};
use crate::validate::validate_url;

/// Attempts at claiming a final path before giving up on a racing directory.
const FINALIZE_ATTEMPTS: usize = 16;

/// Fetches URLs into a download directory, recording admissions in a ledger.
///
/// The fetcher is the single owner of the ledger for a run: it is created
/// once, then [`fetch`](Self::fetch) is called for each URL in turn. Taking
/// `&mut self` keeps the duplicate check and the ledger append in one
/// critical section.
#[derive(Debug)]
pub struct Fetcher {
    client: HttpClient,
    config: FetchConfig,
    ledger: Ledger,
}

impl Fetcher {
    /// Builds the HTTP client, creates the download directory and loads the
    /// ledger from it.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when the client cannot be built or the download
    /// directory cannot be created. A corrupt ledger is not an error.
    pub fn new(config: FetchConfig) -> Result<Self, SetupError> {
        let client = HttpClient::new(&config)?;
        std::fs::create_dir_all(&config.download_dir).map_err(|source| {
            SetupError::DownloadDir {
                path: config.download_dir.clone(),
                source,
            }
        })?;
        let ledger = Ledger::load(config.ledger_path());
        debug!(
            download_dir = %config.download_dir.display(),
            known = ledger.len(),
            "fetcher ready"
        );
        Ok(Self {
            client,
            config,
            ledger,
        })
    }

    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The in-memory ledger, including entries whose write failed.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Fetches one URL and decides whether to admit it.
    ///
    /// Never panics and never aborts the caller's run: every problem is
    /// reported through the returned [`FetchOutcome`].
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&mut self, url: &str) -> FetchOutcome {
        let parsed = match validate_url(url, self.config.url_policy()) {
            Ok(parsed) => parsed,
            Err(reason) => {
                warn!(reason = reason.as_str(), "URL rejected");
                return FetchOutcome::Rejected(reason);
            }
        };

        match self.fetch_validated(&parsed).await {
            Ok(Ok(admission)) => FetchOutcome::Admitted(admission),
            Ok(Err(reason)) => {
                warn!(reason = reason.as_str(), %reason, "content rejected");
                FetchOutcome::Rejected(reason)
            }
            Err(error) => {
                warn!(kind = error.kind().as_str(), %error, "fetch failed");
                FetchOutcome::Failed(error)
            }
        }
    }

    async fn fetch_validated(
        &mut self,
        url: &Url,
    ) -> Result<Result<Admission, RejectReason>, FetchError> {
        let url_str = url.as_str();
        let dir = self.config.download_dir.clone();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| FetchError::io(&dir, e))?;

        if self.config.head_probe
            && let Some(headers) = self.client.probe(url_str).await
            && let Err(reason) = check_response_headers(&headers, &self.config)
        {
            debug!("rejected on HEAD probe; GET not sent");
            return Ok(Err(reason));
        }

        let response = match self.client.get(url_str).await? {
            Ok(response) => response,
            Err(reason) => return Ok(Err(reason)),
        };
        let headers = response.headers().clone();
        if let Err(reason) = check_response_headers(&headers, &self.config) {
            return Ok(Err(reason));
        }

        let (file, working) = tempfile::Builder::new()
            .prefix(".fetch-")
            .suffix(".part")
            .tempfile_in(&dir)
            .map_err(|e| FetchError::io(&dir, e))?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);
        debug!(working = %working.display(), "streaming body");

        let streamed = stream_to_sink(
            response.bytes_stream(),
            &mut file,
            self.config.max_file_size,
            url_str,
            &working,
        )
        .await?;
        drop(file);

        let (bytes, digest) = match streamed {
            StreamResult::Complete { bytes, digest } => (bytes, digest),
            StreamResult::LimitExceeded { bytes } => {
                debug!(bytes, "size ceiling hit mid-stream; working file discarded");
                return Ok(Err(RejectReason::TooLarge {
                    size: bytes,
                    limit: self.config.max_file_size,
                }));
            }
        };

        let on_disk = tokio::fs::metadata(&working)
            .await
            .map_err(|e| FetchError::io(working.to_path_buf(), e))?
            .len();
        if on_disk != bytes {
            return Err(FetchError::io(
                working.to_path_buf(),
                std::io::Error::other(format!(
                    "wrote {bytes} bytes but file holds {on_disk}"
                )),
            ));
        }

        if bytes == 0 {
            return Ok(Err(RejectReason::Empty));
        }

        if self.config.deduplicate && self.ledger.contains(&digest) {
            let existing_path = self.ledger.find(&digest).map(|entry| entry.file_path.clone());
            return Ok(Err(RejectReason::Duplicate {
                digest,
                existing_path,
            }));
        }

        let filename = resolve_filename(url, &headers);
        let path = finalize(working, &dir, &filename, self.ledger.path())?;
        let ledger_persisted = self.record(digest.clone(), url_str, &path, bytes);

        info!(path = %path.display(), bytes, digest = %digest, "image admitted");
        Ok(Ok(Admission {
            path,
            size: bytes,
            digest,
            ledger_persisted,
        }))
    }

    /// Appends the ledger entry, downgrading a write failure to a warning.
    fn record(&mut self, digest: ContentDigest, url: &str, path: &Path, bytes: u64) -> bool {
        if self.ledger.contains(&digest) {
            debug!(digest = %digest, "content already recorded; ledger unchanged");
            return true;
        }
        match self.ledger.append(LedgerEntry::new(digest, url, path, bytes)) {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    ledger = %self.ledger.path().display(),
                    %error,
                    "file kept but ledger could not be written; ledger may be stale"
                );
                false
            }
        }
    }
}

/// Moves the working file to the first free name derived from `filename`.
///
/// The rename never replaces an existing file and never claims the ledger
/// path; if another file claims the chosen path first, the path is resolved
/// again.
fn finalize(
    mut working: TempPath,
    dir: &Path,
    filename: &str,
    ledger_path: &Path,
) -> Result<PathBuf, FetchError> {
    for _ in 0..FINALIZE_ATTEMPTS {
        let target = unique_path_avoiding(dir, filename, Some(ledger_path));
        match working.persist_noclobber(&target) {
            Ok(()) => return Ok(target),
            Err(error) if error.error.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %target.display(), "path claimed concurrently; resolving again");
                working = error.path;
            }
            Err(error) => return Err(FetchError::io(target, error.error)),
        }
    }
    Err(FetchError::io(
        dir.join(filename),
        std::io::Error::new(ErrorKind::AlreadyExists, "no free filename could be claimed"),
    ))
}
