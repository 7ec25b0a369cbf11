//! Persisted record of every admitted download.
//!
//! The ledger is a JSON array of entries stored next to the downloaded files.
//! It is loaded once when a [`Fetcher`](crate::Fetcher) is created, held in
//! memory as the source of truth, and rewritten in full after every append so
//! a crash loses at most the entry being written.
//!
//! On-disk shape (field names and types are a compatibility contract):
//!
//! ```json
//! [
//!   {
//!     "hash": "<sha-256 hex>",
//!     "url": "https://example.com/cat.png",
//!     "filepath": "Fetched_Images/cat.png",
//!     "file_size": 2048,
//!     "download_date": "2026-10-16T09:30:00.000000+00:00"
//!   }
//! ]
//! ```

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::hasher::ContentDigest;

/// Errors raised while reading or writing the ledger file.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Filesystem error on the ledger file or its temporary sibling.
    #[error("ledger IO error at {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The ledger could not be encoded or decoded.
    #[error("ledger JSON error at {path}: {source}")]
    Json {
        /// Ledger file path.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// An entry with this hash is already recorded.
    #[error("ledger already holds an entry for {hash}")]
    DuplicateEntry {
        /// Digest that was already present.
        hash: ContentDigest,
    },
}

impl LedgerError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// One admitted download. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Content digest of the stored file.
    pub hash: ContentDigest,
    /// URL the content was fetched from.
    #[serde(rename = "url")]
    pub source_url: String,
    /// Where the file was stored.
    #[serde(rename = "filepath")]
    pub file_path: String,
    /// Stored size in bytes.
    #[serde(rename = "file_size")]
    pub byte_size: u64,
    /// ISO-8601 admission time.
    #[serde(rename = "download_date")]
    pub fetched_at: String,
}

impl LedgerEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(hash: ContentDigest, source_url: &str, file_path: &Path, byte_size: u64) -> Self {
        Self {
            hash,
            source_url: source_url.to_string(),
            file_path: file_path.display().to_string(),
            byte_size,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// How the in-memory ledger was obtained at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerSource {
    /// No backing file existed yet.
    Missing,
    /// The backing file was read successfully.
    Loaded,
    /// The backing file was unreadable or not a valid ledger; history was dropped.
    Corrupt,
}

/// In-memory ledger bound to its backing file.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
    index: HashSet<ContentDigest>,
    source: LedgerSource,
}

impl Ledger {
    /// Loads the ledger at `path`.
    ///
    /// A missing file yields an empty ledger. A corrupt or unreadable file is
    /// not fatal: it is logged and the ledger starts empty, which makes every
    /// previously recorded hash eligible for admission again. The next append
    /// overwrites the corrupt document.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (entries, source) = match read_entries(&path) {
            Ok(Some(entries)) => (entries, LedgerSource::Loaded),
            Ok(None) => (Vec::new(), LedgerSource::Missing),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    %error,
                    "download ledger is corrupt; starting with empty history, earlier downloads may be fetched again"
                );
                (Vec::new(), LedgerSource::Corrupt)
            }
        };
        debug!(path = %path.display(), entries = entries.len(), ?source, "ledger loaded");

        let index = entries.iter().map(|entry| entry.hash.clone()).collect();
        Self {
            path,
            entries,
            index,
            source,
        }
    }

    /// Returns whether an entry with this digest has been admitted.
    #[must_use]
    pub fn contains(&self, hash: &ContentDigest) -> bool {
        self.index.contains(hash)
    }

    /// Returns the entry recorded for this digest, if any.
    #[must_use]
    pub fn find(&self, hash: &ContentDigest) -> Option<&LedgerEntry> {
        self.entries.iter().find(|entry| &entry.hash == hash)
    }

    /// Appends an entry and rewrites the backing file.
    ///
    /// The entry is kept in memory even when the write fails, so duplicate
    /// detection stays correct for the rest of the run.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateEntry`] without changing anything when
    /// the hash is already present, or an IO/JSON error when the rewrite fails.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        if self.index.contains(&entry.hash) {
            return Err(LedgerError::DuplicateEntry { hash: entry.hash });
        }
        self.index.insert(entry.hash.clone());
        self.entries.push(entry);
        self.flush()
    }

    /// Rewrites the whole backing file from memory.
    ///
    /// The document is written to a temporary sibling and renamed over the
    /// ledger so a reader never observes a half-written file.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if encoding, writing or renaming fails.
    pub fn flush(&self) -> Result<(), LedgerError> {
        let json = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| LedgerError::json(&self.path, e))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| LedgerError::io(&dir, e))?;

        let mut staged = tempfile::Builder::new()
            .prefix(".ledger-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| LedgerError::io(&dir, e))?;
        staged
            .write_all(&json)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| LedgerError::io(staged.path(), e))?;
        staged
            .persist(&self.path)
            .map_err(|e| LedgerError::io(&self.path, e.error))?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "ledger written");
        Ok(())
    }

    /// All entries in admission order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How this ledger was obtained when loaded.
    #[must_use]
    pub fn source(&self) -> LedgerSource {
        self.source
    }
}

fn read_entries(path: &Path) -> Result<Option<Vec<LedgerEntry>>, LedgerError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LedgerError::io(path, e)),
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| LedgerError::json(path, e))
}
