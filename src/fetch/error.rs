//! Error types for the fetch pipeline.
//!
//! Hard failures carry the URL or path they concern. Expected policy outcomes
//! (duplicate, oversize, wrong type, empty) are not errors; they are
//! [`RejectReason`](super::RejectReason) values.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Broad error classes, shared by failures and rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or disallowed URL.
    Validation,
    /// Timeout, connection failure, excessive redirects.
    Transport,
    /// Non-2xx response status.
    Protocol,
    /// Content refused by policy.
    Policy,
    /// Filesystem or ledger failure.
    Persistence,
}

/// Stable labels for hard failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    ConnectionError,
    HttpStatus,
    TooManyRedirects,
    IoError,
    Unexpected,
}

impl FailureKind {
    /// Returns the stable label used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionError => "connection-error",
            Self::HttpStatus => "http-status",
            Self::TooManyRedirects => "too-many-redirects",
            Self::IoError => "io-error",
            Self::Unexpected => "unexpected",
        }
    }

    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::Timeout | Self::ConnectionError | Self::TooManyRedirects | Self::Unexpected => {
                ErrorCategory::Transport
            }
            Self::HttpStatus => ErrorCategory::Protocol,
            Self::IoError => ErrorCategory::Persistence,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hard failures that end the fetch of a single URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connect or read did not finish within the configured timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// DNS, connect, TLS or mid-body transport failure.
    #[error("connection error fetching {url}: {source}")]
    Connection {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The redirect chain exceeded the configured limit.
    #[error("too many redirects fetching {url}")]
    TooManyRedirects {
        /// The URL that started the chain.
        url: String,
    },

    /// Filesystem error while writing or finalizing the image.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Anything else.
    #[error("unexpected error fetching {url}: {message}")]
    Unexpected {
        /// The URL being fetched.
        url: String,
        /// Description of what went wrong.
        message: String,
    },
}

impl FetchError {
    /// Classifies a reqwest error raised while fetching `url`.
    pub fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else if source.is_redirect() {
            Self::TooManyRedirects { url }
        } else if source.is_decode() {
            Self::Unexpected {
                url,
                message: source.to_string(),
            }
        } else {
            Self::Connection { url, source }
        }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unexpected(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unexpected {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns the stable failure label for this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Connection { .. } => FailureKind::ConnectionError,
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::TooManyRedirects { .. } => FailureKind::TooManyRedirects,
            Self::Io { .. } => FailureKind::IoError,
            Self::Unexpected { .. } => FailureKind::Unexpected,
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }
}

/// Errors raised while constructing a [`Fetcher`](crate::Fetcher).
#[derive(Debug, Error)]
pub enum SetupError {
    /// The HTTP client could not be built from the configuration.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The download directory could not be created.
    #[error("failed to create download directory {path}: {source}")]
    DownloadDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
