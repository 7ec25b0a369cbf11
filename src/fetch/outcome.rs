//! Result of one pipeline invocation.

use std::fmt;
use std::path::PathBuf;

use crate::hasher::ContentDigest;

use super::error::{ErrorCategory, FetchError};

/// Deliberate refusals to admit content. These are expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The URL could not be parsed.
    Malformed,
    /// The scheme is missing or not `http`/`https`.
    Scheme,
    /// The host is a loopback or unspecified address.
    LocalAddress,
    /// The declared content type is not an allowed image type.
    ContentType(String),
    /// The declared or streamed size exceeds the ceiling.
    TooLarge {
        /// Bytes declared or counted when the ceiling was hit.
        size: u64,
        /// The configured ceiling.
        limit: u64,
    },
    /// The body was empty.
    Empty,
    /// Byte-identical content is already in the ledger.
    Duplicate {
        /// Digest shared with the earlier admission.
        digest: ContentDigest,
        /// Where the earlier copy was stored.
        existing_path: Option<String>,
    },
}

impl RejectReason {
    /// Returns the stable reason label used in reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Scheme => "scheme",
            Self::LocalAddress => "local-address",
            Self::ContentType(_) => "content-type",
            Self::TooLarge { .. } => "too-large",
            Self::Empty => "empty",
            Self::Duplicate { .. } => "duplicate",
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Malformed | Self::Scheme | Self::LocalAddress => ErrorCategory::Validation,
            _ => ErrorCategory::Policy,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => f.write_str("malformed URL"),
            Self::Scheme => f.write_str("only http and https URLs are allowed"),
            Self::LocalAddress => f.write_str("local addresses are not allowed"),
            Self::ContentType(content_type) => {
                write!(f, "content type '{content_type}' not allowed")
            }
            Self::TooLarge { size, limit } => {
                write!(f, "file too large ({size} bytes, limit {limit} bytes)")
            }
            Self::Empty => f.write_str("downloaded file was empty"),
            Self::Duplicate { existing_path, .. } => match existing_path {
                Some(path) => write!(f, "duplicate of {path}"),
                None => f.write_str("duplicate image"),
            },
        }
    }
}

/// A successfully admitted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Final path inside the download directory.
    pub path: PathBuf,
    /// Stored size in bytes.
    pub size: u64,
    /// Content digest recorded in the ledger.
    pub digest: ContentDigest,
    /// False when the ledger entry could not be written; the file is kept
    /// but the ledger on disk may now be stale.
    pub ledger_persisted: bool,
}

/// Outcome of fetching one URL.
#[derive(Debug)]
pub enum FetchOutcome {
    Admitted(Admission),
    Rejected(RejectReason),
    Failed(FetchError),
}

impl FetchOutcome {
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    /// The admission, if any.
    #[must_use]
    pub fn admission(&self) -> Option<&Admission> {
        match self {
            Self::Admitted(admission) => Some(admission),
            _ => None,
        }
    }

    /// The rejection reason, if any.
    #[must_use]
    pub fn rejection(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    /// The failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&FetchError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_labels_are_stable() {
        let labels: Vec<&str> = [
            RejectReason::Malformed,
            RejectReason::Scheme,
            RejectReason::LocalAddress,
            RejectReason::ContentType("text/html".to_string()),
            RejectReason::TooLarge { size: 2, limit: 1 },
            RejectReason::Empty,
            RejectReason::Duplicate {
                digest: ContentDigest::of(b"x"),
                existing_path: None,
            },
        ]
        .iter()
        .map(RejectReason::as_str)
        .collect();

        assert_eq!(
            labels,
            [
                "malformed",
                "scheme",
                "local-address",
                "content-type",
                "too-large",
                "empty",
                "duplicate"
            ]
        );
    }

    #[test]
    fn test_validation_and_policy_categories() {
        assert_eq!(RejectReason::Scheme.category(), ErrorCategory::Validation);
        assert_eq!(RejectReason::LocalAddress.category(), ErrorCategory::Validation);
        assert_eq!(RejectReason::Empty.category(), ErrorCategory::Policy);
        assert_eq!(
            RejectReason::ContentType("text/html".into()).category(),
            ErrorCategory::Policy
        );
    }

    #[test]
    fn test_display_mentions_offending_value() {
        let msg = RejectReason::ContentType("text/html".into()).to_string();
        assert!(msg.contains("text/html"), "{msg}");

        let msg = RejectReason::Duplicate {
            digest: ContentDigest::of(b"x"),
            existing_path: Some("Fetched_Images/cat.png".into()),
        }
        .to_string();
        assert!(msg.contains("Fetched_Images/cat.png"), "{msg}");
    }
}
