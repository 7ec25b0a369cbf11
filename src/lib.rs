//! Image Fetcher Core Library
//!
//! Fetches remote images over HTTP(S), refuses anything that is not an
//! acceptable image, deduplicates by content and stores admitted files under
//! collision-free names, with a JSON ledger recording every admission.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`validate`] - URL scheme and host checks, run before any network access
//! - [`hasher`] - SHA-256 content digests used as deduplication identity
//! - [`ledger`] - persisted record of admitted content
//! - [`filename`] - safe filename derivation and unique path assignment
//! - [`fetch`] - HTTP client, header policy and the admission pipeline
//! - [`config`] - limits and strictness toggles

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod fetch;
pub mod filename;
pub mod hasher;
pub mod ledger;
pub mod validate;

mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::FetchConfig;
pub use fetch::{
    Admission, ErrorCategory, FailureKind, FetchError, FetchOutcome, Fetcher, HttpClient,
    RejectReason, SetupError,
};
pub use filename::{resolve_filename, unique_path, unique_path_avoiding};
pub use hasher::{ContentDigest, ContentHasher};
pub use ledger::{Ledger, LedgerEntry, LedgerError, LedgerSource};
pub use validate::{UrlPolicy, validate_url};
