//! Fetch pipeline: HTTP exchange, header policy, bounded streaming and
//! admission.
//!
//! # Overview
//!
//! - [`Fetcher`] - owns the client, configuration and ledger for a run
//! - [`HttpClient`] - reqwest wrapper with the fixed request header set
//! - [`FetchOutcome`] - `Admitted`, `Rejected` or `Failed` for one URL
//! - [`RejectReason`] / [`FetchError`] - policy refusals and hard failures
//!
//! # Example
//!
//! ```no_run
//! use image_fetcher::{FetchConfig, FetchOutcome, Fetcher};
//!
//! # async fn run() -> Result<(), image_fetcher::SetupError> {
//! let mut fetcher = Fetcher::new(FetchConfig::default())?;
//! match fetcher.fetch("https://example.com/cat.png").await {
//!     FetchOutcome::Admitted(admission) => println!("saved {}", admission.path.display()),
//!     FetchOutcome::Rejected(reason) => println!("skipped: {reason}"),
//!     FetchOutcome::Failed(error) => println!("failed: {error}"),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
pub(crate) mod headers;
mod outcome;
mod pipeline;
mod stream;

pub use client::HttpClient;
pub use constants::{
    ALLOWED_CONTENT_TYPES, DEFAULT_DOWNLOAD_DIR, DEFAULT_LEDGER_FILE_NAME, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_REDIRECTS, DEFAULT_PROBE_TIMEOUT, DEFAULT_TIMEOUT,
};
pub use error::{ErrorCategory, FailureKind, FetchError, SetupError};
pub use headers::check_response_headers;
pub use outcome::{Admission, FetchOutcome, RejectReason};
pub use pipeline::Fetcher;
