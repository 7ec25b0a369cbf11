//! Console messaging for fetch results.

use std::path::Path;

use image_fetcher::{FetchOutcome, RejectReason};

use crate::ProcessExit;

const KIB: f64 = 1024.0;

/// Formats a byte count as `bytes`, `KB`, `MB` or `GB` with one decimal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} bytes");
    }
    let mut value = bytes as f64 / KIB;
    for unit in ["KB", "MB"] {
        if value < KIB {
            return format!("{value:.1} {unit}");
        }
        value /= KIB;
    }
    format!("{value:.1} GB")
}

/// Lines to print for one URL's outcome.
#[must_use]
pub fn outcome_lines(url: &str, outcome: &FetchOutcome, ledger_path: &Path) -> Vec<String> {
    match outcome {
        FetchOutcome::Admitted(admission) => {
            let name = admission
                .path
                .file_name()
                .map_or_else(|| admission.path.display().to_string(), |n| n.to_string_lossy().into_owned());
            let mut lines = vec![format!("✓ Saved {name} ({})", format_file_size(admission.size))];
            if !admission.ledger_persisted {
                lines.push(format!(
                    "  ⚠ Could not update {}; it may be out of date",
                    ledger_path.display()
                ));
            }
            lines
        }
        FetchOutcome::Rejected(RejectReason::Duplicate { existing_path, .. }) => {
            vec![match existing_path {
                Some(path) => format!("⚠ Already have this image as {path}; skipped {url}"),
                None => format!("⚠ Already have this image; skipped {url}"),
            }]
        }
        FetchOutcome::Rejected(reason) => vec![format!("✗ Rejected {url}: {reason}")],
        FetchOutcome::Failed(error) => vec![format!("✗ Failed ({}): {error}", error.kind())],
    }
}

/// Running tally of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub admitted: usize,
    pub not_admitted: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &FetchOutcome) {
        if outcome.is_admitted() {
            self.admitted += 1;
        } else {
            self.not_admitted += 1;
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.admitted + self.not_admitted
    }

    #[must_use]
    pub fn summary_line(&self) -> String {
        format!("Fetched {}/{} images", self.admitted, self.total())
    }

    #[must_use]
    pub fn exit_outcome(&self) -> ProcessExit {
        determine_exit_outcome(self.admitted, self.not_admitted)
    }
}

/// Maps admitted/not-admitted counts to the process exit outcome.
fn determine_exit_outcome(admitted: usize, not_admitted: usize) -> ProcessExit {
    if not_admitted == 0 {
        ProcessExit::Success
    } else if admitted > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
