//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch images over HTTP(S) into a local, deduplicated collection.
///
/// Each URL is validated, downloaded with a size ceiling, checked against the
/// download ledger by content hash, and stored under a safe unique name.
/// URLs come from arguments, piped stdin (one per line) or an interactive
/// prompt.
#[derive(Parser, Debug)]
#[command(name = "image-fetcher")]
#[command(author, version, about)]
pub struct Args {
    /// Image URLs to fetch
    pub urls: Vec<String>,

    /// Increase output verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Directory receiving images and the download ledger
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum image size in MiB (1-1024)
    #[arg(short = 'm', long, value_parser = clap::value_parser!(u64).range(1..=1024))]
    pub max_size_mb: Option<u64>,

    /// Request timeout in seconds (1-3600)
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Maximum redirects to follow (0-50)
    #[arg(long, value_parser = clap::value_parser!(u16).range(0..=50))]
    pub max_redirects: Option<u16>,

    /// Skip the HEAD pre-check and validate on the GET response only
    #[arg(long)]
    pub no_head: bool,

    /// Only warn about non-image content types and keep duplicate content
    #[arg(long)]
    pub permissive: bool,

    /// Allow loopback and unspecified hosts such as localhost
    #[arg(long)]
    pub allow_local_addresses: bool,

    /// Read defaults from this TOML file instead of the standard location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Default log filter implied by `-q` / `-v`.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }
}
