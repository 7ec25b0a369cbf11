//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use image_fetcher::FetchConfig;
use serde::Deserialize;
use tracing::debug;

use crate::cli::Args;

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// TOML-backed file configuration for fetcher defaults.
///
/// Every key is optional; unknown keys are an error so that typos do not
/// silently fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Directory receiving images and the ledger.
    pub output_dir: Option<PathBuf>,
    /// Ledger file name inside the output directory.
    pub ledger_file_name: Option<String>,
    /// Size ceiling in MiB.
    pub max_size_mb: Option<u64>,
    /// GET connect/read timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// HEAD probe timeout in seconds.
    pub probe_timeout_secs: Option<u64>,
    pub max_redirects: Option<u16>,
    /// Start from the lenient profile instead of the strict one.
    pub permissive: Option<bool>,
    pub head_probe: Option<bool>,
    pub enforce_content_type: Option<bool>,
    pub deduplicate: Option<bool>,
    pub allow_local_addresses: Option<bool>,
}

impl FileConfig {
    /// Validates config values against the same ranges as the CLI.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("timeout_secs", self.timeout_secs)?;
        validate_timeout_secs("probe_timeout_secs", self.probe_timeout_secs)?;

        if let Some(max_redirects) = self.max_redirects
            && max_redirects > 50
        {
            bail!("Invalid config value for `max_redirects`: {max_redirects}. Expected range: 0..=50");
        }

        if let Some(max_size_mb) = self.max_size_mb
            && !(1..=1024).contains(&max_size_mb)
        {
            bail!("Invalid config value for `max_size_mb`: {max_size_mb}. Expected range: 1..=1024");
        }

        if let Some(name) = &self.ledger_file_name
            && !image_fetcher::filename::is_safe_filename(name)
        {
            bail!("Invalid config value for `ledger_file_name`: {name:?}. Expected a plain file name");
        }

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/image-fetcher/config.toml`
/// 2. `$HOME/.config/image-fetcher/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("image-fetcher")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("image-fetcher")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the file config.
///
/// An explicit path must exist. The default path is optional: when it is
/// absent, `None` is returned.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }

    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        debug!(path = %path.display(), "no config file");
        return Ok(None);
    }
    read_file_config(&path).map(Some)
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    debug!(path = %path.display(), "config file loaded");
    Ok(config)
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Builds the pipeline configuration: CLI over file over defaults.
pub fn build_fetch_config(args: &Args, file: Option<&FileConfig>) -> FetchConfig {
    let file = file.cloned().unwrap_or_default();

    let mut config = if args.permissive || file.permissive == Some(true) {
        FetchConfig::permissive()
    } else {
        FetchConfig::default()
    };

    if let Some(dir) = args.output_dir.clone().or(file.output_dir) {
        config.download_dir = dir;
    }
    if let Some(name) = file.ledger_file_name {
        config.ledger_file_name = name;
    }
    if let Some(mb) = args.max_size_mb.or(file.max_size_mb) {
        config.max_file_size = mb * BYTES_PER_MIB;
    }
    if let Some(secs) = args.timeout.or(file.timeout_secs) {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.probe_timeout_secs {
        config.probe_timeout = Duration::from_secs(secs);
    }
    if let Some(redirects) = args.max_redirects.or(file.max_redirects) {
        config.max_redirects = usize::from(redirects);
    }

    if let Some(head_probe) = file.head_probe {
        config.head_probe = head_probe;
    }
    if let Some(enforce) = file.enforce_content_type {
        config.enforce_content_type = enforce;
    }
    if let Some(deduplicate) = file.deduplicate {
        config.deduplicate = deduplicate;
    }
    if let Some(allow) = file.allow_local_addresses {
        config.allow_local_addresses = allow;
    }

    if args.no_head {
        config.head_probe = false;
    }
    if args.permissive {
        config.enforce_content_type = false;
        config.deduplicate = false;
    }
    if args.allow_local_addresses {
        config.allow_local_addresses = true;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["image-fetcher"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config_str(
            r#"
output_dir = "/data/images"
max_size_mb = 10
timeout_secs = 5
max_redirects = 3
head_probe = false
deduplicate = true
"#,
        )
        .unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("/data/images")));
        assert_eq!(config.max_size_mb, Some(10));
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.max_redirects, Some(3));
        assert_eq!(config.head_probe, Some(false));
    }

    #[test]
    fn test_parse_empty_config_is_default() {
        assert_eq!(parse_config_str("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_config_str("concurency = 3").unwrap_err();
        assert!(format!("{err:#}").contains("concurency"), "{err:#}");
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for raw in [
            "timeout_secs = 0",
            "probe_timeout_secs = 3601",
            "max_redirects = 51",
            "max_size_mb = 0",
            "max_size_mb = 2048",
            "ledger_file_name = \"../ledger.json\"",
        ] {
            assert!(parse_config_str(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let result = load_file_config(Some(&temp.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_size_mb = 2\n").unwrap();

        let config = load_file_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.max_size_mb, Some(2));
    }

    #[test]
    fn test_defaults_without_file_or_flags() {
        let config = build_fetch_config(&args(&[]), None);
        assert_eq!(config, FetchConfig::default());
    }

    #[test]
    fn test_file_values_apply() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("pics")),
            max_size_mb: Some(2),
            timeout_secs: Some(7),
            head_probe: Some(false),
            ..FileConfig::default()
        };
        let config = build_fetch_config(&args(&[]), Some(&file));
        assert_eq!(config.download_dir, PathBuf::from("pics"));
        assert_eq!(config.max_file_size, 2 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert!(!config.head_probe);
        assert!(config.enforce_content_type);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("pics")),
            max_size_mb: Some(2),
            allow_local_addresses: Some(false),
            ..FileConfig::default()
        };
        let config = build_fetch_config(
            &args(&["-o", "elsewhere", "-m", "5", "--allow-local-addresses"]),
            Some(&file),
        );
        assert_eq!(config.download_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
        assert!(config.allow_local_addresses);
    }

    #[test]
    fn test_permissive_profile_from_file_can_be_refined() {
        let file = FileConfig {
            permissive: Some(true),
            deduplicate: Some(true),
            ..FileConfig::default()
        };
        let config = build_fetch_config(&args(&[]), Some(&file));
        assert!(!config.enforce_content_type);
        assert!(!config.head_probe);
        assert!(config.deduplicate);
    }

    #[test]
    fn test_permissive_flag_wins_over_file_toggles() {
        let file = FileConfig {
            deduplicate: Some(true),
            enforce_content_type: Some(true),
            ..FileConfig::default()
        };
        let config = build_fetch_config(&args(&["--permissive"]), Some(&file));
        assert!(!config.enforce_content_type);
        assert!(!config.deduplicate);
    }
}
