//! Run configuration resolved from CLI flags and the environment.
//!
//! Flags win over environment variables; the resolved config is validated
//! before any network or file access happens.
use crate::cli::{ApiKind, RootArgs};
use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Paged catalog endpoint (requires a key).
pub const PAGED_API_URL: &str = "https://api.steampowered.com/IStoreService/GetAppList/v1/";
/// Single-call catalog endpoint.
pub const LEGACY_API_URL: &str = "https://api.steampowered.com/ISteamApps/GetAppList/v2/";
/// Environment variable carrying the API key.
pub const API_KEY_ENV: &str = "STEAM_API_KEY";
/// Environment variable naming the CI output channel file.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Typed paths for every file a run reads or writes.
#[derive(Debug, Clone)]
pub struct RunPaths {
    data_dir: PathBuf,
    overrides_dir: PathBuf,
}

impl RunPaths {
    pub fn new(data_dir: PathBuf, overrides_dir: PathBuf) -> Self {
        Self {
            data_dir,
            overrides_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Return the pretty-printed `marketable_apps.json` path.
    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join("marketable_apps.json")
    }

    /// Return the minified `marketable_apps.min.json` path.
    pub fn output_min_path(&self) -> PathBuf {
        self.data_dir.join("marketable_apps.min.json")
    }

    /// Return the `removal_history.json` path.
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("removal_history.json")
    }

    /// Apps known to be marketable but missing from the catalog feed.
    pub fn marketable_overrides_path(&self) -> PathBuf {
        self.overrides_dir.join("marketable_app_overrides.json")
    }

    /// Apps present in the catalog feed that are known to be unmarketable.
    pub fn unmarketable_overrides_path(&self) -> PathBuf {
        self.overrides_dir.join("unmarketable_app_overrides.json")
    }
}

/// Catalog endpoint selection with its credential.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub kind: ApiKind,
    pub url: String,
    pub key: Option<String>,
    pub timeout: Duration,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub paths: RunPaths,
    pub api: ApiConfig,
    /// `None` disables the stabilizer.
    pub removal_threshold: Option<u32>,
    pub max_removals: Option<usize>,
    pub github_output: Option<PathBuf>,
}

impl RunConfig {
    /// Resolve flags against the process environment.
    pub fn from_args(args: RootArgs) -> Result<Self> {
        let key = args
            .api_key
            .or_else(|| env::var(API_KEY_ENV).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let github_output = args
            .github_output
            .or_else(|| env::var_os(GITHUB_OUTPUT_ENV).map(PathBuf::from))
            .filter(|path| !path.as_os_str().is_empty());
        let url = args.api_url.unwrap_or_else(|| match args.api {
            ApiKind::Paged => PAGED_API_URL.to_string(),
            ApiKind::Legacy => LEGACY_API_URL.to_string(),
        });

        let config = RunConfig {
            paths: RunPaths::new(args.data_dir, args.overrides_dir),
            api: ApiConfig {
                kind: args.api,
                url,
                key,
                timeout: Duration::from_secs(args.timeout_secs),
            },
            removal_threshold: (!args.no_debounce).then_some(args.removal_threshold),
            max_removals: args.max_removals,
            github_output,
        };
        validate_config(&config)?;
        Ok(config)
    }
}

/// Reject settings that would make the run meaningless or loop forever.
pub fn validate_config(config: &RunConfig) -> Result<()> {
    if config.api.url.trim().is_empty() {
        return Err(anyhow!("catalog URL must be non-empty"));
    }
    if config.api.timeout.is_zero() {
        return Err(anyhow!("--timeout-secs must be at least 1"));
    }
    if config.removal_threshold == Some(0) {
        return Err(anyhow!(
            "--removal-threshold must be at least 1 (use --no-debounce to disable)"
        ));
    }
    if config.api.kind == ApiKind::Paged && config.api.key.is_none() {
        return Err(anyhow!(
            "paged catalog requires an API key (--api-key or {API_KEY_ENV})"
        ));
    }
    Ok(())
}
