//! CLI argument parsing for the hourly snapshot run.
//!
//! Every flag has a default so the scheduled job can invoke the binary with no
//! arguments; environment fallbacks are resolved in `config`.
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint for a single snapshot run.
#[derive(Parser, Debug)]
#[command(
    name = "marketable-apps",
    version,
    about = "Snapshot the set of Steam apps eligible for trading cards",
    after_help = "Environment:\n  STEAM_API_KEY          API key for the paged catalog (when --api-key is absent)\n  GITHUB_OUTPUT          File that receives COMMIT_MESSAGE=... (when --github-output is absent)\n  MARKETABLE_APPS_LOG    tracing filter for stderr diagnostics (default: info)\n\nExamples:\n  marketable-apps\n  marketable-apps --api legacy --max-removals 10000 --no-debounce\n  marketable-apps --data-dir /srv/snapshot/data --overrides-dir /srv/snapshot/overrides"
)]
pub struct RootArgs {
    /// Directory holding the output files and the removal history
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory holding the manual override lists
    #[arg(long, value_name = "DIR", default_value = "overrides")]
    pub overrides_dir: PathBuf,

    /// Catalog endpoint flavor
    #[arg(long, value_enum, default_value_t = ApiKind::Paged)]
    pub api: ApiKind,

    /// Override the catalog endpoint URL for the selected API
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// API key for the paged catalog
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Runs an app may be missing before its removal is recorded
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub removal_threshold: u32,

    /// Trust every removal immediately instead of waiting for it to persist
    #[arg(long)]
    pub no_debounce: bool,

    /// Abort without changes when more apps than this would be removed
    #[arg(long, value_name = "N")]
    pub max_removals: Option<usize>,

    /// File that receives the COMMIT_MESSAGE output line
    #[arg(long, value_name = "PATH")]
    pub github_output: Option<PathBuf>,
}

/// Which catalog endpoint to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ApiKind {
    /// `IStoreService/GetAppList/v1`, cursor-paginated and keyed
    Paged,
    /// `ISteamApps/GetAppList/v2`, one unauthenticated call
    Legacy,
}
