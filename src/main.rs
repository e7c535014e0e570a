use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod catalog;
mod cli;
mod config;
mod history;
mod overrides;
mod report;
mod run;
mod store;

use catalog::{CatalogSource, LegacyCatalog, PagedCatalog};
use cli::{ApiKind, RootArgs};
use config::{ApiConfig, RunConfig};
use report::{append_commit_message, Annotation};
use run::RunOutcome;

/// Environment variable holding the tracing filter for stderr diagnostics.
const LOG_ENV: &str = "MARKETABLE_APPS_LOG";

fn main() -> ExitCode {
    init_tracing();
    let args = RootArgs::parse();
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{}", Annotation::Error(format!("{err:#}")));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(args: RootArgs) -> Result<()> {
    let config = RunConfig::from_args(args)?;
    let source = build_source(&config.api)?;
    let outcome = run::run(&config, source.as_ref())?;
    for annotation in outcome.annotations() {
        println!("{annotation}");
    }
    if let (RunOutcome::Updated(summary), Some(path)) = (&outcome, &config.github_output) {
        append_commit_message(path, &summary.commit_message())?;
    }
    Ok(())
}

fn build_source(api: &ApiConfig) -> Result<Box<dyn CatalogSource>> {
    Ok(match api.kind {
        ApiKind::Legacy => Box::new(LegacyCatalog::new(api.url.as_str(), api.timeout)),
        ApiKind::Paged => {
            let key = api
                .key
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("paged catalog requires an API key"))?;
            Box::new(PagedCatalog::new(api.url.as_str(), key, api.timeout))
        }
    })
}
