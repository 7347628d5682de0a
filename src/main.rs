mod auth;
mod branch;
mod cli;
mod config;
mod error;
mod insights;
mod pipeline;
mod providers;
mod pull_request;
mod table;

#[cfg(test)]
mod testing;

use clap::error::ErrorKind;
use clap::Parser;
use cli::Cli;
use log::{error, info};

/// Annotating the pull request is best effort: failures are reported, never
/// propagated to the pipeline running this step.
#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            report_failure(&anyhow::Error::new(e).context("Invalid arguments"));
            return;
        }
    };

    info!("Starting pr-insights");
    if let Err(e) = cli.execute().await {
        report_failure(&e);
    }
}

fn report_failure(e: &anyhow::Error) {
    error!("{e:#}");
    if std::env::var_os("TF_BUILD").is_some() {
        let message = format!("{e:#}").replace(['\r', '\n'], " ");
        println!("##vso[task.logissue type=warning]Pull request insights were not updated: {message}");
    }
}
