use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::Config;
use crate::error::InsightsError;
use crate::insights::{Invocation, TaskInsights};
use crate::providers::azure::Connection;
use crate::providers::{AzureApi, PullRequestRef, RunContext};

/// Every argument falls back to the variable the Azure DevOps agent exports for it.
#[derive(Parser, Debug)]
#[command(name = "pr-insights")]
#[command(
    author,
    version,
    about = "Annotates pull requests with pipeline failures and long running validations",
    long_about = None
)]
pub struct Cli {
    /// `build` or `release`
    #[arg(long, env = "SYSTEM_HOSTTYPE", default_value = "build")]
    host_type: String,

    /// Organization URL, e.g. https://dev.azure.com/org/
    #[arg(long, env = "SYSTEM_TEAMFOUNDATIONCOLLECTIONURI")]
    collection_uri: Option<String>,

    /// Release management URL, derived from the collection URL when absent
    #[arg(long, env = "PR_INSIGHTS_RELEASE_URI")]
    release_uri: Option<String>,

    #[arg(long, env = "SYSTEM_ACCESSTOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(short = 'P', long, env = "SYSTEM_TEAMPROJECT")]
    project: Option<String>,

    #[arg(short, long, env = "BUILD_REPOSITORY_NAME")]
    repository: Option<String>,

    /// Unset or non-numeric outside of pull request runs
    #[arg(long, env = "SYSTEM_PULLREQUEST_PULLREQUESTID")]
    pull_request_id: Option<String>,

    /// Commit the run was queued for
    #[arg(long, env = "BUILD_SOURCEVERSION")]
    source_commit: Option<String>,

    #[arg(long, env = "BUILD_BUILDID")]
    build_id: Option<u64>,

    #[arg(long, env = "RELEASE_RELEASEID")]
    release_id: Option<u64>,

    #[arg(long, env = "RELEASE_ENVIRONMENTID")]
    release_environment_id: Option<u64>,

    #[arg(long, env = "INPUT_LONGRUNNINGVALIDATIONPERCENTILE")]
    percentile: Option<f64>,

    #[arg(long, env = "INPUT_LONGRUNNINGVALIDATIONMINIMUMDURATION")]
    minimum_duration_seconds: Option<u64>,

    #[arg(long, env = "INPUT_LONGRUNNINGVALIDATIONMINIMUMREGRESSION")]
    minimum_regression_seconds: Option<u64>,

    /// Comma separated record types, e.g. `task,job`
    #[arg(long, env = "INPUT_LONGRUNNINGVALIDATIONTASKTYPES", value_delimiter = ',')]
    task_types: Option<Vec<String>>,

    #[arg(long, env = "INPUT_CHECKSTATUSLINK")]
    status_link: Option<String>,

    #[arg(
        long,
        env = "INPUT_ENABLELONGRUNNINGVALIDATIONANALYSIS",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    long_running_analysis: Option<bool>,

    /// Analysis configuration file (TOML, JSON or YAML)
    #[arg(short, long, env = "PR_INSIGHTS_CONFIG")]
    config: Option<PathBuf>,
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| InsightsError::Config(format!("{name} is required")).into())
}

impl Cli {
    fn pull_request_id(&self) -> Option<u64> {
        self.pull_request_id
            .as_deref()
            .and_then(|id| id.trim().parse().ok())
    }

    /// File configuration with every value given on the command line applied on top.
    fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        let analysis = &mut config.analysis;

        if let Some(percentile) = self.percentile {
            analysis.percentile = percentile;
        }
        if let Some(seconds) = self.minimum_duration_seconds {
            analysis.minimum_duration_seconds = seconds;
        }
        if let Some(seconds) = self.minimum_regression_seconds {
            analysis.minimum_regression_seconds = seconds;
        }
        if let Some(task_types) = &self.task_types {
            analysis.task_types = task_types.clone();
        }
        if let Some(enabled) = self.long_running_analysis {
            analysis.long_running_analysis = enabled;
        }
        if let Some(link) = &self.status_link {
            config.comment.status_link = Some(link.clone());
        }

        Ok(config)
    }

    pub async fn execute(&self) -> Result<()> {
        let Some(pull_request_id) = self.pull_request_id() else {
            info!("Not running for a pull request, nothing to annotate");
            return Ok(());
        };

        let settings = self.config()?.settings()?;
        debug!("settings: {settings:?}");

        let project = required(&self.project, "project")?;
        let connection = Connection {
            host_type: self.host_type.clone(),
            collection_uri: required(&self.collection_uri, "collection-uri")?,
            release_uri: self.release_uri.clone().filter(|uri| !uri.trim().is_empty()),
            token: self.token.as_deref().map(Token::from),
        };
        let api = AzureApi::create(&connection)?;
        debug!("host type: {:?}", api.host_type());

        let invocation = Invocation {
            pull_request: PullRequestRef {
                id: pull_request_id,
                repository: required(&self.repository, "repository")?,
                project: project.clone(),
            },
            run: RunContext {
                project,
                build_id: self.build_id,
                release_id: self.release_id,
                release_environment_id: self.release_environment_id,
            },
            source_commit: self.source_commit.clone().filter(|c| !c.trim().is_empty()),
        };

        info!("Collecting insights for pull request {pull_request_id}");
        let outcome = TaskInsights::new(&api, &settings)
            .invoke(&invocation)
            .await
            .with_context(|| format!("Failed to annotate pull request {pull_request_id}"))?;
        info!("Finished: {outcome:?}");

        Ok(())
    }
}
