mod build;
mod client;
mod git;
mod links;
mod release;
pub mod types;


use std::str::FromStr;

use async_trait::async_trait;
use log::debug;

use self::build::BuildSource;
use self::client::AzureClient;
use self::git::GitApi;
use self::release::ReleaseSource;
use self::types::{
    Comment, CommentThread, CommentUpdate, Definition, NewCommentThread, ThreadStatusUpdate,
};
use super::{PipelineApi, PullRequestRef, RunContext};
use crate::auth::Token;
use crate::error::{InsightsError, Result};
use crate::pipeline::Pipeline;
use crate::pull_request::PullRequest;

pub use links::release_management_url;

/// Kind of pipeline the process runs inside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostType {
    Build,
    Release,
}

impl FromStr for HostType {
    type Err = InsightsError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "build" => Ok(Self::Build),
            "release" => Ok(Self::Release),
            _ => Err(InsightsError::HostType(value.to_string())),
        }
    }
}

/// Connection parameters for an Azure DevOps organization.
#[derive(Debug, Clone)]
pub struct Connection {
    pub host_type: String,
    pub collection_uri: String,
    /// Overrides the release management URL derived from `collection_uri`.
    pub release_uri: Option<String>,
    pub token: Option<Token>,
}

enum PipelineSource {
    Build(BuildSource),
    Release(ReleaseSource),
}

/// Azure DevOps implementation of [`PipelineApi`].
pub struct AzureApi {
    git: GitApi,
    source: PipelineSource,
}

impl AzureApi {
    /// Creates the API for the host type named in `connection`.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::HostType`] for anything but "build" or "release", and
    /// [`InsightsError::Config`] when a URL cannot be used as an API root.
    pub fn create(connection: &Connection) -> Result<Self> {
        let host_type: HostType = connection.host_type.parse()?;
        debug!("host type: {host_type:?}");

        let git = GitApi::new(AzureClient::new(
            &connection.collection_uri,
            connection.token.clone(),
        )?);

        let source = match host_type {
            HostType::Build => PipelineSource::Build(BuildSource::new(AzureClient::new(
                &connection.collection_uri,
                connection.token.clone(),
            )?)),
            HostType::Release => {
                let release_uri = match &connection.release_uri {
                    Some(uri) => uri.clone(),
                    None => release_management_url(&connection.collection_uri)?,
                };
                PipelineSource::Release(ReleaseSource::new(AzureClient::new(
                    &release_uri,
                    connection.token.clone(),
                )?))
            }
        };

        Ok(Self { git, source })
    }

    pub fn host_type(&self) -> HostType {
        match self.source {
            PipelineSource::Build(_) => HostType::Build,
            PipelineSource::Release(_) => HostType::Release,
        }
    }
}

#[async_trait]
impl PipelineApi for AzureApi {
    async fn get_pull_request(
        &self,
        repository: &str,
        pull_request_id: u64,
        project: &str,
    ) -> Result<PullRequest> {
        let reference = PullRequestRef {
            id: pull_request_id,
            repository: repository.to_string(),
            project: project.to_string(),
        };
        let data = self.git.get_pull_request(&reference).await?;
        Ok(PullRequest::new(reference, data))
    }

    async fn get_current_pipeline(&self, run: &RunContext) -> Result<Box<dyn Pipeline>> {
        match &self.source {
            PipelineSource::Build(source) => source.current(&run.project, run.build_id).await,
            PipelineSource::Release(source) => {
                source
                    .current(&run.project, run.release_id, run.release_environment_id)
                    .await
            }
        }
    }

    async fn get_most_recent_pipelines_of_current_type(
        &self,
        project: &str,
        current: &dyn Pipeline,
        max_count: usize,
        branch_name: &str,
    ) -> Result<Vec<Box<dyn Pipeline>>> {
        match &self.source {
            PipelineSource::Build(source) => {
                source.most_recent(project, current, max_count, branch_name).await
            }
            PipelineSource::Release(source) => {
                source.most_recent(project, current, max_count, branch_name).await
            }
        }
    }

    async fn get_definition(&self, project: &str, definition_id: u64) -> Result<Definition> {
        match &self.source {
            PipelineSource::Build(source) => source.definition(project, definition_id).await,
            PipelineSource::Release(source) => source.definition(project, definition_id).await,
        }
    }

    async fn get_comment_threads(&self, pull_request: &PullRequestRef) -> Result<Vec<CommentThread>> {
        self.git.get_threads(pull_request).await
    }

    async fn post_new_comment_thread(
        &self,
        thread: &NewCommentThread,
        pull_request: &PullRequestRef,
    ) -> Result<CommentThread> {
        self.git.create_thread(thread, pull_request).await
    }

    async fn update_comment_thread(
        &self,
        update: &ThreadStatusUpdate,
        pull_request: &PullRequestRef,
        thread_id: u64,
    ) -> Result<CommentThread> {
        self.git.update_thread(update, pull_request, thread_id).await
    }

    async fn update_comment(
        &self,
        update: &CommentUpdate,
        pull_request: &PullRequestRef,
        thread_id: u64,
        comment_id: u64,
    ) -> Result<Comment> {
        self.git
            .update_comment(update, pull_request, thread_id, comment_id)
            .await
    }

    async fn delete_comment(
        &self,
        pull_request: &PullRequestRef,
        thread_id: u64,
        comment_id: u64,
    ) -> Result<()> {
        self.git
            .delete_comment(pull_request, thread_id, comment_id)
            .await
    }
}
