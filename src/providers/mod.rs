pub mod azure;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::pull_request::PullRequest;

pub use azure::types::{
    BuildData, BuildResult, BuildStatus, Comment, CommentThread, CommentUpdate, Definition,
    DeploymentAttempt, DeploymentStatus, Links, NewComment, NewCommentThread, PropertyValue,
    PullRequestData, ReleaseData, ReleaseTask, ReleaseTaskStatus, TaskResult, ThreadStatus,
    ThreadStatusUpdate, Timeline, TimelineRecord, TimelineRecordState,
};
pub use azure::AzureApi;

/// Coordinates of the pull request a run annotates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub id: u64,
    pub repository: String,
    pub project: String,
}

/// Identifies the pipeline run this process executes inside of.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub project: String,
    pub build_id: Option<u64>,
    pub release_id: Option<u64>,
    pub release_environment_id: Option<u64>,
}

/// Everything the annotation logic needs from the CI service.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn get_pull_request(
        &self,
        repository: &str,
        pull_request_id: u64,
        project: &str,
    ) -> Result<PullRequest>;

    /// Run this process executes inside of, build or release depending on the host.
    async fn get_current_pipeline(&self, run: &RunContext) -> Result<Box<dyn Pipeline>>;

    /// Most recent runs of the current run's definition on `branch_name`, newest first.
    async fn get_most_recent_pipelines_of_current_type(
        &self,
        project: &str,
        current: &dyn Pipeline,
        max_count: usize,
        branch_name: &str,
    ) -> Result<Vec<Box<dyn Pipeline>>>;

    async fn get_definition(&self, project: &str, definition_id: u64) -> Result<Definition>;

    async fn get_comment_threads(&self, pull_request: &PullRequestRef) -> Result<Vec<CommentThread>>;

    async fn post_new_comment_thread(
        &self,
        thread: &NewCommentThread,
        pull_request: &PullRequestRef,
    ) -> Result<CommentThread>;

    async fn update_comment_thread(
        &self,
        update: &ThreadStatusUpdate,
        pull_request: &PullRequestRef,
        thread_id: u64,
    ) -> Result<CommentThread>;

    async fn update_comment(
        &self,
        update: &CommentUpdate,
        pull_request: &PullRequestRef,
        thread_id: u64,
        comment_id: u64,
    ) -> Result<Comment>;

    async fn delete_comment(
        &self,
        pull_request: &PullRequestRef,
        thread_id: u64,
        comment_id: u64,
    ) -> Result<()>;
}
