//! In-memory fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{InsightsError, Result};
use crate::pipeline::{Pipeline, PipelineTask};
use crate::providers::{
    Comment, CommentThread, CommentUpdate, Definition, NewCommentThread, PipelineApi,
    PropertyValue, PullRequestData, PullRequestRef, RunContext, ThreadStatusUpdate,
};
use crate::pull_request::{PullRequest, ITERATION_PROPERTY_NAME, TASK_PROPERTY_NAME, TASK_PROPERTY_VALUE};

#[derive(Debug, Clone)]
pub struct FakePipeline {
    pub id: u64,
    pub definition_id: u64,
    pub definition_name: String,
    pub display_name: String,
    pub link: String,
    pub complete: bool,
    pub failed: bool,
    pub tasks: Vec<PipelineTask>,
    pub definition_link: String,
}

impl FakePipeline {
    fn with_status(id: u64, complete: bool, failed: bool) -> Self {
        Self {
            id,
            definition_id: 7,
            definition_name: "ci".to_string(),
            display_name: format!("20190523.{id}"),
            link: format!("https://dev.azure.com/org/project/_build/results?buildId={id}"),
            complete,
            failed,
            tasks: Vec::new(),
            definition_link: "https://dev.azure.com/org/project/_build?definitionId=7".to_string(),
        }
    }

    pub fn passed(id: u64) -> Self {
        Self::with_status(id, true, false)
    }

    pub fn failed(id: u64) -> Self {
        Self::with_status(id, true, true)
    }

    pub fn running(id: u64) -> Self {
        Self::with_status(id, false, false)
    }

    pub fn with_tasks(mut self, tasks: Vec<PipelineTask>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn named(mut self, definition_name: &str) -> Self {
        self.definition_name = definition_name.to_string();
        self
    }
}

#[async_trait]
impl Pipeline for FakePipeline {
    fn id(&self) -> u64 {
        self.id
    }

    fn definition_id(&self) -> u64 {
        self.definition_id
    }

    fn definition_name(&self) -> &str {
        &self.definition_name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn link(&self) -> &str {
        &self.link
    }

    fn tasks(&self) -> &[PipelineTask] {
        &self.tasks
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn completed_with_failure(&self) -> bool {
        self.failed
    }

    async fn definition_link(&self, _api: &dyn PipelineApi, _project: &str) -> Result<String> {
        Ok(self.definition_link.clone())
    }
}

/// Service thread for `iteration` whose comments carry `contents`, ids from 1.
pub fn service_thread(id: u64, iteration: &str, contents: &[&str]) -> CommentThread {
    CommentThread {
        id,
        status: Some(crate::providers::ThreadStatus::Active),
        comments: comments(contents.iter().map(|c| c.to_string())),
        properties: Some(HashMap::from([
            (
                TASK_PROPERTY_NAME.to_string(),
                PropertyValue::string(TASK_PROPERTY_VALUE),
            ),
            (
                ITERATION_PROPERTY_NAME.to_string(),
                PropertyValue::string(iteration),
            ),
        ])),
    }
}

fn comments(contents: impl Iterator<Item = String>) -> Vec<Comment> {
    contents
        .enumerate()
        .map(|(i, content)| Comment {
            id: i as u64 + 1,
            content: Some(content),
            is_deleted: false,
        })
        .collect()
}

#[derive(Debug, Default)]
struct FakeState {
    threads: Vec<CommentThread>,
    next_thread_id: u64,
    calls: Vec<String>,
    queried_branches: Vec<String>,
}

/// [`PipelineApi`] over in-memory data. Writes are applied to the stored threads
/// and recorded in a call log.
pub struct FakeApi {
    target_branch: String,
    last_merge_commit: Option<String>,
    current: Option<FakePipeline>,
    history: Vec<FakePipeline>,
    fail_posts: bool,
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            target_branch: "refs/heads/master".to_string(),
            last_merge_commit: Some("Y".to_string()),
            current: None,
            history: Vec::new(),
            fail_posts: false,
            state: Mutex::new(FakeState {
                next_thread_id: 100,
                ..FakeState::default()
            }),
        }
    }

    pub fn with_threads(self, threads: Vec<CommentThread>) -> Self {
        self.state.lock().unwrap().threads = threads;
        self
    }

    pub fn with_last_merge_commit(mut self, commit: Option<&str>) -> Self {
        self.last_merge_commit = commit.map(str::to_string);
        self
    }

    pub fn with_current(mut self, current: FakePipeline) -> Self {
        self.current = Some(current);
        self
    }

    pub fn with_history(mut self, history: Vec<FakePipeline>) -> Self {
        self.history = history;
        self
    }

    pub fn failing_posts(mut self) -> Self {
        self.fail_posts = true;
        self
    }

    /// Write operations performed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn threads(&self) -> Vec<CommentThread> {
        self.state.lock().unwrap().threads.clone()
    }

    pub fn queried_branches(&self) -> Vec<String> {
        self.state.lock().unwrap().queried_branches.clone()
    }

    fn not_found(what: String) -> InsightsError {
        InsightsError::ApiError {
            status: 404,
            message: format!("{what} not found"),
        }
    }
}

#[async_trait]
impl PipelineApi for FakeApi {
    async fn get_pull_request(
        &self,
        repository: &str,
        pull_request_id: u64,
        project: &str,
    ) -> Result<PullRequest> {
        let data: PullRequestData = serde_json::from_value(serde_json::json!({
            "pullRequestId": pull_request_id,
            "targetRefName": self.target_branch,
            "lastMergeCommit": self.last_merge_commit.as_ref().map(|c| serde_json::json!({"commitId": c})),
        }))?;
        let reference = PullRequestRef {
            id: pull_request_id,
            repository: repository.to_string(),
            project: project.to_string(),
        };
        Ok(PullRequest::new(reference, data))
    }

    async fn get_current_pipeline(&self, _run: &RunContext) -> Result<Box<dyn Pipeline>> {
        self.current
            .clone()
            .map(|p| Box::new(p) as Box<dyn Pipeline>)
            .ok_or_else(|| Self::not_found("current pipeline".to_string()))
    }

    async fn get_most_recent_pipelines_of_current_type(
        &self,
        _project: &str,
        _current: &dyn Pipeline,
        max_count: usize,
        branch_name: &str,
    ) -> Result<Vec<Box<dyn Pipeline>>> {
        self.state
            .lock()
            .unwrap()
            .queried_branches
            .push(branch_name.to_string());
        Ok(self
            .history
            .iter()
            .take(max_count)
            .cloned()
            .map(|p| Box::new(p) as Box<dyn Pipeline>)
            .collect())
    }

    async fn get_definition(&self, _project: &str, definition_id: u64) -> Result<Definition> {
        Ok(serde_json::from_value(serde_json::json!({
            "id": definition_id,
            "name": "ci",
            "_links": {"web": {"href": format!("https://dev.azure.com/org/project/_build?definitionId={definition_id}")}}
        }))?)
    }

    async fn get_comment_threads(&self, _pull_request: &PullRequestRef) -> Result<Vec<CommentThread>> {
        Ok(self.threads())
    }

    async fn post_new_comment_thread(
        &self,
        thread: &NewCommentThread,
        _pull_request: &PullRequestRef,
    ) -> Result<CommentThread> {
        if self.fail_posts {
            return Err(InsightsError::ApiError {
                status: 500,
                message: "thread could not be created".to_string(),
            });
        }
        let mut state = self.state.lock().unwrap();
        let id = state.next_thread_id;
        state.next_thread_id += 1;
        let created = CommentThread {
            id,
            status: Some(thread.status),
            comments: comments(thread.comments.iter().map(|c| c.content.clone())),
            properties: Some(thread.properties.clone()),
        };
        state.threads.push(created.clone());
        state.calls.push(format!("post_new_comment_thread {id}"));
        Ok(created)
    }

    async fn update_comment_thread(
        &self,
        update: &ThreadStatusUpdate,
        _pull_request: &PullRequestRef,
        thread_id: u64,
    ) -> Result<CommentThread> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("update_comment_thread {thread_id} {:?}", update.status));
        let thread = state
            .threads
            .iter_mut()
            .find(|t| t.id == thread_id)
            .ok_or_else(|| Self::not_found(format!("thread {thread_id}")))?;
        thread.status = Some(update.status);
        Ok(thread.clone())
    }

    async fn update_comment(
        &self,
        update: &CommentUpdate,
        _pull_request: &PullRequestRef,
        thread_id: u64,
        comment_id: u64,
    ) -> Result<Comment> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("update_comment {thread_id}/{comment_id}"));
        let comment = state
            .threads
            .iter_mut()
            .find(|t| t.id == thread_id)
            .and_then(|t| t.comments.iter_mut().find(|c| c.id == comment_id))
            .ok_or_else(|| Self::not_found(format!("comment {thread_id}/{comment_id}")))?;
        comment.content = Some(update.content.clone());
        Ok(comment.clone())
    }

    async fn delete_comment(
        &self,
        _pull_request: &PullRequestRef,
        thread_id: u64,
        comment_id: u64,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("delete_comment {thread_id}/{comment_id}"));
        let comment = state
            .threads
            .iter_mut()
            .find(|t| t.id == thread_id)
            .and_then(|t| t.comments.iter_mut().find(|c| c.id == comment_id))
            .ok_or_else(|| Self::not_found(format!("comment {thread_id}/{comment_id}")))?;
        comment.is_deleted = true;
        Ok(())
    }
}
