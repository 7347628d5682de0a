use super::client::AzureClient;
use super::types::{
    Comment, CommentThread, CommentUpdate, ListResponse, NewCommentThread, PullRequestData,
    ThreadStatusUpdate,
};
use crate::error::Result;
use crate::providers::PullRequestRef;

/// Pull request and comment thread endpoints, shared by build and release hosts.
pub struct GitApi {
    client: AzureClient,
}

impl GitApi {
    pub fn new(client: AzureClient) -> Self {
        Self { client }
    }

    fn pull_request_url(&self, pull_request: &PullRequestRef, rest: &[&str]) -> Result<url::Url> {
        let id = pull_request.id.to_string();
        let mut segments = vec![
            pull_request.project.as_str(),
            "_apis",
            "git",
            "repositories",
            pull_request.repository.as_str(),
            "pullRequests",
            id.as_str(),
        ];
        segments.extend_from_slice(rest);
        self.client.url(&segments)
    }

    pub async fn get_pull_request(&self, pull_request: &PullRequestRef) -> Result<PullRequestData> {
        let url = self.pull_request_url(pull_request, &[])?;
        self.client.get(url).await
    }

    pub async fn get_threads(&self, pull_request: &PullRequestRef) -> Result<Vec<CommentThread>> {
        let url = self.pull_request_url(pull_request, &["threads"])?;
        let response: ListResponse<CommentThread> = self.client.get(url).await?;
        Ok(response.value)
    }

    pub async fn create_thread(
        &self,
        thread: &NewCommentThread,
        pull_request: &PullRequestRef,
    ) -> Result<CommentThread> {
        let url = self.pull_request_url(pull_request, &["threads"])?;
        self.client.post(url, thread).await
    }

    pub async fn update_thread(
        &self,
        update: &ThreadStatusUpdate,
        pull_request: &PullRequestRef,
        thread_id: u64,
    ) -> Result<CommentThread> {
        let thread_id = thread_id.to_string();
        let url = self.pull_request_url(pull_request, &["threads", &thread_id])?;
        self.client.patch(url, update).await
    }

    pub async fn update_comment(
        &self,
        update: &CommentUpdate,
        pull_request: &PullRequestRef,
        thread_id: u64,
        comment_id: u64,
    ) -> Result<Comment> {
        let (thread_id, comment_id) = (thread_id.to_string(), comment_id.to_string());
        let url = self.pull_request_url(
            pull_request,
            &["threads", &thread_id, "comments", &comment_id],
        )?;
        self.client.patch(url, update).await
    }

    pub async fn delete_comment(
        &self,
        pull_request: &PullRequestRef,
        thread_id: u64,
        comment_id: u64,
    ) -> Result<()> {
        let (thread_id, comment_id) = (thread_id.to_string(), comment_id.to_string());
        let url = self.pull_request_url(
            pull_request,
            &["threads", &thread_id, "comments", &comment_id],
        )?;
        self.client.delete(url).await
    }
}
