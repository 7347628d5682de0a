//! Locating, creating, editing and retiring the service's comment thread on a pull request.
//!
//! Every thread this tool posts carries two properties: a fixed service marker and the
//! iteration (last merge commit) it was posted for. A thread is *current* when its
//! iteration matches the pull request's last merge commit; every other service thread
//! is stale once a current one exists.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::providers::{
    CommentThread, CommentUpdate, NewComment, NewCommentThread, PipelineApi, PropertyValue,
    PullRequestData, PullRequestRef, ThreadStatus, ThreadStatusUpdate,
};

pub const TASK_PROPERTY_NAME: &str = "PullRequestInsights.Task";
pub const TASK_PROPERTY_VALUE: &str = "PullRequestInsights";
pub const ITERATION_PROPERTY_NAME: &str = "PullRequestInsights.Iteration";

/// What to do with service threads of earlier iterations once a new thread is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleThreadPolicy {
    /// Delete the comment of stale threads nobody replied to.
    #[default]
    Delete,
    /// Set stale active threads to closed.
    Close,
}

/// The first comment of the current iteration's service thread, or a blank one
/// when no such thread exists yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceComment {
    thread_id: Option<u64>,
    comment_id: Option<u64>,
    content: String,
}

impl ServiceComment {
    pub fn exists(&self) -> bool {
        self.thread_id.is_some() && self.comment_id.is_some()
    }

    pub fn thread_id(&self) -> Option<u64> {
        self.thread_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }
}

#[derive(Debug, Clone)]
pub struct PullRequest {
    reference: PullRequestRef,
    target_branch_name: String,
    most_recent_source_commit_id: Option<String>,
}

impl PullRequest {
    pub fn new(reference: PullRequestRef, data: PullRequestData) -> Self {
        Self {
            reference,
            target_branch_name: data.target_ref_name,
            most_recent_source_commit_id: data.last_merge_commit.map(|c| c.commit_id),
        }
    }

    pub fn reference(&self) -> &PullRequestRef {
        &self.reference
    }

    pub fn target_branch_name(&self) -> &str {
        &self.target_branch_name
    }

    pub fn most_recent_source_commit_id(&self) -> Option<&str> {
        self.most_recent_source_commit_id.as_deref()
    }

    pub fn most_recent_source_commit_matches(&self, commit_id: &str) -> bool {
        self.most_recent_source_commit_id.as_deref() == Some(commit_id)
    }

    /// Fetches every thread of the pull request and keeps those posted by this service.
    pub async fn get_current_service_comment_threads(
        &self,
        api: &dyn PipelineApi,
    ) -> Result<Vec<CommentThread>> {
        let threads = api.get_comment_threads(&self.reference).await?;
        let service_threads: Vec<CommentThread> = threads
            .into_iter()
            .filter(|thread| {
                let from_service = thread_is_from_service(thread);
                if from_service {
                    debug!("the thread: thread id = {} is from service", thread.id);
                }
                from_service
            })
            .collect();
        Ok(service_threads)
    }

    /// Service thread posted for the current iteration. Should several exist, the one
    /// with the lowest id wins.
    pub fn current_iteration_comment_thread<'a>(
        &self,
        threads: &'a [CommentThread],
    ) -> Option<&'a CommentThread> {
        let current = self.most_recent_source_commit_id.as_deref()?;
        let mut matching: Vec<&CommentThread> = threads
            .iter()
            .filter(|t| thread_is_from_service(t) && iteration_of(t) == Some(current))
            .collect();
        matching.sort_by_key(|t| t.id);

        if matching.len() > 1 {
            warn!(
                "{} service threads found for iteration {current}, using thread {}",
                matching.len(),
                matching[0].id
            );
        }
        match matching.first() {
            Some(thread) => {
                debug!(
                    "comment thread id of thread of current source commit {current}: thread id = {}",
                    thread.id
                );
                Some(*thread)
            }
            None => {
                debug!("no comment was found for iteration {current}");
                None
            }
        }
    }

    pub fn make_current_iteration_comment(&self, threads: &[CommentThread]) -> ServiceComment {
        self.current_iteration_comment_thread(threads)
            .and_then(|thread| {
                thread.live_comments().next().map(|comment| ServiceComment {
                    thread_id: Some(thread.id),
                    comment_id: Some(comment.id),
                    content: comment.content.clone().unwrap_or_default(),
                })
            })
            .unwrap_or_default()
    }

    /// Posts `content` as a new thread tagged with the service marker and current iteration.
    pub async fn post_new_thread(
        &self,
        api: &dyn PipelineApi,
        content: &str,
        status: ThreadStatus,
    ) -> Result<CommentThread> {
        let properties = HashMap::from([
            (
                TASK_PROPERTY_NAME.to_string(),
                PropertyValue::string(TASK_PROPERTY_VALUE),
            ),
            (
                ITERATION_PROPERTY_NAME.to_string(),
                PropertyValue::string(self.most_recent_source_commit_id.clone().unwrap_or_default()),
            ),
        ]);
        let thread = NewCommentThread {
            comments: vec![NewComment {
                content: content.to_string(),
                comment_type: 1,
            }],
            status,
            properties,
        };
        api.post_new_comment_thread(&thread, &self.reference).await
    }

    pub async fn edit_service_comment(
        &self,
        api: &dyn PipelineApi,
        comment: &ServiceComment,
    ) -> Result<()> {
        if let (Some(thread_id), Some(comment_id)) = (comment.thread_id, comment.comment_id) {
            let update = CommentUpdate {
                content: comment.content.clone(),
            };
            api.update_comment(&update, &self.reference, thread_id, comment_id)
                .await?;
        }
        Ok(())
    }

    /// Closes every stale service thread that is still active. Returns how many were closed.
    pub async fn deactivate_old_comments(
        &self,
        api: &dyn PipelineApi,
        service_threads: &[CommentThread],
        current_thread_id: u64,
    ) -> Result<usize> {
        let mut closed = 0;
        for thread in service_threads {
            let active = matches!(thread.status, None | Some(ThreadStatus::Active));
            if thread.id != current_thread_id && active {
                debug!("comment thread id to be deactivated: {}", thread.id);
                let update = ThreadStatusUpdate {
                    status: ThreadStatus::Closed,
                };
                api.update_comment_thread(&update, &self.reference, thread.id)
                    .await?;
                closed += 1;
            }
        }
        Ok(closed)
    }

    /// Deletes the only comment of every stale service thread. Threads somebody replied
    /// to are left alone. Returns how many were deleted.
    pub async fn delete_old_comments(
        &self,
        api: &dyn PipelineApi,
        service_threads: &[CommentThread],
        current_thread_id: u64,
    ) -> Result<usize> {
        let mut deleted = 0;
        for thread in service_threads {
            if thread.id == current_thread_id {
                continue;
            }
            let comments: Vec<_> = thread.live_comments().collect();
            if let [only] = comments.as_slice() {
                debug!("comment thread id to be deleted: {}", thread.id);
                api.delete_comment(&self.reference, thread.id, only.id)
                    .await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    pub async fn retire_old_comments(
        &self,
        api: &dyn PipelineApi,
        policy: StaleThreadPolicy,
        service_threads: &[CommentThread],
        current_thread_id: u64,
    ) -> Result<usize> {
        match policy {
            StaleThreadPolicy::Delete => {
                self.delete_old_comments(api, service_threads, current_thread_id)
                    .await
            }
            StaleThreadPolicy::Close => {
                self.deactivate_old_comments(api, service_threads, current_thread_id)
                    .await
            }
        }
    }
}

/// Carries both service properties with the expected marker and at least one live comment.
pub fn thread_is_from_service(thread: &CommentThread) -> bool {
    let marked = thread
        .property(TASK_PROPERTY_NAME)
        .and_then(PropertyValue::as_str)
        == Some(TASK_PROPERTY_VALUE);
    marked
        && thread.property(ITERATION_PROPERTY_NAME).is_some()
        && thread.live_comments().next().is_some()
}

fn iteration_of(thread: &CommentThread) -> Option<&str> {
    thread
        .property(ITERATION_PROPERTY_NAME)
        .and_then(PropertyValue::as_str)
}
