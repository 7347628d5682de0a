//! One annotation run: judge the current pipeline against its target branch and
//! record the verdict in the pull request's service comment.

use log::{debug, info};

use crate::branch::Branch;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::providers::{PipelineApi, PullRequestRef, RunContext, ThreadStatus};
use crate::pull_request::StaleThreadPolicy;
use crate::table::{self, LongRunningValidation, Section, TableKind};

/// Analysis parameters, resolved once before the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Percentile of branch history durations a task must exceed, in (0, 100].
    pub percentile: f64,
    pub pipelines_to_query: usize,
    /// Complete target branch runs considered for the health verdict.
    pub health_window: usize,
    pub minimum_duration_ms: i64,
    pub minimum_regression_ms: i64,
    /// Lowercased record types eligible for long-running analysis. Empty allows all.
    pub task_types: Vec<String>,
    pub long_running_analysis: bool,
    pub report_recovery: bool,
    pub stale_threads: StaleThreadPolicy,
    pub status_link: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            percentile: 1.0,
            pipelines_to_query: 10,
            health_window: 3,
            minimum_duration_ms: 0,
            minimum_regression_ms: 0,
            task_types: vec!["task".to_string()],
            long_running_analysis: true,
            report_recovery: false,
            stale_threads: StaleThreadPolicy::Delete,
            status_link: None,
        }
    }
}

/// Where the run happens and which pull request it annotates.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub pull_request: PullRequestRef,
    pub run: RunContext,
    /// Iteration this run was queued for, when the host knows it.
    pub source_commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The pull request moved on since this run was queued.
    StaleIteration,
    NothingToReport,
    Edited { thread_id: u64 },
    Posted { thread_id: u64, retired: usize },
}

pub struct TaskInsights<'a> {
    api: &'a dyn PipelineApi,
    settings: &'a Settings,
}

impl<'a> TaskInsights<'a> {
    pub fn new(api: &'a dyn PipelineApi, settings: &'a Settings) -> Self {
        Self { api, settings }
    }

    pub async fn invoke(&self, invocation: &Invocation) -> Result<Outcome> {
        let reference = &invocation.pull_request;
        let project = reference.project.as_str();
        let pull_request = self
            .api
            .get_pull_request(&reference.repository, reference.id, project)
            .await?;

        if let Some(commit) = invocation.source_commit.as_deref() {
            if !pull_request.most_recent_source_commit_matches(commit) {
                info!(
                    "Run was queued for {commit}, pull request {} is now at {}; skipping",
                    reference.id,
                    pull_request.most_recent_source_commit_id().unwrap_or("an unknown commit")
                );
                return Ok(Outcome::StaleIteration);
            }
        }

        let current = self.api.get_current_pipeline(&invocation.run).await?;
        let target_name = pull_request.target_branch_name().to_string();
        debug!("target branch: {target_name}");

        let history = self
            .api
            .get_most_recent_pipelines_of_current_type(
                project,
                current.as_ref(),
                self.settings.pipelines_to_query,
                &target_name,
            )
            .await?;
        let target = Branch::new(target_name, history);
        debug!("number of retrieved pipelines on {}: {}", target.name(), target.len());
        if target.is_empty() {
            info!("No history on {}, every task lacks a duration threshold", target.name());
        }

        let is_failure = current.is_failure();
        debug!("current pipeline is failure: {is_failure}");

        // A failing run is reported as a failure only.
        let long_running = if self.settings.long_running_analysis && !is_failure {
            find_long_running_validations(current.as_ref(), &target, self.settings)
        } else {
            Vec::new()
        };
        let report_recovery = self.settings.report_recovery && !is_failure && long_running.is_empty();

        if !is_failure && long_running.is_empty() && !report_recovery {
            info!("No failure or long running validation to report");
            return Ok(Outcome::NothingToReport);
        }

        let service_threads = pull_request
            .get_current_service_comment_threads(self.api)
            .await?;
        let mut comment = pull_request.make_current_iteration_comment(&service_threads);
        debug!("current comment content: {}", comment.content());

        let status_link = match &self.settings.status_link {
            Some(link) => link.clone(),
            None => current.definition_link(self.api, project).await?,
        };
        debug!("status link: {status_link}");

        let section = Section {
            current: current.as_ref(),
            status_link: &status_link,
            target: &target,
            health_window: self.settings.health_window,
            long_running: &long_running,
        };

        let mut body = comment.content().to_string();
        if is_failure || report_recovery {
            let mut failures = table::create(TableKind::Failure, &body);
            if is_failure {
                failures.add_header(target.truncated_name(), self.settings.percentile);
            }
            failures.add_section(&section);
            body = failures.current_comment_data();
        }
        if !long_running.is_empty() {
            let mut slow = table::create(TableKind::LongRunningValidations, &body);
            slow.add_header(target.truncated_name(), self.settings.percentile);
            slow.add_section(&section);
            body = slow.current_comment_data();
        }

        if body == comment.content() {
            info!("Comment is already up to date");
            return Ok(Outcome::NothingToReport);
        }

        if let Some(thread_id) = comment.thread_id().filter(|_| comment.exists()) {
            comment.set_content(body);
            pull_request.edit_service_comment(self.api, &comment).await?;
            info!("Edited comment of thread {thread_id}");
            return Ok(Outcome::Edited { thread_id });
        }

        let posted = pull_request
            .post_new_thread(self.api, &body, ThreadStatus::Closed)
            .await?;
        info!(
            "Posted thread {} on pull request {}",
            posted.id,
            pull_request.reference().id
        );

        let retired = pull_request
            .retire_old_comments(
                self.api,
                self.settings.stale_threads,
                &service_threads,
                posted.id,
            )
            .await?;
        debug!("retired {retired} stale threads");

        Ok(Outcome::Posted {
            thread_id: posted.id,
            retired,
        })
    }
}

/// Tasks of `current` that ran longer than the configured percentile of the same
/// task on `target`, beyond the minimum duration and regression.
pub fn find_long_running_validations(
    current: &dyn Pipeline,
    target: &Branch,
    settings: &Settings,
) -> Vec<LongRunningValidation> {
    current
        .tasks()
        .iter()
        .filter(|task| {
            settings.task_types.is_empty()
                || settings.task_types.iter().any(|kind| kind == task.kind())
        })
        .filter_map(|task| {
            let threshold = target.percentile_time_for_pipeline_task(settings.percentile, task);
            if !task.is_long_running(threshold) {
                return None;
            }
            let (duration, threshold) = (task.duration()?, threshold?);
            if duration < settings.minimum_duration_ms
                || duration - threshold < settings.minimum_regression_ms
            {
                debug!("{} overran by less than the configured minimum", task.name());
                return None;
            }
            Some(LongRunningValidation {
                name: task.name().to_string(),
                duration_ms: duration,
                threshold_ms: threshold,
            })
        })
        .collect()
}
