//! Pipeline runs (builds and releases) and the tasks executed within them.

mod build;
mod release;

pub use build::Build;
pub use release::Release;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::providers::PipelineApi;

/// One step executed within a pipeline run.
///
/// Build timeline records and release deployment tasks use different status
/// vocabularies; both are reduced to the `completed` and `failed` flags when
/// the task is constructed.
#[derive(Debug, Clone)]
pub struct PipelineTask {
    name: String,
    id: String,
    kind: String,
    start_time: Option<DateTime<Utc>>,
    finish_time: Option<DateTime<Utc>>,
    completed: bool,
    failed: bool,
}

impl PipelineTask {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        kind: impl Into<String>,
        start_time: Option<DateTime<Utc>>,
        finish_time: Option<DateTime<Utc>>,
        completed: bool,
        failed: bool,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            kind: kind.into().to_lowercase(),
            start_time,
            finish_time,
            completed,
            failed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased record type ("task", "job", "phase", ...).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn was_failure(&self) -> bool {
        self.failed
    }

    /// True only for a completed task with both timestamps present.
    pub fn ran(&self) -> bool {
        self.completed && self.start_time.is_some() && self.finish_time.is_some()
    }

    /// Wall-clock duration in milliseconds, `None` unless the task ran.
    pub fn duration(&self) -> Option<i64> {
        if !self.ran() {
            return None;
        }
        match (self.start_time, self.finish_time) {
            (Some(start), Some(finish)) => Some((finish - start).num_milliseconds()),
            _ => None,
        }
    }

    /// A missing threshold never marks a task as long running.
    pub fn is_long_running(&self, threshold: Option<i64>) -> bool {
        match (threshold, self.duration()) {
            (Some(threshold), Some(duration)) => duration > threshold,
            _ => false,
        }
    }
}

impl PartialEq for PipelineTask {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.id == other.id
    }
}

impl Eq for PipelineTask {}

/// One run of a build or release definition.
#[async_trait]
pub trait Pipeline: Send + Sync + fmt::Debug {
    fn id(&self) -> u64;

    fn definition_id(&self) -> u64;

    fn definition_name(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Web page of this run.
    fn link(&self) -> &str;

    fn tasks(&self) -> &[PipelineTask];

    fn is_complete(&self) -> bool;

    /// Terminal status of a completed run.
    fn completed_with_failure(&self) -> bool;

    /// Definition id of the environment this run deploys to, releases only.
    fn environment_definition_id(&self) -> Option<u64> {
        None
    }

    /// Web page of the definition this run was instantiated from. Builds only embed
    /// the run, so this may cost a round-trip through `api`.
    async fn definition_link(&self, api: &dyn PipelineApi, project: &str) -> Result<String>;

    /// A run still in progress already counts as failed once one of its tasks failed.
    fn is_failure(&self) -> bool {
        if self.is_complete() {
            self.completed_with_failure()
        } else {
            self.task_failed_during_run()
        }
    }

    fn task_failed_during_run(&self) -> bool {
        self.tasks().iter().any(|t| t.ran() && t.was_failure())
    }

    #[allow(dead_code)]
    fn task(&self, other: &PipelineTask) -> Option<&PipelineTask> {
        self.tasks().iter().find(|t| *t == other)
    }
}
