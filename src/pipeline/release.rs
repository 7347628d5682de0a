use async_trait::async_trait;
use log::warn;

use super::{Pipeline, PipelineTask};
use crate::error::{InsightsError, Result};
use crate::providers::{
    DeploymentAttempt, DeploymentStatus, Links, PipelineApi, ReleaseData, ReleaseTask,
    ReleaseTaskStatus,
};

const COMPLETE_DEPLOYMENT_STATUSES: [DeploymentStatus; 3] = [
    DeploymentStatus::PartiallySucceeded,
    DeploymentStatus::Succeeded,
    DeploymentStatus::Failed,
];

/// A release run, viewed through one environment and its first deployment attempt.
#[derive(Debug, Clone)]
pub struct Release {
    id: u64,
    display_name: String,
    definition_id: u64,
    definition_name: String,
    definition_link: String,
    link: String,
    environment_definition_id: u64,
    deployment_status: Option<DeploymentStatus>,
    tasks: Vec<PipelineTask>,
}

impl Release {
    /// Selects the environment with id `environment_id`, or the first environment when
    /// none is requested or the requested one is absent.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::MissingDeployment`] when the selected environment has
    /// never been deployed.
    pub fn new(data: ReleaseData, environment_id: Option<u64>) -> Result<Self> {
        let environment = environment_id
            .and_then(|id| data.environments.iter().find(|e| e.id == id))
            .or_else(|| data.environments.first())
            .ok_or(InsightsError::MissingDeployment(data.id))?;

        let deployment = environment
            .deploy_steps
            .first()
            .ok_or(InsightsError::MissingDeployment(data.id))?;

        let display_name = data.name.clone().unwrap_or_default();
        let tasks = parse_tasks(deployment, &display_name);

        Ok(Self {
            id: data.id,
            definition_id: data.release_definition.id,
            definition_name: data.release_definition.name.clone().unwrap_or_default(),
            definition_link: Links::web_href(data.release_definition.links.as_ref()),
            link: Links::web_href(data.links.as_ref()),
            environment_definition_id: environment.definition_environment_id,
            deployment_status: deployment.status,
            display_name,
            tasks,
        })
    }
}

fn parse_tasks(deployment: &DeploymentAttempt, display_name: &str) -> Vec<PipelineTask> {
    let mut incomplete = deployment.release_deploy_phases.is_none();
    let mut tasks = Vec::new();

    for phase in deployment.release_deploy_phases.iter().flatten() {
        let Some(jobs) = &phase.deployment_jobs else {
            incomplete = true;
            continue;
        };
        for job in jobs {
            match &job.tasks {
                Some(job_tasks) => tasks.extend(job_tasks.iter().map(task_from_release_task)),
                None => incomplete = true,
            }
        }
    }

    if incomplete {
        warn!("Release {display_name} is missing task data");
    }
    tasks
}

fn task_from_release_task(task: &ReleaseTask) -> PipelineTask {
    let completed = matches!(
        task.status,
        Some(
            ReleaseTaskStatus::Success
                | ReleaseTaskStatus::Succeeded
                | ReleaseTaskStatus::Failure
                | ReleaseTaskStatus::Failed
                | ReleaseTaskStatus::PartiallySucceeded
                | ReleaseTaskStatus::Canceled
        )
    );
    let failed = matches!(
        task.status,
        Some(ReleaseTaskStatus::Failure | ReleaseTaskStatus::Failed)
    );

    PipelineTask::new(
        task.name.clone().unwrap_or_default(),
        task.id.to_string(),
        "task",
        task.start_time,
        task.finish_time,
        completed,
        failed,
    )
}

#[async_trait]
impl Pipeline for Release {
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
        self.deployment_status
            .is_some_and(|status| COMPLETE_DEPLOYMENT_STATUSES.contains(&status))
    }

    fn completed_with_failure(&self) -> bool {
        self.deployment_status == Some(DeploymentStatus::Failed)
    }

    fn environment_definition_id(&self) -> Option<u64> {
        Some(self.environment_definition_id)
    }

    // Release payloads embed the definition's web link.
    async fn definition_link(&self, _api: &dyn PipelineApi, _project: &str) -> Result<String> {
        Ok(self.definition_link.clone())
    }
}
