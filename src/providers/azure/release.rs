use log::{debug, warn};

use super::client::AzureClient;
use super::types::{Definition, ListResponse, ReleaseData, ReleaseSummary};
use crate::error::{InsightsError, Result};
use crate::pipeline::{Pipeline, Release};

/// Release management endpoints of a project.
pub struct ReleaseSource {
    client: AzureClient,
}

impl ReleaseSource {
    pub fn new(client: AzureClient) -> Self {
        Self { client }
    }

    async fn fetch_release(&self, project: &str, release_id: u64) -> Result<ReleaseData> {
        let id = release_id.to_string();
        self.client
            .get(self.client.url(&[project, "_apis", "release", "releases", &id])?)
            .await
    }

    pub async fn current(
        &self,
        project: &str,
        release_id: Option<u64>,
        environment_id: Option<u64>,
    ) -> Result<Box<dyn Pipeline>> {
        let release_id = release_id.ok_or_else(|| {
            InsightsError::Config("Release id is required on a release host".into())
        })?;
        let data = self.fetch_release(project, release_id).await?;
        Ok(Box::new(Release::new(data, environment_id)?))
    }

    /// History releases that were never deployed to the environment are skipped,
    /// they carry no timing or status information.
    pub async fn most_recent(
        &self,
        project: &str,
        current: &dyn Pipeline,
        max_count: usize,
        branch_name: &str,
    ) -> Result<Vec<Box<dyn Pipeline>>> {
        let mut url = self.client.url(&[project, "_apis", "release", "releases"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("definitionId", &current.definition_id().to_string())
                .append_pair("sourceBranchFilter", branch_name)
                .append_pair("$top", &max_count.to_string());
            if let Some(environment) = current.environment_definition_id() {
                query.append_pair("definitionEnvironmentId", &environment.to_string());
            }
        }

        let listed: ListResponse<ReleaseSummary> = self.client.get(url).await?;
        debug!(
            "Listed {} releases of definition {} on {branch_name}",
            listed.value.len(),
            current.definition_id()
        );

        let mut releases: Vec<Box<dyn Pipeline>> = Vec::with_capacity(listed.value.len());
        for summary in listed.value.into_iter().take(max_count) {
            let data = self.fetch_release(project, summary.id).await?;
            let environment_id = current.environment_definition_id().and_then(|definition_id| {
                data.environments
                    .iter()
                    .find(|e| e.definition_environment_id == definition_id)
                    .map(|e| e.id)
            });

            match Release::new(data, environment_id) {
                Ok(release) => releases.push(Box::new(release)),
                Err(InsightsError::MissingDeployment(id)) => {
                    warn!("Skipping release {id} of branch history, it has no deployment attempts");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(releases)
    }

    pub async fn definition(&self, project: &str, definition_id: u64) -> Result<Definition> {
        let id = definition_id.to_string();
        self.client
            .get(self.client.url(&[project, "_apis", "release", "definitions", &id])?)
            .await
    }
}
