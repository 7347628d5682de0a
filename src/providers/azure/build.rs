use log::debug;

use super::client::AzureClient;
use super::types::{BuildData, Definition, ListResponse, Timeline};
use crate::error::{InsightsError, Result};
use crate::pipeline::{Build, Pipeline};

/// Build endpoints of a project.
pub struct BuildSource {
    client: AzureClient,
}

impl BuildSource {
    pub fn new(client: AzureClient) -> Self {
        Self { client }
    }

    async fn fetch_build(&self, project: &str, build_id: u64) -> Result<Build> {
        let id = build_id.to_string();
        let data: BuildData = self
            .client
            .get(self.client.url(&[project, "_apis", "build", "builds", &id])?)
            .await?;
        let timeline: Option<Timeline> = self
            .client
            .get_optional(self.client.url(&[project, "_apis", "build", "builds", &id, "timeline"])?)
            .await?;

        Ok(Build::new(data, timeline))
    }

    pub async fn current(&self, project: &str, build_id: Option<u64>) -> Result<Box<dyn Pipeline>> {
        let build_id = build_id
            .ok_or_else(|| InsightsError::Config("Build id is required on a build host".into()))?;
        Ok(Box::new(self.fetch_build(project, build_id).await?))
    }

    pub async fn most_recent(
        &self,
        project: &str,
        current: &dyn Pipeline,
        max_count: usize,
        branch_name: &str,
    ) -> Result<Vec<Box<dyn Pipeline>>> {
        let mut url = self.client.url(&[project, "_apis", "build", "builds"])?;
        url.query_pairs_mut()
            .append_pair("definitions", &current.definition_id().to_string())
            .append_pair("branchName", branch_name)
            .append_pair("$top", &max_count.to_string())
            .append_pair("queryOrder", "queueTimeDescending");

        let listed: ListResponse<BuildData> = self.client.get(url).await?;
        debug!(
            "Listed {} builds of definition {} on {branch_name}",
            listed.value.len(),
            current.definition_id()
        );

        let mut builds: Vec<Box<dyn Pipeline>> = Vec::with_capacity(listed.value.len());
        for data in listed.value.into_iter().take(max_count) {
            let id = data.id.to_string();
            let timeline: Option<Timeline> = self
                .client
                .get_optional(self.client.url(&[project, "_apis", "build", "builds", &id, "timeline"])?)
                .await?;
            builds.push(Box::new(Build::new(data, timeline)));
        }

        Ok(builds)
    }

    pub async fn definition(&self, project: &str, definition_id: u64) -> Result<Definition> {
        let id = definition_id.to_string();
        self.client
            .get(self.client.url(&[project, "_apis", "build", "definitions", &id])?)
            .await
    }
}
