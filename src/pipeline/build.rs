use async_trait::async_trait;

use super::{Pipeline, PipelineTask};
use crate::error::Result;
use crate::providers::{
    BuildData, BuildResult, BuildStatus, Links, PipelineApi, TaskResult, Timeline,
    TimelineRecord, TimelineRecordState,
};

/// A build run together with the records of its timeline.
#[derive(Debug, Clone)]
pub struct Build {
    data: BuildData,
    link: String,
    tasks: Vec<PipelineTask>,
}

impl Build {
    /// A missing timeline yields a build without tasks.
    pub fn new(data: BuildData, timeline: Option<Timeline>) -> Self {
        let tasks = timeline
            .map(|t| t.records.iter().map(task_from_record).collect())
            .unwrap_or_default();
        let link = Links::web_href(data.links.as_ref());

        Self { data, link, tasks }
    }
}

fn task_from_record(record: &TimelineRecord) -> PipelineTask {
    PipelineTask::new(
        record.name.clone().unwrap_or_default(),
        record.id.clone(),
        record.record_type.clone().unwrap_or_default(),
        record.start_time,
        record.finish_time,
        record.state == Some(TimelineRecordState::Completed),
        record.result == Some(TaskResult::Failed),
    )
}

#[async_trait]
impl Pipeline for Build {
    fn id(&self) -> u64 {
        self.data.id
    }

    fn definition_id(&self) -> u64 {
        self.data.definition.id
    }

    fn definition_name(&self) -> &str {
        self.data.definition.name.as_deref().unwrap_or_default()
    }

    fn display_name(&self) -> &str {
        self.data.build_number.as_deref().unwrap_or_default()
    }

    fn link(&self) -> &str {
        &self.link
    }

    fn tasks(&self) -> &[PipelineTask] {
        &self.tasks
    }

    fn is_complete(&self) -> bool {
        self.data.status == Some(BuildStatus::Completed)
    }

    fn completed_with_failure(&self) -> bool {
        self.data.result == Some(BuildResult::Failed)
    }

    async fn definition_link(&self, api: &dyn PipelineApi, project: &str) -> Result<String> {
        let definition = api.get_definition(project, self.definition_id()).await?;
        Ok(definition.web_link())
    }
}
