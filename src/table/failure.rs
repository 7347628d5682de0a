use log::debug;

use super::format::{escape_cell, link};
use super::{CommentTable, Section, TableText};
use crate::pipeline::Pipeline;

const END_MARKER: &str = "<!--failureTable-->";

const HEADER: &str = "### :x: Pipeline failures\n\
|Pipeline|Result|Status of `{target}`|Details|";

/// One row per failing run, stating whether the target branch fails as well.
#[derive(Debug, Clone)]
pub struct FailureTable {
    text: TableText,
}

impl FailureTable {
    pub fn new(existing: &str) -> Self {
        Self {
            text: TableText::new(existing, END_MARKER),
        }
    }
}

fn pipeline_cell(pipeline: &dyn Pipeline) -> String {
    let name = format!("{} {}", pipeline.definition_name(), pipeline.display_name());
    link(name.trim(), pipeline.link())
}

fn target_cell(section: &Section<'_>) -> String {
    let status = if section.target.is_healthy(section.health_window) {
        ":white_check_mark: Passing"
    } else {
        ":x: Failing"
    };
    match section.target.most_recent_complete_pipeline() {
        Some(recent) => link(status, recent.link()),
        None => status.to_string(),
    }
}

impl CommentTable for FailureTable {
    fn add_header(&mut self, target: &str, _percentile: f64) {
        let header = HEADER.replace("{target}", &escape_cell(target));
        self.text.push_header(header, HEADER);
    }

    /// A failing run gets a failure row. A run that passes again while the target is
    /// healthy gets a success row.
    fn add_section(&mut self, section: &Section<'_>) {
        if !self.has_data() {
            debug!("section not added to table without header");
            return;
        }

        let current = section.current;
        let result = if current.is_failure() {
            ":x: Failed"
        } else if section.target.is_healthy(section.health_window) {
            ":white_check_mark: Succeeded"
        } else {
            debug!("run {} neither failed nor recovered", current.id());
            return;
        };

        self.text.push(format!(
            "\n|{}|{result}|{}|{}|",
            pipeline_cell(current),
            target_cell(section),
            link("Check status", section.status_link),
        ));
    }

    fn has_data(&self) -> bool {
        self.text.has_data()
    }

    fn current_comment_data(&self) -> String {
        self.text.render()
    }
}
