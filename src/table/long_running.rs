use super::format::{escape_cell, format_duration, link, ordinal};
use super::{CommentTable, Section, TableText};

const END_MARKER: &str = "<!--longRunningValidationTable-->";

const HEADER: &str = "### :warning: Long running validations\n\
These tasks took longer than usual compared to recent runs on `{target}`.\n\
|Pipeline|Task|Duration|{percentile} percentile on `{target}`|Most recent `{target}` run|";

/// Tasks that overran the percentile duration of the target branch. Only the first
/// row of a section names the run, the following rows leave those cells blank.
#[derive(Debug, Clone)]
pub struct LongRunningValidationsTable {
    text: TableText,
}

impl LongRunningValidationsTable {
    pub fn new(existing: &str) -> Self {
        Self {
            text: TableText::new(existing, END_MARKER),
        }
    }
}

impl CommentTable for LongRunningValidationsTable {
    fn add_header(&mut self, target: &str, percentile: f64) {
        let header = HEADER
            .replace("{target}", &escape_cell(target))
            .replace("{percentile}", &ordinal(percentile));
        self.text.push_header(header, HEADER);
    }

    fn add_section(&mut self, section: &Section<'_>) {
        if !self.has_data() {
            log::debug!("section not added to table without header");
            return;
        }

        let current = section.current;
        let recent = section
            .target
            .most_recent_complete_pipeline()
            .map(|p| link(p.display_name(), p.link()))
            .unwrap_or_default();
        let pipeline = link(current.definition_name(), current.link());

        for (index, task) in section.long_running.iter().enumerate() {
            let name = escape_cell(&task.name);
            let duration = format_duration(task.duration_ms);
            let threshold = format_duration(task.threshold_ms);
            let row = if index == 0 {
                format!("\n|{pipeline}|{name}|{duration}|{threshold}|{recent}|")
            } else {
                format!("\n| |{name}|{duration}|{threshold}| |")
            };
            self.text.push(row);
        }
    }

    fn has_data(&self) -> bool {
        self.text.has_data()
    }

    fn current_comment_data(&self) -> String {
        self.text.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::branch;
    use crate::table::LongRunningValidation;
    use crate::testing::FakePipeline;

    fn validation(name: &str, duration_ms: i64, threshold_ms: i64) -> LongRunningValidation {
        LongRunningValidation {
            name: name.to_string(),
            duration_ms,
            threshold_ms,
        }
    }

    #[test]
    fn header_carries_percentile_and_target() {
        let mut table = LongRunningValidationsTable::new("");
        table.add_header("master", 95.0);
        assert_eq!(
            table.current_comment_data(),
            "### :warning: Long running validations\n\
These tasks took longer than usual compared to recent runs on `master`.\n\
|Pipeline|Task|Duration|95th percentile on `master`|Most recent `master` run|\n\
|---|---|---|---|---|<!--longRunningValidationTable-->"
        );
    }

    #[test]
    fn first_row_names_the_run_and_later_rows_are_blank() {
        let current = FakePipeline::passed(9);
        let target = branch(vec![FakePipeline::running(2), FakePipeline::passed(1)]);
        let tasks = vec![validation("build", 120_000, 60_000), validation("test", 2_500, 900)];
        let mut table = LongRunningValidationsTable::new("");
        table.add_header("master", 1.0);
        table.add_section(&Section {
            current: &current,
            status_link: "",
            target: &target,
            health_window: 3,
            long_running: &tasks,
        });

        let body = table.current_comment_data();
        assert!(body.ends_with(
            "|---|---|---|---|---|\
\n|[ci](https://dev.azure.com/org/project/_build/results?buildId=9)|build|2m 0s|1m 0s\
|[20190523.1](https://dev.azure.com/org/project/_build/results?buildId=1)|\
\n| |test|2s|900 ms| |<!--longRunningValidationTable-->"
        ));
    }

    #[test]
    fn section_without_header_adds_nothing() {
        let current = FakePipeline::passed(9);
        let target = branch(vec![]);
        let tasks = vec![validation("build", 120_000, 60_000)];
        let mut table = LongRunningValidationsTable::new("");
        table.add_section(&Section {
            current: &current,
            status_link: "",
            target: &target,
            health_window: 3,
            long_running: &tasks,
        });
        assert_eq!(table.current_comment_data(), "");
    }
}
