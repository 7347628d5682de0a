//! Markdown tables embedded in the service comment.
//!
//! Each table kind ends with its own HTML comment marker, so several tables can
//! share one comment body. A table "has data" once its marker is present; the
//! header is written at most once and every later row lands right before the
//! marker, after all rows written so far.

mod failure;
pub(crate) mod format;
mod long_running;

use log::debug;

use crate::branch::Branch;
use crate::pipeline::Pipeline;

pub use failure::FailureTable;
pub use long_running::LongRunningValidationsTable;

/// A task of the current run that overran its branch threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRunningValidation {
    pub name: String,
    pub duration_ms: i64,
    pub threshold_ms: i64,
}

/// Inputs for one table section: the current run judged against its target branch.
pub struct Section<'a> {
    pub current: &'a dyn Pipeline,
    pub status_link: &'a str,
    pub target: &'a Branch,
    pub health_window: usize,
    pub long_running: &'a [LongRunningValidation],
}

pub trait CommentTable {
    /// No-op when the table already has data.
    fn add_header(&mut self, target: &str, percentile: f64);

    /// Rows are only written to a table that already has a header.
    fn add_section(&mut self, section: &Section<'_>);

    fn has_data(&self) -> bool;

    /// Whole comment body, including any text around the table.
    fn current_comment_data(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Failure,
    LongRunningValidations,
}

/// Table of `kind` seeded from the body of an existing comment.
pub fn create(kind: TableKind, existing: &str) -> Box<dyn CommentTable> {
    debug!("table type: {kind:?}");
    match kind {
        TableKind::Failure => Box::new(FailureTable::new(existing)),
        TableKind::LongRunningValidations => Box::new(LongRunningValidationsTable::new(existing)),
    }
}

/// Comment body split around a table's end marker. New blocks render between the
/// text preceding the marker and the marker itself.
#[derive(Debug, Clone)]
pub(crate) struct TableText {
    marker: &'static str,
    before: String,
    blocks: Vec<String>,
    after: String,
    has_marker: bool,
}

impl TableText {
    pub(crate) fn new(existing: &str, marker: &'static str) -> Self {
        match existing.split_once(marker) {
            Some((before, after)) => Self {
                marker,
                before: before.to_string(),
                blocks: Vec::new(),
                after: after.to_string(),
                has_marker: true,
            },
            None => Self {
                marker,
                before: existing.to_string(),
                blocks: Vec::new(),
                after: String::new(),
                has_marker: false,
            },
        }
    }

    pub(crate) fn has_data(&self) -> bool {
        self.has_marker
    }

    /// Appends `text` right before the marker, placing the marker after any other
    /// content first if it is not there yet.
    pub(crate) fn push(&mut self, text: String) {
        if !self.has_marker {
            if !self.before.is_empty() {
                self.before.push_str("\n\n");
            }
            self.has_marker = true;
        }
        self.blocks.push(text);
    }

    /// Writes `header` followed by a divider with one column per header cell.
    pub(crate) fn push_header(&mut self, header: String, template: &str) {
        if self.has_data() {
            return;
        }
        let columns = column_count(template);
        let divider = format!("\n|{}", "---|".repeat(columns));
        self.push(header + &divider);
    }

    pub(crate) fn render(&self) -> String {
        if !self.has_marker {
            return self.before.clone();
        }
        let mut body = self.before.clone();
        for block in &self.blocks {
            body.push_str(block);
        }
        body.push_str(self.marker);
        body.push_str(&self.after);
        body
    }
}

/// Cells of the last line of a header template. Counted on the template so that
/// escaped pipes in substituted values do not add columns.
fn column_count(template: &str) -> usize {
    let last_line = template.lines().last().unwrap_or_default();
    last_line.matches('|').count().saturating_sub(1)
}
