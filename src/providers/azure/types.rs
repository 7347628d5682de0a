//! Wire representations of the Azure DevOps REST resources this tool reads and writes.
//!
//! Only the fields the annotation logic consumes are modelled; everything else in the
//! payloads is ignored by serde. Enumerations fall back to `Unknown` so a new status
//! value on the server side never breaks deserialization.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Envelope used by every list endpoint (`{"count": n, "value": [...]}`).
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    pub web: Option<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

impl Links {
    pub fn web_href(links: Option<&Links>) -> String {
        links
            .and_then(|l| l.web.as_ref())
            .map(|w| w.href.clone())
            .unwrap_or_default()
    }
}

/// Reference to a build or release definition embedded in a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionReference {
    pub id: u64,
    pub name: Option<String>,
    #[serde(rename = "_links")]
    pub links: Option<Links>,
}

/// A standalone definition resource, fetched to obtain its web page link.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(rename = "_links")]
    pub links: Option<Links>,
}

impl Definition {
    pub fn web_link(&self) -> String {
        Links::web_href(self.links.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Builds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildStatus {
    None,
    InProgress,
    Completed,
    Cancelling,
    Postponed,
    NotStarted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildResult {
    None,
    Succeeded,
    PartiallySucceeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildData {
    pub id: u64,
    pub build_number: Option<String>,
    pub status: Option<BuildStatus>,
    pub result: Option<BuildResult>,
    pub definition: DefinitionReference,
    #[serde(rename = "_links")]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub records: Vec<TimelineRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimelineRecordState {
    Pending,
    InProgress,
    Completed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskResult {
    Succeeded,
    SucceededWithIssues,
    Failed,
    Canceled,
    Skipped,
    Abandoned,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRecord {
    pub id: String,
    pub name: Option<String>,
    /// Record type as reported by the timeline: "Stage", "Phase", "Job", "Task", ...
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub finish_time: Option<DateTime<Utc>>,
    pub state: Option<TimelineRecordState>,
    pub result: Option<TaskResult>,
}

// ---------------------------------------------------------------------------
// Releases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeploymentStatus {
    Undefined,
    NotDeployed,
    InProgress,
    Succeeded,
    PartiallySucceeded,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseTaskStatus {
    Pending,
    InProgress,
    Success,
    Failure,
    Canceled,
    Skipped,
    Succeeded,
    Failed,
    PartiallySucceeded,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseData {
    pub id: u64,
    pub name: Option<String>,
    pub release_definition: DefinitionReference,
    #[serde(rename = "_links")]
    pub links: Option<Links>,
    #[serde(default)]
    pub environments: Vec<ReleaseEnvironment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEnvironment {
    pub id: u64,
    pub definition_environment_id: u64,
    #[serde(default)]
    pub deploy_steps: Vec<DeploymentAttempt>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentAttempt {
    pub status: Option<DeploymentStatus>,
    pub release_deploy_phases: Option<Vec<ReleaseDeployPhase>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDeployPhase {
    pub deployment_jobs: Option<Vec<DeploymentJob>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentJob {
    pub tasks: Option<Vec<ReleaseTask>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseTask {
    pub id: u64,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub finish_time: Option<DateTime<Utc>>,
    pub status: Option<ReleaseTaskStatus>,
}

/// Release as returned by the list endpoint, which omits deployment details.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseSummary {
    pub id: u64,
}

// ---------------------------------------------------------------------------
// Pull requests and comment threads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub commit_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestData {
    pub target_ref_name: String,
    pub last_merge_commit: Option<CommitRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThreadStatus {
    Active,
    Fixed,
    WontFix,
    Closed,
    ByDesign,
    Pending,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub content: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Typed entry of a thread's property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(rename = "$type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(rename = "$value")]
    pub value: serde_json::Value,
}

impl PropertyValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value_type: Some("System.String".to_string()),
            value: serde_json::Value::String(value.into()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub id: u64,
    pub status: Option<ThreadStatus>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub properties: Option<HashMap<String, PropertyValue>>,
}

impl CommentThread {
    /// Comments that have not been deleted, in thread order.
    pub fn live_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| !c.is_deleted)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    /// 1 = text comment
    pub comment_type: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentThread {
    pub comments: Vec<NewComment>,
    pub status: ThreadStatus,
    pub properties: HashMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadStatusUpdate {
    pub status: ThreadStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentUpdate {
    pub content: String,
}

/// Accepts RFC 3339 timestamps as well as the zone-less form some release
/// endpoints emit, treating anything unparseable as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| parse_timestamp(&value)))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_zoneless_timestamps() {
        let with_zone = parse_timestamp("2019-05-23T01:14:40.123Z").unwrap();
        let without_zone = parse_timestamp("2019-05-23T01:14:40.123").unwrap();
        assert_eq!(with_zone, without_zone);
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn unknown_status_values_do_not_fail_deserialization() {
        let record: TimelineRecord = serde_json::from_str(
            r#"{"id":"a","name":"Build","type":"Task","state":"somethingNew","result":"failed"}"#,
        )
        .unwrap();
        assert_eq!(record.state, Some(TimelineRecordState::Unknown));
        assert_eq!(record.result, Some(TaskResult::Failed));
        assert!(record.start_time.is_none());
    }

    #[test]
    fn thread_properties_round_trip_typed_values() {
        let thread: CommentThread = serde_json::from_str(
            r#"{
                "id": 7,
                "status": "active",
                "comments": [{"id": 1, "content": "hi"}, {"id": 2, "content": "", "isDeleted": true}],
                "properties": {
                    "owner": {"$type": "System.String", "$value": "me"},
                    "Microsoft.TeamFoundation.Discussion.SupportsMarkdown": {"$type": "System.Int32", "$value": 1}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(thread.status, Some(ThreadStatus::Active));
        assert_eq!(thread.live_comments().count(), 1);
        assert_eq!(thread.property("owner").and_then(PropertyValue::as_str), Some("me"));
        assert_eq!(
            serde_json::to_value(PropertyValue::string("x")).unwrap(),
            serde_json::json!({"$type": "System.String", "$value": "x"})
        );
    }
}
