//! Domain DTOs returned by the API.
//!
//! # Design
//! Fields the API sometimes omits are `Option`; collections the API
//! sometimes omits default to empty. Timestamps stay in the API's own
//! representation (Unix milliseconds as decimal strings).

use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "profilePicture")]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub status: String,
    pub color: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Priority as the API reports it on entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityInfo {
    pub id: Option<String>,
    pub priority: Option<String>,
    pub color: Option<String>,
}

/// Priority as sent in request bodies (`1` is most urgent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Urgent = 1,
    High = 2,
    Normal = 3,
    Low = 4,
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub tag_fg: Option<String>,
    pub tag_bg: Option<String>,
}

/// Id/name pointer to a containing entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub custom_id: Option<String>,
    pub name: String,
    pub text_content: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub orderindex: Option<String>,
    pub date_created: Option<String>,
    pub date_updated: Option<String>,
    pub date_closed: Option<String>,
    pub archived: Option<bool>,
    pub creator: Option<User>,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub parent: Option<String>,
    pub priority: Option<PriorityInfo>,
    pub due_date: Option<String>,
    pub start_date: Option<String>,
    pub time_estimate: Option<u64>,
    pub url: Option<String>,
    pub list: Option<Reference>,
    pub folder: Option<Reference>,
    pub space: Option<Reference>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskList {
    pub id: String,
    pub name: String,
    pub orderindex: Option<i64>,
    pub content: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<PriorityInfo>,
    pub assignee: Option<User>,
    pub task_count: Option<u64>,
    pub due_date: Option<String>,
    pub start_date: Option<String>,
    pub folder: Option<Reference>,
    pub space: Option<Reference>,
    pub archived: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub orderindex: Option<i64>,
    pub hidden: Option<bool>,
    pub task_count: Option<String>,
    pub archived: Option<bool>,
    pub space: Option<Reference>,
    #[serde(default)]
    pub lists: Vec<TaskList>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Space {
    pub id: String,
    pub name: String,
    pub private: Option<bool>,
    pub multiple_assignees: Option<bool>,
    pub archived: Option<bool>,
    #[serde(default)]
    pub statuses: Vec<Status>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMember {
    pub user: User,
}

/// A workspace ("team" in the v2 API).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeEntryTask {
    pub id: String,
    pub name: Option<String>,
    pub custom_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeEntry {
    pub id: String,
    pub task: Option<TimeEntryTask>,
    pub wid: Option<String>,
    pub user: Option<User>,
    pub billable: Option<bool>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Events a webhook can subscribe to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WebhookEvent {
    #[serde(rename = "*")]
    All,
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskStatusUpdated,
    TaskAssigneeUpdated,
    TaskDueDateUpdated,
    TaskCommentPosted,
    TaskMoved,
    ListCreated,
    ListUpdated,
    ListDeleted,
    FolderCreated,
    FolderUpdated,
    FolderDeleted,
    SpaceCreated,
    SpaceUpdated,
    SpaceDeleted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookHealth {
    pub status: Option<String>,
    pub fail_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Webhook {
    pub id: Uuid,
    pub userid: Option<u64>,
    pub team_id: Option<u64>,
    pub endpoint: String,
    pub client_id: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
    pub task_id: Option<String>,
    pub list_id: Option<String>,
    pub folder_id: Option<String>,
    pub space_id: Option<String>,
    pub health: Option<WebhookHealth>,
    pub secret: Option<String>,
}
