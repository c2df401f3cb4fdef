//! Time entries within a workspace.
//!
//! Single-entry responses wrap the entry in `{"data": ...}`; a missing
//! `data` object is an invalid response, not an empty result.

use serde::{Deserialize, Serialize};

use crate::connection::ApiConnection;
use crate::error::ApiError;
use crate::query::{path_segment, ListStyle, QueryString};
use crate::request::{at_most_one, RequestModel};
use crate::response::{or_empty, require};
use crate::services::ServiceContext;
use crate::types::TimeEntry;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Location filter for time-entry queries; the API accepts at most one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTimeEntriesRequest {
    start_date: Option<i64>,
    end_date: Option<i64>,
    assignees: Vec<u64>,
    include_task_tags: Option<bool>,
    include_location_names: Option<bool>,
    space_id: Option<String>,
    folder_id: Option<String>,
    list_id: Option<String>,
    task_id: Option<String>,
}

impl GetTimeEntriesRequest {
    fn query(&self) -> QueryString {
        let mut query = QueryString::new();
        query
            .push_opt("start_date", self.start_date)
            .push_opt("end_date", self.end_date)
            .push_list("assignee", &self.assignees, ListStyle::CommaJoined)
            .push_bool("include_task_tags", self.include_task_tags)
            .push_bool("include_location_names", self.include_location_names)
            .push_opt("space_id", self.space_id.as_deref())
            .push_opt("folder_id", self.folder_id.as_deref())
            .push_opt("list_id", self.list_id.as_deref())
            .push_opt("task_id", self.task_id.as_deref());
        query
    }
}

impl RequestModel for GetTimeEntriesRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ApiError::validation("start_date must not be after end_date"));
            }
        }
        at_most_one(&[
            ("space_id", self.space_id.is_some()),
            ("folder_id", self.folder_id.is_some()),
            ("list_id", self.list_id.is_some()),
            ("task_id", self.task_id.is_some()),
        ])
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct TagName {
    name: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CreateTimeEntryRequest {
    start: i64,
    duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<TagName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    billable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<u64>,
    #[serde(rename = "tid", skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
}

impl CreateTimeEntryRequest {
    /// An entry starting at `start` (Unix ms) lasting `duration` ms.
    pub fn new(start: i64, duration: i64) -> Self {
        Self {
            start,
            duration,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(TagName { name: name.into() });
        self
    }

    pub fn with_billable(mut self, billable: bool) -> Self {
        self.billable = Some(billable);
        self
    }

    pub fn with_assignee(mut self, user_id: u64) -> Self {
        self.assignee = Some(user_id);
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

impl RequestModel for CreateTimeEntryRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.duration <= 0 {
            return Err(ApiError::validation("duration must be positive"));
        }
        Ok(())
    }
}

pub struct TimeTrackingService<C> {
    ctx: ServiceContext<C>,
}

impl<C> Clone for TimeTrackingService<C> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl<C> TimeTrackingService<C> {
    pub(crate) fn new(ctx: ServiceContext<C>) -> Self {
        Self { ctx }
    }

    pub fn time_entries(&self, team_id: impl Into<String>) -> GetTimeEntriesBuilder<C> {
        GetTimeEntriesBuilder {
            service: self.clone(),
            team_id: team_id.into(),
            draft: GetTimeEntriesRequest::default(),
        }
    }
}

impl<C: ApiConnection> TimeTrackingService<C> {
    pub async fn get_time_entries(&self, team_id: &str, request: &GetTimeEntriesRequest) -> Result<Vec<TimeEntry>, ApiError> {
        let path = format!("/team/{}/time_entries{}", path_segment(team_id), request.query().render());
        let response: Option<Envelope<Vec<TimeEntry>>> = self.ctx.get_optional(&path).await?;
        Ok(or_empty(response.and_then(|r| r.data)))
    }

    pub async fn get_time_entry(&self, team_id: &str, timer_id: &str) -> Result<TimeEntry, ApiError> {
        let path = format!("/team/{}/time_entries/{}", path_segment(team_id), path_segment(timer_id));
        let envelope: Envelope<TimeEntry> = self.ctx.get_required(&path, "get_time_entry").await?;
        require(envelope.data, "get_time_entry.data")
    }

    pub async fn create_time_entry(&self, team_id: &str, request: CreateTimeEntryRequest) -> Result<TimeEntry, ApiError> {
        let request = request.validated()?;
        let path = format!("/team/{}/time_entries", path_segment(team_id));
        let envelope: Envelope<TimeEntry> = self.ctx.post_required(&path, &request, "create_time_entry").await?;
        require(envelope.data, "create_time_entry.data")
    }

    pub async fn delete_time_entry(&self, team_id: &str, timer_id: &str) -> Result<(), ApiError> {
        let path = format!("/team/{}/time_entries/{}", path_segment(team_id), path_segment(timer_id));
        self.ctx.delete(&path).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct GetTimeEntriesBuilder<C> {
    service: TimeTrackingService<C>,
    team_id: String,
    draft: GetTimeEntriesRequest,
}

impl<C> GetTimeEntriesBuilder<C> {
    pub fn with_start_date(mut self, unix_ms: i64) -> Self {
        self.draft.start_date = Some(unix_ms);
        self
    }

    pub fn with_end_date(mut self, unix_ms: i64) -> Self {
        self.draft.end_date = Some(unix_ms);
        self
    }

    pub fn with_assignee(mut self, user_id: u64) -> Self {
        self.draft.assignees.push(user_id);
        self
    }

    pub fn with_task_tags(mut self, include: bool) -> Self {
        self.draft.include_task_tags = Some(include);
        self
    }

    pub fn with_location_names(mut self, include: bool) -> Self {
        self.draft.include_location_names = Some(include);
        self
    }

    pub fn in_space(mut self, space_id: impl Into<String>) -> Self {
        self.draft.space_id = Some(space_id.into());
        self
    }

    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.draft.folder_id = Some(folder_id.into());
        self
    }

    pub fn in_list(mut self, list_id: impl Into<String>) -> Self {
        self.draft.list_id = Some(list_id.into());
        self
    }

    pub fn for_task(mut self, task_id: impl Into<String>) -> Self {
        self.draft.task_id = Some(task_id.into());
        self
    }

    pub fn build(self) -> Result<GetTimeEntriesRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection> GetTimeEntriesBuilder<C> {
    pub async fn get(self) -> Result<Vec<TimeEntry>, ApiError> {
        let request = self.draft.validated()?;
        self.service.get_time_entries(&self.team_id, &request).await
    }
}
