//! Tasks: single-task CRUD, paginated task listings and dependencies.
//!
//! # Design
//! Two listing endpoints exist and they end pagination differently. List
//! tasks (`/list/{id}/task`) report `last_page`; filtered team tasks
//! (`/team/{id}/task`) do not, so their stream ends on the first empty page.
//! Both share [`TaskFilter`], which every task-listing builder exposes through
//! [`TaskFilterBuilder`].

use serde::{Deserialize, Serialize};

use crate::connection::ApiConnection;
use crate::error::ApiError;
use crate::pagination::{collect_all, PageResponse, PageStream};
use crate::query::{path_segment, ListStyle, QueryString};
use crate::request::{at_most_one, exactly_one, RequestModel};
use crate::response::or_empty;
use crate::services::ServiceContext;
use crate::types::{Priority, Task};

/// Sort key for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrderBy {
    Id,
    Created,
    Updated,
    DueDate,
}

impl TaskOrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskOrderBy::Id => "id",
            TaskOrderBy::Created => "created",
            TaskOrderBy::Updated => "updated",
            TaskOrderBy::DueDate => "due_date",
        }
    }
}

/// Open-ended range over Unix-millisecond timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub after: Option<i64>,
    pub before: Option<i64>,
}

impl DateRange {
    fn validate(&self, name: &str) -> Result<(), ApiError> {
        if let (Some(after), Some(before)) = (self.after, self.before) {
            if after >= before {
                return Err(ApiError::validation(format!(
                    "{name}: lower bound {after} must be before upper bound {before}"
                )));
            }
        }
        Ok(())
    }

    fn append_to(&self, query: &mut QueryString, name: &str) {
        query.push_opt(&format!("{name}_gt"), self.after);
        query.push_opt(&format!("{name}_lt"), self.before);
    }
}

/// Filters shared by every task-listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    archived: Option<bool>,
    include_markdown_description: Option<bool>,
    order_by: Option<TaskOrderBy>,
    reverse: Option<bool>,
    subtasks: Option<bool>,
    include_closed: Option<bool>,
    statuses: Vec<String>,
    assignees: Vec<u64>,
    tags: Vec<String>,
    due_date: DateRange,
    date_created: DateRange,
    date_updated: DateRange,
    date_done: DateRange,
}

impl TaskFilter {
    pub fn archived(&self) -> Option<bool> {
        self.archived
    }

    pub fn order_by(&self) -> Option<TaskOrderBy> {
        self.order_by
    }

    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    pub fn assignees(&self) -> &[u64] {
        &self.assignees
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn due_date(&self) -> DateRange {
        self.due_date
    }

    fn validate(&self) -> Result<(), ApiError> {
        self.due_date.validate("due_date")?;
        self.date_created.validate("date_created")?;
        self.date_updated.validate("date_updated")?;
        self.date_done.validate("date_done")
    }

    fn append_to(&self, query: &mut QueryString) {
        query
            .push_bool("archived", self.archived)
            .push_bool("include_markdown_description", self.include_markdown_description)
            .push_opt("order_by", self.order_by.map(TaskOrderBy::as_str))
            .push_bool("reverse", self.reverse)
            .push_bool("subtasks", self.subtasks)
            .push_bool("include_closed", self.include_closed)
            .push_list("statuses", &self.statuses, ListStyle::Repeated)
            .push_list("assignees", &self.assignees, ListStyle::Repeated)
            .push_list("tags", &self.tags, ListStyle::Repeated);
        self.due_date.append_to(query, "due_date");
        self.date_created.append_to(query, "date_created");
        self.date_updated.append_to(query, "date_updated");
        self.date_done.append_to(query, "date_done");
    }
}

/// Chainable [`TaskFilter`] setters for any builder that carries one.
pub trait TaskFilterBuilder: Sized {
    fn filter_mut(&mut self) -> &mut TaskFilter;

    fn with_archived(mut self, archived: bool) -> Self {
        self.filter_mut().archived = Some(archived);
        self
    }

    fn with_markdown_description(mut self, include: bool) -> Self {
        self.filter_mut().include_markdown_description = Some(include);
        self
    }

    fn with_order_by(mut self, order_by: TaskOrderBy) -> Self {
        self.filter_mut().order_by = Some(order_by);
        self
    }

    fn with_reverse(mut self, reverse: bool) -> Self {
        self.filter_mut().reverse = Some(reverse);
        self
    }

    fn with_subtasks(mut self, subtasks: bool) -> Self {
        self.filter_mut().subtasks = Some(subtasks);
        self
    }

    fn with_include_closed(mut self, include_closed: bool) -> Self {
        self.filter_mut().include_closed = Some(include_closed);
        self
    }

    fn with_status(mut self, status: impl Into<String>) -> Self {
        self.filter_mut().statuses.push(status.into());
        self
    }

    fn with_assignee(mut self, user_id: u64) -> Self {
        self.filter_mut().assignees.push(user_id);
        self
    }

    fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.filter_mut().tags.push(tag.into());
        self
    }

    fn with_due_date_after(mut self, unix_ms: i64) -> Self {
        self.filter_mut().due_date.after = Some(unix_ms);
        self
    }

    fn with_due_date_before(mut self, unix_ms: i64) -> Self {
        self.filter_mut().due_date.before = Some(unix_ms);
        self
    }

    fn with_created_after(mut self, unix_ms: i64) -> Self {
        self.filter_mut().date_created.after = Some(unix_ms);
        self
    }

    fn with_created_before(mut self, unix_ms: i64) -> Self {
        self.filter_mut().date_created.before = Some(unix_ms);
        self
    }

    fn with_updated_after(mut self, unix_ms: i64) -> Self {
        self.filter_mut().date_updated.after = Some(unix_ms);
        self
    }

    fn with_updated_before(mut self, unix_ms: i64) -> Self {
        self.filter_mut().date_updated.before = Some(unix_ms);
        self
    }

    fn with_done_after(mut self, unix_ms: i64) -> Self {
        self.filter_mut().date_done.after = Some(unix_ms);
        self
    }

    fn with_done_before(mut self, unix_ms: i64) -> Self {
        self.filter_mut().date_done.before = Some(unix_ms);
        self
    }
}

// ---------------------------------------------------------------------------
// Request models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTaskRequest {
    custom_task_ids: Option<bool>,
    team_id: Option<String>,
    include_subtasks: Option<bool>,
    include_markdown_description: Option<bool>,
}

impl GetTaskRequest {
    fn query(&self) -> QueryString {
        let mut query = QueryString::new();
        query
            .push_bool("custom_task_ids", self.custom_task_ids)
            .push_opt("team_id", self.team_id.as_deref())
            .push_bool("include_subtasks", self.include_subtasks)
            .push_bool("include_markdown_description", self.include_markdown_description);
        query
    }
}

impl RequestModel for GetTaskRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.custom_task_ids == Some(true) && self.team_id.is_none() {
            return Err(ApiError::validation("team_id is required when custom_task_ids is set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTasksRequest {
    filter: TaskFilter,
}

impl GetTasksRequest {
    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    fn query(&self, page: u32) -> QueryString {
        let mut query = QueryString::new();
        self.filter.append_to(&mut query);
        query.push("page", page);
        query
    }
}

impl RequestModel for GetTasksRequest {
    fn validate(&self) -> Result<(), ApiError> {
        self.filter.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTeamTasksRequest {
    filter: TaskFilter,
    space_ids: Vec<String>,
    folder_ids: Vec<String>,
    list_ids: Vec<String>,
    parent: Option<String>,
}

impl GetTeamTasksRequest {
    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    fn query(&self, page: u32) -> QueryString {
        let mut query = QueryString::new();
        self.filter.append_to(&mut query);
        query
            .push_list("space_ids", &self.space_ids, ListStyle::Repeated)
            .push_list("project_ids", &self.folder_ids, ListStyle::Repeated)
            .push_list("list_ids", &self.list_ids, ListStyle::Repeated)
            .push_opt("parent", self.parent.as_deref())
            .push("page", page);
        query
    }
}

impl RequestModel for GetTeamTasksRequest {
    fn validate(&self) -> Result<(), ApiError> {
        self.filter.validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CreateTaskRequest {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    markdown_description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_estimate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notify_all: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    links_to: Option<String>,
}

impl CreateTaskRequest {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RequestModel for CreateTaskRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("task name must not be empty"));
        }
        at_most_one(&[
            ("description", self.description.is_some()),
            ("markdown_description", self.markdown_description.is_some()),
        ])?;
        if let (Some(start), Some(due)) = (self.start_date, self.due_date) {
            if start > due {
                return Err(ApiError::validation("start_date must not be after due_date"));
            }
        }
        Ok(())
    }
}

/// Assignee delta applied by an update.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AssigneeChanges {
    pub add: Vec<u64>,
    pub rem: Vec<u64>,
}

/// Partial task update. An absent field is left untouched; the
/// `Option<Option<_>>` fields distinguish "leave alone" from "clear".
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Option<Priority>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_estimate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignees: Option<AssigneeChanges>,
}

impl RequestModel for UpdateTaskRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if *self == Self::default() {
            return Err(ApiError::validation("update sets no fields"));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ApiError::validation("task name must not be empty"));
        }
        if let Some(changes) = &self.assignees {
            if let Some(id) = changes.add.iter().find(|id| changes.rem.contains(id)) {
                return Err(ApiError::validation(format!("assignee {id} is both added and removed")));
            }
        }
        Ok(())
    }
}

/// A dependency edge: exactly one of the two directions must be set.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DependencyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    depends_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependency_of: Option<String>,
}

impl DependencyRequest {
    fn query(&self) -> QueryString {
        let mut query = QueryString::new();
        query
            .push_opt("depends_on", self.depends_on.as_deref())
            .push_opt("dependency_of", self.dependency_of.as_deref());
        query
    }
}

impl RequestModel for DependencyRequest {
    fn validate(&self) -> Result<(), ApiError> {
        exactly_one(&[
            ("depends_on", self.depends_on.is_some()),
            ("dependency_of", self.dependency_of.is_some()),
        ])
    }
}

// ---------------------------------------------------------------------------
// Page shapes
// ---------------------------------------------------------------------------

/// Page of `/list/{id}/task`, which reports `last_page`.
#[derive(Debug, Deserialize)]
pub struct ListTasksPage {
    tasks: Option<Vec<Task>>,
    last_page: Option<bool>,
}

impl PageResponse for ListTasksPage {
    type Item = Task;

    fn last_page(&self) -> Option<bool> {
        self.last_page
    }

    fn into_items(self) -> Option<Vec<Task>> {
        self.tasks
    }
}

/// Page of `/team/{id}/task`. No flag: an empty page ends the listing.
#[derive(Debug, Deserialize)]
pub struct TeamTasksPage {
    tasks: Option<Vec<Task>>,
}

impl PageResponse for TeamTasksPage {
    type Item = Task;

    fn last_page(&self) -> Option<bool> {
        None
    }

    fn into_items(self) -> Option<Vec<Task>> {
        self.tasks
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct TaskService<C> {
    ctx: ServiceContext<C>,
}

impl<C> Clone for TaskService<C> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl<C> TaskService<C> {
    pub(crate) fn new(ctx: ServiceContext<C>) -> Self {
        Self { ctx }
    }

    pub fn task(&self, task_id: impl Into<String>) -> GetTaskBuilder<C> {
        GetTaskBuilder {
            service: self.clone(),
            task_id: task_id.into(),
            draft: GetTaskRequest::default(),
        }
    }

    pub fn new_task(&self, list_id: impl Into<String>, name: impl Into<String>) -> CreateTaskBuilder<C> {
        CreateTaskBuilder {
            service: self.clone(),
            list_id: list_id.into(),
            draft: CreateTaskRequest {
                name: name.into(),
                ..CreateTaskRequest::default()
            },
        }
    }

    pub fn edit_task(&self, task_id: impl Into<String>) -> UpdateTaskBuilder<C> {
        UpdateTaskBuilder {
            service: self.clone(),
            task_id: task_id.into(),
            draft: UpdateTaskRequest::default(),
        }
    }

    pub fn list_tasks(&self, list_id: impl Into<String>) -> GetTasksBuilder<C> {
        GetTasksBuilder {
            service: self.clone(),
            list_id: list_id.into(),
            draft: GetTasksRequest::default(),
        }
    }

    pub fn team_tasks(&self, team_id: impl Into<String>) -> GetTeamTasksBuilder<C> {
        GetTeamTasksBuilder {
            service: self.clone(),
            team_id: team_id.into(),
            draft: GetTeamTasksRequest::default(),
        }
    }

    pub fn dependency(&self, task_id: impl Into<String>) -> DependencyBuilder<C> {
        DependencyBuilder {
            service: self.clone(),
            task_id: task_id.into(),
            draft: DependencyRequest::default(),
        }
    }
}

impl<C: ApiConnection + 'static> TaskService<C> {
    pub async fn get_task(&self, task_id: &str, request: &GetTaskRequest) -> Result<Task, ApiError> {
        let path = format!("/task/{}{}", path_segment(task_id), request.query().render());
        self.ctx.get_required(&path, "get_task").await
    }

    pub async fn create_task(&self, list_id: &str, request: &CreateTaskRequest) -> Result<Task, ApiError> {
        let path = format!("/list/{}/task", path_segment(list_id));
        self.ctx.post_required(&path, request, "create_task").await
    }

    pub async fn update_task(&self, task_id: &str, request: &UpdateTaskRequest) -> Result<Task, ApiError> {
        let path = format!("/task/{}", path_segment(task_id));
        self.ctx.put_required(&path, request, "update_task").await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.ctx.delete(&format!("/task/{}", path_segment(task_id))).await
    }

    /// Fetch one page of a list's tasks. A missing page is an empty page.
    pub async fn get_tasks(&self, list_id: &str, request: &GetTasksRequest, page: u32) -> Result<Vec<Task>, ApiError> {
        let path = list_tasks_path(list_id, request, page);
        let response: Option<ListTasksPage> = self.ctx.get_optional(&path).await?;
        Ok(or_empty(response.and_then(|p| p.tasks)))
    }

    pub fn get_tasks_stream(&self, list_id: &str, request: GetTasksRequest) -> PageStream<'static, Task> {
        let list_id = list_id.to_string();
        self.ctx
            .stream_pages::<_, ListTasksPage, _>(request, move |req, page| list_tasks_path(&list_id, req, page))
    }

    pub fn get_team_tasks_stream(&self, team_id: &str, request: GetTeamTasksRequest) -> PageStream<'static, Task> {
        let team_id = team_id.to_string();
        self.ctx.stream_pages::<_, TeamTasksPage, _>(request, move |req, page| {
            format!("/team/{}/task{}", path_segment(&team_id), req.query(page).render())
        })
    }

    pub async fn add_dependency(&self, task_id: &str, request: &DependencyRequest) -> Result<(), ApiError> {
        let path = format!("/task/{}/dependency", path_segment(task_id));
        self.ctx.post_no_content(&path, request).await
    }

    pub async fn delete_dependency(&self, task_id: &str, request: &DependencyRequest) -> Result<(), ApiError> {
        let path = format!("/task/{}/dependency{}", path_segment(task_id), request.query().render());
        self.ctx.delete(&path).await
    }
}

fn list_tasks_path(list_id: &str, request: &GetTasksRequest, page: u32) -> String {
    format!("/list/{}/task{}", path_segment(list_id), request.query(page).render())
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

#[must_use = "builders do nothing until a terminal method is called"]
pub struct GetTaskBuilder<C> {
    service: TaskService<C>,
    task_id: String,
    draft: GetTaskRequest,
}

impl<C> GetTaskBuilder<C> {
    pub fn with_custom_task_ids(mut self, team_id: impl Into<String>) -> Self {
        self.draft.custom_task_ids = Some(true);
        self.draft.team_id = Some(team_id.into());
        self
    }

    pub fn with_subtasks(mut self, include: bool) -> Self {
        self.draft.include_subtasks = Some(include);
        self
    }

    pub fn with_markdown_description(mut self, include: bool) -> Self {
        self.draft.include_markdown_description = Some(include);
        self
    }

    pub fn draft(&self) -> &GetTaskRequest {
        &self.draft
    }

    pub fn build(self) -> Result<GetTaskRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection + 'static> GetTaskBuilder<C> {
    pub async fn get(self) -> Result<Task, ApiError> {
        let request = self.draft.validated()?;
        self.service.get_task(&self.task_id, &request).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct CreateTaskBuilder<C> {
    service: TaskService<C>,
    list_id: String,
    draft: CreateTaskRequest,
}

impl<C> CreateTaskBuilder<C> {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.draft.description = Some(description.into());
        self
    }

    pub fn with_markdown_description(mut self, markdown: impl Into<String>) -> Self {
        self.draft.markdown_description = Some(markdown.into());
        self
    }

    pub fn with_assignee(mut self, user_id: u64) -> Self {
        self.draft.assignees.push(user_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.draft.tags.push(tag.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.draft.status = Some(status.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.draft.priority = Some(priority);
        self
    }

    /// Due date in Unix ms; `include_time` makes the time of day significant.
    pub fn with_due_date(mut self, unix_ms: i64, include_time: bool) -> Self {
        self.draft.due_date = Some(unix_ms);
        self.draft.due_date_time = Some(include_time);
        self
    }

    pub fn with_start_date(mut self, unix_ms: i64, include_time: bool) -> Self {
        self.draft.start_date = Some(unix_ms);
        self.draft.start_date_time = Some(include_time);
        self
    }

    pub fn with_time_estimate(mut self, millis: u64) -> Self {
        self.draft.time_estimate = Some(millis);
        self
    }

    pub fn with_notify_all(mut self, notify: bool) -> Self {
        self.draft.notify_all = Some(notify);
        self
    }

    pub fn with_parent(mut self, parent_task_id: impl Into<String>) -> Self {
        self.draft.parent = Some(parent_task_id.into());
        self
    }

    pub fn with_links_to(mut self, task_id: impl Into<String>) -> Self {
        self.draft.links_to = Some(task_id.into());
        self
    }

    pub fn draft(&self) -> &CreateTaskRequest {
        &self.draft
    }

    pub fn build(self) -> Result<CreateTaskRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection + 'static> CreateTaskBuilder<C> {
    pub async fn create(self) -> Result<Task, ApiError> {
        let request = self.draft.validated()?;
        self.service.create_task(&self.list_id, &request).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct UpdateTaskBuilder<C> {
    service: TaskService<C>,
    task_id: String,
    draft: UpdateTaskRequest,
}

impl<C> UpdateTaskBuilder<C> {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.draft.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.draft.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.draft.status = Some(status.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.draft.priority = Some(Some(priority));
        self
    }

    pub fn clear_priority(mut self) -> Self {
        self.draft.priority = Some(None);
        self
    }

    pub fn with_due_date(mut self, unix_ms: i64) -> Self {
        self.draft.due_date = Some(Some(unix_ms));
        self
    }

    pub fn clear_due_date(mut self) -> Self {
        self.draft.due_date = Some(None);
        self
    }

    pub fn with_start_date(mut self, unix_ms: i64) -> Self {
        self.draft.start_date = Some(Some(unix_ms));
        self
    }

    pub fn clear_start_date(mut self) -> Self {
        self.draft.start_date = Some(None);
        self
    }

    pub fn with_time_estimate(mut self, millis: u64) -> Self {
        self.draft.time_estimate = Some(millis);
        self
    }

    pub fn with_parent(mut self, parent_task_id: impl Into<String>) -> Self {
        self.draft.parent = Some(parent_task_id.into());
        self
    }

    pub fn with_archived(mut self, archived: bool) -> Self {
        self.draft.archived = Some(archived);
        self
    }

    pub fn with_assignee_added(mut self, user_id: u64) -> Self {
        self.draft.assignees.get_or_insert_with(AssigneeChanges::default).add.push(user_id);
        self
    }

    pub fn with_assignee_removed(mut self, user_id: u64) -> Self {
        self.draft.assignees.get_or_insert_with(AssigneeChanges::default).rem.push(user_id);
        self
    }

    pub fn draft(&self) -> &UpdateTaskRequest {
        &self.draft
    }

    pub fn build(self) -> Result<UpdateTaskRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection + 'static> UpdateTaskBuilder<C> {
    pub async fn update(self) -> Result<Task, ApiError> {
        let request = self.draft.validated()?;
        self.service.update_task(&self.task_id, &request).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct GetTasksBuilder<C> {
    service: TaskService<C>,
    list_id: String,
    draft: GetTasksRequest,
}

impl<C> TaskFilterBuilder for GetTasksBuilder<C> {
    fn filter_mut(&mut self) -> &mut TaskFilter {
        &mut self.draft.filter
    }
}

impl<C> GetTasksBuilder<C> {
    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    pub fn draft(&self) -> &GetTasksRequest {
        &self.draft
    }

    pub fn build(self) -> Result<GetTasksRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection + 'static> GetTasksBuilder<C> {
    pub async fn page(self, page: u32) -> Result<Vec<Task>, ApiError> {
        let request = self.draft.validated()?;
        self.service.get_tasks(&self.list_id, &request, page).await
    }

    pub fn stream(self) -> Result<PageStream<'static, Task>, ApiError> {
        let request = self.draft.validated()?;
        Ok(self.service.get_tasks_stream(&self.list_id, request))
    }

    pub async fn collect(self) -> Result<Vec<Task>, ApiError> {
        collect_all(self.stream()?).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct GetTeamTasksBuilder<C> {
    service: TaskService<C>,
    team_id: String,
    draft: GetTeamTasksRequest,
}

impl<C> TaskFilterBuilder for GetTeamTasksBuilder<C> {
    fn filter_mut(&mut self) -> &mut TaskFilter {
        &mut self.draft.filter
    }
}

impl<C> GetTeamTasksBuilder<C> {
    pub fn with_space(mut self, space_id: impl Into<String>) -> Self {
        self.draft.space_ids.push(space_id.into());
        self
    }

    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.draft.folder_ids.push(folder_id.into());
        self
    }

    pub fn with_list(mut self, list_id: impl Into<String>) -> Self {
        self.draft.list_ids.push(list_id.into());
        self
    }

    pub fn with_parent(mut self, parent_task_id: impl Into<String>) -> Self {
        self.draft.parent = Some(parent_task_id.into());
        self
    }

    pub fn draft(&self) -> &GetTeamTasksRequest {
        &self.draft
    }

    pub fn build(self) -> Result<GetTeamTasksRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection + 'static> GetTeamTasksBuilder<C> {
    pub fn stream(self) -> Result<PageStream<'static, Task>, ApiError> {
        let request = self.draft.validated()?;
        Ok(self.service.get_team_tasks_stream(&self.team_id, request))
    }

    pub async fn collect(self) -> Result<Vec<Task>, ApiError> {
        collect_all(self.stream()?).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct DependencyBuilder<C> {
    service: TaskService<C>,
    task_id: String,
    draft: DependencyRequest,
}

impl<C> DependencyBuilder<C> {
    /// The builder's task waits on `task_id`.
    pub fn with_depends_on(mut self, task_id: impl Into<String>) -> Self {
        self.draft.depends_on = Some(task_id.into());
        self
    }

    /// `task_id` waits on the builder's task.
    pub fn with_dependency_of(mut self, task_id: impl Into<String>) -> Self {
        self.draft.dependency_of = Some(task_id.into());
        self
    }

    pub fn draft(&self) -> &DependencyRequest {
        &self.draft
    }

    pub fn build(self) -> Result<DependencyRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection + 'static> DependencyBuilder<C> {
    pub async fn add(self) -> Result<(), ApiError> {
        let request = self.draft.validated()?;
        self.service.add_dependency(&self.task_id, &request).await
    }

    pub async fn remove(self) -> Result<(), ApiError> {
        let request = self.draft.validated()?;
        self.service.delete_dependency(&self.task_id, &request).await
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::http::HttpMethod;
    use crate::test_support::{context, ScriptedConnection};

    fn service(conn: ScriptedConnection) -> (TaskService<ScriptedConnection>, std::sync::Arc<ScriptedConnection>) {
        let (ctx, conn) = context(conn);
        (TaskService::new(ctx), conn)
    }

    fn task(id: &str) -> serde_json::Value {
        json!({ "id": id, "name": format!("task {id}") })
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[tokio::test]
    async fn list_tasks_stream_stops_on_last_page_flag() {
        let (tasks, conn) = service(ScriptedConnection::replying(vec![
            json!({ "tasks": [task("a"), task("b")], "last_page": false }),
            json!({ "tasks": [task("c")], "last_page": true }),
        ]));

        let all = tasks.list_tasks("900").with_archived(false).collect().await.unwrap();

        assert_eq!(ids(&all), vec!["a", "b", "c"]);
        assert_eq!(
            conn.paths(),
            vec!["/list/900/task?archived=false&page=0", "/list/900/task?archived=false&page=1"]
        );
    }

    #[tokio::test]
    async fn team_tasks_stream_stops_on_empty_page() {
        let (tasks, conn) = service(ScriptedConnection::replying(vec![
            json!({ "tasks": [task("a")] }),
            json!({ "tasks": [task("b")] }),
            json!({ "tasks": [] }),
        ]));

        let all = tasks.team_tasks("77").with_space("s1").collect().await.unwrap();

        assert_eq!(ids(&all), vec!["a", "b"]);
        assert_eq!(conn.paths().len(), 3);
        assert_eq!(conn.paths()[2], "/team/77/task?space_ids%5B%5D=s1&page=2");
    }

    #[tokio::test]
    async fn null_page_ends_stream_immediately() {
        let (tasks, conn) = service(ScriptedConnection::new(vec![Ok(None)]));
        let all = tasks.list_tasks("1").collect().await.unwrap();
        assert!(all.is_empty());
        assert_eq!(conn.paths(), vec!["/list/1/task?page=0"]);
    }

    #[tokio::test]
    async fn single_page_tolerates_missing_collection() {
        let (tasks, _) = service(ScriptedConnection::replying(vec![json!({ "last_page": true })]));
        assert!(tasks.list_tasks("1").page(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invoking_stream_twice_restarts_at_page_zero() {
        let (tasks, conn) = service(ScriptedConnection::replying(vec![
            json!({ "tasks": [task("a")], "last_page": true }),
            json!({ "tasks": [task("a")], "last_page": true }),
        ]));

        let first = collect_all(tasks.get_tasks_stream("1", GetTasksRequest::default())).await.unwrap();
        let second = collect_all(tasks.get_tasks_stream("1", GetTasksRequest::default())).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(conn.paths(), vec!["/list/1/task?page=0", "/list/1/task?page=0"]);
    }

    #[tokio::test]
    async fn filter_renders_every_option() {
        let (tasks, conn) = service(ScriptedConnection::replying(vec![json!({ "tasks": [] })]));

        tasks
            .list_tasks("1")
            .with_order_by(TaskOrderBy::DueDate)
            .with_reverse(true)
            .with_include_closed(true)
            .with_status("in progress")
            .with_assignee(5)
            .with_assignee(6)
            .with_due_date_after(100)
            .with_due_date_before(200)
            .page(0)
            .await
            .unwrap();

        assert_eq!(
            conn.paths()[0],
            "/list/1/task?order_by=due_date&reverse=true&include_closed=true\
             &statuses%5B%5D=in%20progress&assignees%5B%5D=5&assignees%5B%5D=6\
             &due_date_gt=100&due_date_lt=200&page=0"
        );
    }

    #[tokio::test]
    async fn inverted_date_range_fails_before_any_request() {
        let (tasks, conn) = service(ScriptedConnection::default());
        let err = tasks
            .list_tasks("1")
            .with_created_after(500)
            .with_created_before(100)
            .stream()
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(conn.calls().is_empty());
    }

    #[tokio::test]
    async fn stream_error_propagates() {
        let (tasks, _) = service(ScriptedConnection::new(vec![
            Ok(Some(json!({ "tasks": [task("a")], "last_page": false }))),
            Err(ApiError::from(crate::error::TransportError::NotFound)),
        ]));
        let mut stream = tasks.list_tasks("1").stream().unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().id, "a");
        assert!(stream.next().await.unwrap().unwrap_err().is_not_found());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn get_task_renders_custom_id_lookup() {
        let (tasks, conn) = service(ScriptedConnection::replying(vec![task("DEV-1")]));
        let found = tasks.task("DEV-1").with_custom_task_ids("9000").get().await.unwrap();
        assert_eq!(found.id, "DEV-1");
        assert_eq!(conn.paths(), vec!["/task/DEV-1?custom_task_ids=true&team_id=9000"]);
    }

    #[tokio::test]
    async fn get_task_null_payload_is_invalid_response() {
        let (tasks, _) = service(ScriptedConnection::new(vec![Ok(None)]));
        let err = tasks.task("x").get().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn create_task_posts_only_set_fields() {
        let (tasks, conn) = service(ScriptedConnection::replying(vec![task("new")]));
        tasks
            .new_task("900", "Write docs")
            .with_priority(Priority::High)
            .with_tag("docs")
            .create()
            .await
            .unwrap();

        let calls = conn.calls();
        let call = &calls[0];
        assert_eq!(call.method, HttpMethod::Post);
        assert_eq!(call.path, "/list/900/task");
        assert_eq!(
            call.body.as_ref().unwrap(),
            &json!({ "name": "Write docs", "priority": 2, "tags": ["docs"] })
        );
    }

    #[test]
    fn create_task_rejects_both_description_kinds() {
        let (tasks, _) = service(ScriptedConnection::default());
        let err = tasks
            .new_task("1", "n")
            .with_description("plain")
            .with_markdown_description("*md*")
            .build()
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn create_task_rejects_blank_name() {
        let (tasks, _) = service(ScriptedConnection::default());
        assert!(tasks.new_task("1", "   ").build().is_err());
    }

    #[tokio::test]
    async fn update_distinguishes_clear_from_absent() {
        let (tasks, conn) = service(ScriptedConnection::replying(vec![task("t")]));
        tasks
            .edit_task("t")
            .clear_due_date()
            .with_assignee_added(1)
            .with_assignee_removed(2)
            .update()
            .await
            .unwrap();

        let body = conn.calls()[0].body.clone().unwrap();
        assert_eq!(body, json!({ "due_date": null, "assignees": { "add": [1], "rem": [2] } }));
    }

    #[test]
    fn empty_update_is_rejected() {
        let (tasks, _) = service(ScriptedConnection::default());
        assert!(tasks.edit_task("t").build().is_err());
    }

    #[test]
    fn conflicting_assignee_change_is_rejected() {
        let (tasks, _) = service(ScriptedConnection::default());
        let err = tasks
            .edit_task("t")
            .with_assignee_added(3)
            .with_assignee_removed(3)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("assignee 3"));
    }

    #[test]
    fn dependency_conflict_surfaces_only_at_terminal_build() {
        let (tasks, _) = service(ScriptedConnection::default());
        let builder = tasks.dependency("a").with_depends_on("b").with_dependency_of("c");
        assert_eq!(builder.draft().depends_on.as_deref(), Some("b"));
        assert_eq!(builder.draft().dependency_of.as_deref(), Some("c"));
        assert!(matches!(builder.build(), Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_dependency_never_reaches_transport() {
        let (tasks, conn) = service(ScriptedConnection::default());
        assert!(tasks.dependency("a").add().await.is_err());
        assert!(conn.calls().is_empty());
    }

    #[tokio::test]
    async fn dependency_add_and_remove() {
        let (tasks, conn) = service(ScriptedConnection::default());
        tasks.dependency("a").with_depends_on("b").add().await.unwrap();
        tasks.dependency("a").with_dependency_of("c").remove().await.unwrap();

        let calls = conn.calls();
        assert_eq!(calls[0].method, HttpMethod::Post);
        assert_eq!(calls[0].path, "/task/a/dependency");
        assert_eq!(calls[0].body, Some(json!({ "depends_on": "b" })));
        assert_eq!(calls[1].method, HttpMethod::Delete);
        assert_eq!(calls[1].path, "/task/a/dependency?dependency_of=c");
    }

    #[test]
    fn independent_builders_do_not_share_state() {
        let (tasks, _) = service(ScriptedConnection::default());
        let open = tasks.list_tasks("1").with_status("open");
        let closed = tasks.list_tasks("1").with_status("closed").with_include_closed(true);

        let open = open.build().unwrap();
        let closed = closed.build().unwrap();
        assert_eq!(open.filter().statuses(), ["open".to_string()]);
        assert_eq!(closed.filter().statuses(), ["closed".to_string()]);
        assert_eq!(open.filter().archived(), None);
    }

    #[tokio::test]
    async fn delete_task_issues_delete() {
        let (tasks, conn) = service(ScriptedConnection::default());
        tasks.delete_task("abc").await.unwrap();
        assert_eq!(conn.calls()[0].method, HttpMethod::Delete);
        assert_eq!(conn.paths(), vec!["/task/abc"]);
    }
}
