//! Lists, inside folders or directly inside spaces ("folderless").

use serde::{Deserialize, Serialize};

use crate::connection::ApiConnection;
use crate::error::ApiError;
use crate::query::{path_segment, QueryString};
use crate::request::RequestModel;
use crate::response::or_empty;
use crate::services::ServiceContext;
use crate::types::{Priority, TaskList};

/// Where a new list is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListParent {
    Folder(String),
    Space(String),
}

impl ListParent {
    fn lists_path(&self) -> String {
        match self {
            ListParent::Folder(id) => format!("/folder/{}/list", path_segment(id)),
            ListParent::Space(id) => format!("/space/{}/list", path_segment(id)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListsResponse {
    lists: Option<Vec<TaskList>>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CreateListRequest {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

impl RequestModel for CreateListRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("list name must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UpdateListRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unset_status: Option<bool>,
}

impl RequestModel for UpdateListRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if *self == Self::default() {
            return Err(ApiError::validation("update sets no fields"));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ApiError::validation("list name must not be empty"));
        }
        Ok(())
    }
}

pub struct ListService<C> {
    ctx: ServiceContext<C>,
}

impl<C> Clone for ListService<C> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl<C> ListService<C> {
    pub(crate) fn new(ctx: ServiceContext<C>) -> Self {
        Self { ctx }
    }

    pub fn new_list(&self, parent: ListParent, name: impl Into<String>) -> CreateListBuilder<C> {
        CreateListBuilder {
            service: self.clone(),
            parent,
            draft: CreateListRequest {
                name: name.into(),
                ..CreateListRequest::default()
            },
        }
    }

    pub fn edit_list(&self, list_id: impl Into<String>) -> UpdateListBuilder<C> {
        UpdateListBuilder {
            service: self.clone(),
            list_id: list_id.into(),
            draft: UpdateListRequest::default(),
        }
    }
}

impl<C: ApiConnection> ListService<C> {
    pub async fn get_list(&self, list_id: &str) -> Result<TaskList, ApiError> {
        self.ctx.get_required(&format!("/list/{}", path_segment(list_id)), "get_list").await
    }

    pub async fn get_lists(&self, folder_id: &str, archived: Option<bool>) -> Result<Vec<TaskList>, ApiError> {
        self.fetch_lists(&ListParent::Folder(folder_id.to_string()), archived).await
    }

    pub async fn get_folderless_lists(&self, space_id: &str, archived: Option<bool>) -> Result<Vec<TaskList>, ApiError> {
        self.fetch_lists(&ListParent::Space(space_id.to_string()), archived).await
    }

    async fn fetch_lists(&self, parent: &ListParent, archived: Option<bool>) -> Result<Vec<TaskList>, ApiError> {
        let mut query = QueryString::new();
        query.push_bool("archived", archived);
        let path = format!("{}{}", parent.lists_path(), query.render());
        let response: Option<ListsResponse> = self.ctx.get_optional(&path).await?;
        Ok(or_empty(response.and_then(|r| r.lists)))
    }

    pub async fn create_list(&self, parent: &ListParent, request: &CreateListRequest) -> Result<TaskList, ApiError> {
        self.ctx.post_required(&parent.lists_path(), request, "create_list").await
    }

    pub async fn update_list(&self, list_id: &str, request: &UpdateListRequest) -> Result<TaskList, ApiError> {
        let path = format!("/list/{}", path_segment(list_id));
        self.ctx.put_required(&path, request, "update_list").await
    }

    pub async fn delete_list(&self, list_id: &str) -> Result<(), ApiError> {
        self.ctx.delete(&format!("/list/{}", path_segment(list_id))).await
    }

    /// Add an existing task to an additional list.
    pub async fn add_task_to_list(&self, list_id: &str, task_id: &str) -> Result<(), ApiError> {
        let path = format!("/list/{}/task/{}", path_segment(list_id), path_segment(task_id));
        self.ctx.post_no_content(&path, &serde_json::json!({})).await
    }

    pub async fn remove_task_from_list(&self, list_id: &str, task_id: &str) -> Result<(), ApiError> {
        let path = format!("/list/{}/task/{}", path_segment(list_id), path_segment(task_id));
        self.ctx.delete(&path).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct CreateListBuilder<C> {
    service: ListService<C>,
    parent: ListParent,
    draft: CreateListRequest,
}

impl<C> CreateListBuilder<C> {
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.draft.content = Some(content.into());
        self
    }

    pub fn with_due_date(mut self, unix_ms: i64, include_time: bool) -> Self {
        self.draft.due_date = Some(unix_ms);
        self.draft.due_date_time = Some(include_time);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.draft.priority = Some(priority);
        self
    }

    pub fn with_assignee(mut self, user_id: u64) -> Self {
        self.draft.assignee = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.draft.status = Some(status.into());
        self
    }

    pub fn build(self) -> Result<CreateListRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection> CreateListBuilder<C> {
    pub async fn create(self) -> Result<TaskList, ApiError> {
        let request = self.draft.validated()?;
        self.service.create_list(&self.parent, &request).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct UpdateListBuilder<C> {
    service: ListService<C>,
    list_id: String,
    draft: UpdateListRequest,
}

impl<C> UpdateListBuilder<C> {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.draft.name = Some(name.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.draft.content = Some(content.into());
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

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.draft.priority = Some(priority);
        self
    }

    pub fn with_assignee(mut self, user_id: u64) -> Self {
        self.draft.assignee = Some(user_id);
        self
    }

    pub fn with_unset_status(mut self, unset: bool) -> Self {
        self.draft.unset_status = Some(unset);
        self
    }

    pub fn build(self) -> Result<UpdateListRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection> UpdateListBuilder<C> {
    pub async fn update(self) -> Result<TaskList, ApiError> {
        let request = self.draft.validated()?;
        self.service.update_list(&self.list_id, &request).await
    }
}
