use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// Page size of the real API for task listings.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListRef {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagRef {
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorityRef {
    pub id: String,
    pub priority: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Option<PriorityRef>,
    pub tags: Vec<TagRef>,
    pub list: ListRef,
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookHealth {
    pub status: String,
    pub fail_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Uuid,
    pub team_id: Option<u64>,
    pub endpoint: String,
    pub events: Vec<String>,
    pub space_id: Option<String>,
    pub folder_id: Option<String>,
    pub list_id: Option<String>,
    pub task_id: Option<String>,
    pub health: WebhookHealth,
    pub secret: String,
}

#[derive(Deserialize)]
pub struct CreateWebhook {
    pub endpoint: String,
    pub events: Vec<String>,
    pub space_id: Option<String>,
    pub folder_id: Option<String>,
    pub list_id: Option<String>,
    pub task_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateWebhook {
    pub endpoint: Option<String>,
    pub events: Option<Vec<String>>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
struct PageParams {
    page: Option<usize>,
}

#[derive(Default)]
struct Store {
    tasks: Vec<Task>,
    webhooks: Vec<Webhook>,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    page_size: usize,
}

/// The API's error body: `{"err": "...", "ECODE": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiFailure {
    pub err: String,
    #[serde(rename = "ECODE")]
    pub ecode: String,
    #[serde(skip)]
    status: Option<StatusCode>,
}

impl ApiFailure {
    fn new(status: StatusCode, err: &str, ecode: &str) -> Self {
        Self {
            err: err.to_string(),
            ecode: ecode.to_string(),
            status: Some(status),
        }
    }

    fn task_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Task not found", "ITEM_013")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

pub fn app() -> Router {
    app_with_page_size(DEFAULT_PAGE_SIZE)
}

/// A fresh server whose task listings return `page_size` tasks per page.
pub fn app_with_page_size(page_size: usize) -> Router {
    let state = AppState {
        store: Arc::default(),
        page_size: page_size.max(1),
    };
    Router::new()
        .route("/team", get(get_teams))
        .route("/team/{team_id}/task", get(get_team_tasks))
        .route("/team/{team_id}/webhook", get(get_webhooks).post(create_webhook))
        .route("/list/{list_id}/task", get(get_list_tasks).post(create_task))
        .route("/task/{task_id}", get(get_task).put(update_task).delete(delete_task))
        .route("/webhook/{webhook_id}", put(update_webhook).delete(delete_webhook))
        .layer(middleware::from_fn(require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_page_size(listener: TcpListener, page_size: usize) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_page_size(page_size)).await
}

async fn require_token(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .is_some_and(|token| !token.is_empty());
    if !authorized {
        return ApiFailure::new(StatusCode::UNAUTHORIZED, "Token invalid", "OAUTH_025").into_response();
    }
    next.run(request).await
}

fn priority_ref(priority: u8) -> Result<PriorityRef, ApiFailure> {
    let name = match priority {
        1 => "urgent",
        2 => "high",
        3 => "normal",
        4 => "low",
        _ => return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Priority invalid", "INPUT_003")),
    };
    Ok(PriorityRef {
        id: priority.to_string(),
        priority: name.to_string(),
    })
}

/// Slice `items` for a zero-based page, reporting whether it is the last.
fn page_of<T: Clone>(items: &[T], page: usize, page_size: usize) -> (Vec<T>, bool) {
    let start = page.saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    (items[start..end].to_vec(), end >= items.len())
}

async fn get_teams() -> Json<Value> {
    Json(json!({
        "teams": [{
            "id": "1",
            "name": "Mock Workspace",
            "members": [{ "user": { "id": 1, "username": "mock" } }]
        }]
    }))
}

async fn get_list_tasks(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Json<Value> {
    let store = state.store.read().await;
    let in_list: Vec<Task> = store.tasks.iter().filter(|t| t.list.id == list_id).cloned().collect();
    let page = params.page.unwrap_or(0);
    let (tasks, last_page) = page_of(&in_list, page, state.page_size);
    debug!(%list_id, page, count = tasks.len(), last_page, "list tasks page");
    Json(json!({ "tasks": tasks, "last_page": last_page }))
}

/// Workspace task search reports no `last_page`; the page after the last
/// one is empty.
async fn get_team_tasks(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Json<Value> {
    let store = state.store.read().await;
    let page = params.page.unwrap_or(0);
    let (tasks, _) = page_of(&store.tasks, page, state.page_size);
    debug!(%team_id, page, count = tasks.len(), "team tasks page");
    Json(json!({ "tasks": tasks }))
}

async fn create_task(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
    Json(input): Json<CreateTask>,
) -> Result<Json<Task>, ApiFailure> {
    if input.name.trim().is_empty() {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Task name invalid", "INPUT_005"));
    }
    let priority = input.priority.map(priority_ref).transpose()?;
    let task = Task {
        id: Uuid::new_v4().simple().to_string()[..9].to_string(),
        name: input.name,
        description: input.description,
        status: TaskStatus {
            status: input.status.unwrap_or_else(|| "to do".to_string()),
        },
        priority,
        tags: input.tags.into_iter().map(|name| TagRef { name }).collect(),
        list: ListRef { id: list_id },
    };
    debug!(task_id = %task.id, "created task");
    state.store.write().await.tasks.push(task.clone());
    Ok(Json(task))
}

async fn get_task(State(state): State<AppState>, Path(task_id): Path<String>) -> Result<Json<Task>, ApiFailure> {
    let store = state.store.read().await;
    store
        .tasks
        .iter()
        .find(|t| t.id == task_id)
        .cloned()
        .map(Json)
        .ok_or_else(ApiFailure::task_not_found)
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(input): Json<UpdateTask>,
) -> Result<Json<Task>, ApiFailure> {
    let mut store = state.store.write().await;
    let task = store
        .tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or_else(ApiFailure::task_not_found)?;
    if let Some(name) = input.name {
        task.name = name;
    }
    if let Some(description) = input.description {
        task.description = Some(description);
    }
    if let Some(status) = input.status {
        task.status = TaskStatus { status };
    }
    if let Some(priority) = input.priority {
        task.priority = Some(priority_ref(priority)?);
    }
    Ok(Json(task.clone()))
}

async fn delete_task(State(state): State<AppState>, Path(task_id): Path<String>) -> Result<StatusCode, ApiFailure> {
    let mut store = state.store.write().await;
    let before = store.tasks.len();
    store.tasks.retain(|t| t.id != task_id);
    if store.tasks.len() == before {
        return Err(ApiFailure::task_not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_webhooks(State(state): State<AppState>, Path(team_id): Path<String>) -> Json<Value> {
    let team_id = team_id.parse::<u64>().ok();
    let store = state.store.read().await;
    let webhooks: Vec<&Webhook> = store.webhooks.iter().filter(|w| w.team_id == team_id).collect();
    Json(json!({ "webhooks": webhooks }))
}

async fn create_webhook(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(input): Json<CreateWebhook>,
) -> Result<Json<Value>, ApiFailure> {
    if input.events.is_empty() {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "No events specified", "OAUTH_040"));
    }
    let webhook = Webhook {
        id: Uuid::new_v4(),
        team_id: team_id.parse().ok(),
        endpoint: input.endpoint,
        events: input.events,
        space_id: input.space_id,
        folder_id: input.folder_id,
        list_id: input.list_id,
        task_id: input.task_id,
        health: WebhookHealth {
            status: "active".to_string(),
            fail_count: 0,
        },
        secret: Uuid::new_v4().simple().to_string(),
    };
    debug!(webhook_id = %webhook.id, "created webhook");
    state.store.write().await.webhooks.push(webhook.clone());
    Ok(Json(json!({ "id": webhook.id, "webhook": webhook })))
}

async fn update_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
    Json(input): Json<UpdateWebhook>,
) -> Result<Json<Value>, ApiFailure> {
    let mut store = state.store.write().await;
    let webhook = store
        .webhooks
        .iter_mut()
        .find(|w| w.id == webhook_id)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Webhook not found", "OAUTH_042"))?;
    if let Some(endpoint) = input.endpoint {
        webhook.endpoint = endpoint;
    }
    if let Some(events) = input.events {
        webhook.events = events;
    }
    if let Some(status) = input.status {
        webhook.health.status = status;
    }
    Ok(Json(json!({ "id": webhook.id, "webhook": webhook })))
}

async fn delete_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
) -> Result<Json<Value>, ApiFailure> {
    let mut store = state.store.write().await;
    let before = store.webhooks.len();
    store.webhooks.retain(|w| w.id != webhook_id);
    if store.webhooks.len() == before {
        return Err(ApiFailure::new(StatusCode::NOT_FOUND, "Webhook not found", "OAUTH_042"));
    }
    Ok(Json(json!({})))
}
