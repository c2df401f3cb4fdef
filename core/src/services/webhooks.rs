//! Webhook subscriptions for a workspace.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::ApiConnection;
use crate::error::ApiError;
use crate::query::path_segment;
use crate::request::{at_most_one, RequestModel};
use crate::response::{or_empty, require};
use crate::services::ServiceContext;
use crate::types::{Webhook, WebhookEvent};

#[derive(Debug, Deserialize)]
struct WebhooksResponse {
    webhooks: Option<Vec<Webhook>>,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    webhook: Option<Webhook>,
}

fn check_endpoint(endpoint: &str) -> Result<(), ApiError> {
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        Ok(())
    } else {
        Err(ApiError::validation(format!("webhook endpoint must be an http(s) URL, got {endpoint:?}")))
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CreateWebhookRequest {
    endpoint: String,
    events: Vec<WebhookEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    space_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    list_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
}

impl CreateWebhookRequest {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn events(&self) -> &[WebhookEvent] {
        &self.events
    }
}

impl RequestModel for CreateWebhookRequest {
    fn validate(&self) -> Result<(), ApiError> {
        check_endpoint(&self.endpoint)?;
        if self.events.is_empty() {
            return Err(ApiError::validation("a webhook needs at least one event"));
        }
        at_most_one(&[
            ("space_id", self.space_id.is_some()),
            ("folder_id", self.folder_id.is_some()),
            ("list_id", self.list_id.is_some()),
            ("task_id", self.task_id.is_some()),
        ])
    }
}

/// Status values accepted when updating a webhook.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UpdateWebhookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<WebhookEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<WebhookStatus>,
}

impl UpdateWebhookRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = WebhookEvent>) -> Self {
        self.events = Some(events.into_iter().collect());
        self
    }

    pub fn with_status(mut self, status: WebhookStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl RequestModel for UpdateWebhookRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.endpoint.is_none() && self.events.is_none() && self.status.is_none() {
            return Err(ApiError::validation("webhook update sets no fields"));
        }
        if let Some(endpoint) = &self.endpoint {
            check_endpoint(endpoint)?;
        }
        if matches!(&self.events, Some(events) if events.is_empty()) {
            return Err(ApiError::validation("a webhook needs at least one event"));
        }
        Ok(())
    }
}

pub struct WebhookService<C> {
    ctx: ServiceContext<C>,
}

impl<C> Clone for WebhookService<C> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl<C> WebhookService<C> {
    pub(crate) fn new(ctx: ServiceContext<C>) -> Self {
        Self { ctx }
    }

    /// Start a subscription. Endpoint and events are checked when the
    /// builder is finished.
    pub fn new_webhook(&self, team_id: impl Into<String>) -> CreateWebhookBuilder<C> {
        CreateWebhookBuilder {
            service: self.clone(),
            team_id: team_id.into(),
            draft: CreateWebhookRequest::default(),
        }
    }
}

impl<C: ApiConnection> WebhookService<C> {
    pub async fn get_webhooks(&self, team_id: &str) -> Result<Vec<Webhook>, ApiError> {
        let path = format!("/team/{}/webhook", path_segment(team_id));
        let response: Option<WebhooksResponse> = self.ctx.get_optional(&path).await?;
        Ok(or_empty(response.and_then(|r| r.webhooks)))
    }

    pub async fn create_webhook(&self, team_id: &str, request: CreateWebhookRequest) -> Result<Webhook, ApiError> {
        let request = request.validated()?;
        let path = format!("/team/{}/webhook", path_segment(team_id));
        let envelope: WebhookEnvelope = self.ctx.post_required(&path, &request, "create_webhook").await?;
        require(envelope.webhook, "create_webhook.webhook")
    }

    pub async fn update_webhook(&self, webhook_id: &Uuid, request: UpdateWebhookRequest) -> Result<Webhook, ApiError> {
        let request = request.validated()?;
        let path = format!("/webhook/{webhook_id}");
        let envelope: WebhookEnvelope = self.ctx.put_required(&path, &request, "update_webhook").await?;
        require(envelope.webhook, "update_webhook.webhook")
    }

    pub async fn delete_webhook(&self, webhook_id: &Uuid) -> Result<(), ApiError> {
        self.ctx.delete(&format!("/webhook/{webhook_id}")).await
    }
}

#[must_use = "builders do nothing until a terminal method is called"]
pub struct CreateWebhookBuilder<C> {
    service: WebhookService<C>,
    team_id: String,
    draft: CreateWebhookRequest,
}

impl<C> CreateWebhookBuilder<C> {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.draft.endpoint = endpoint.into();
        self
    }

    pub fn with_event(mut self, event: WebhookEvent) -> Self {
        self.draft.events.push(event);
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = WebhookEvent>) -> Self {
        self.draft.events.extend(events);
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

    pub fn build(self) -> Result<CreateWebhookRequest, ApiError> {
        self.draft.validated()
    }
}

impl<C: ApiConnection> CreateWebhookBuilder<C> {
    pub async fn create(self) -> Result<Webhook, ApiError> {
        self.service.create_webhook(&self.team_id, self.draft).await
    }
}
