//! Entry point tying a connection to the resource services.
//!
//! # Design
//! `ClickUpClient` owns one shared `ApiConnection` and one cancellation
//! scope. Service handles are created on demand and borrow nothing from the
//! client, so they can be moved into tasks. `scoped` derives a client whose
//! calls and streams observe a different token; `cancel` fires the scope of
//! the client it is called on, stopping in-flight calls and the next page
//! fetch of every open stream.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::connection::HttpApiConnection;
use crate::error::ApiError;
use crate::services::folders::FolderService;
use crate::services::lists::ListService;
use crate::services::spaces::SpaceService;
use crate::services::tasks::TaskService;
use crate::services::teams::TeamService;
use crate::services::time_tracking::TimeTrackingService;
use crate::services::views::ViewService;
use crate::services::webhooks::WebhookService;
use crate::services::ServiceContext;

#[derive(Debug)]
pub struct ClickUpClient<C = HttpApiConnection> {
    ctx: ServiceContext<C>,
}

impl<C> Clone for ClickUpClient<C> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl ClickUpClient<HttpApiConnection> {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_connection(HttpApiConnection::new(config)?))
    }

    /// Build from `CLICKUP_API_TOKEN` and `CLICKUP_API_URL`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(&ClientConfig::from_env()?)
    }
}

impl<C> ClickUpClient<C> {
    pub fn with_connection(conn: C) -> Self {
        Self::from_shared(Arc::new(conn))
    }

    pub fn from_shared(conn: Arc<C>) -> Self {
        Self {
            ctx: ServiceContext::new(conn, CancellationToken::new()),
        }
    }

    /// A client sharing this connection whose calls observe `token` instead.
    pub fn scoped(&self, token: CancellationToken) -> Self {
        Self {
            ctx: self.ctx.with_cancellation(token),
        }
    }

    /// A client scoped to a child of this client's token: cancelling this
    /// client cancels the child, not the other way round.
    pub fn child(&self) -> Self {
        self.scoped(self.ctx.cancellation().child_token())
    }

    pub fn cancellation(&self) -> &CancellationToken {
        self.ctx.cancellation()
    }

    pub fn cancel(&self) {
        self.ctx.cancellation().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.ctx.cancellation().is_cancelled()
    }

    pub fn tasks(&self) -> TaskService<C> {
        TaskService::new(self.ctx.clone())
    }

    pub fn lists(&self) -> ListService<C> {
        ListService::new(self.ctx.clone())
    }

    pub fn folders(&self) -> FolderService<C> {
        FolderService::new(self.ctx.clone())
    }

    pub fn spaces(&self) -> SpaceService<C> {
        SpaceService::new(self.ctx.clone())
    }

    pub fn teams(&self) -> TeamService<C> {
        TeamService::new(self.ctx.clone())
    }

    pub fn views(&self) -> ViewService<C> {
        ViewService::new(self.ctx.clone())
    }

    pub fn time_tracking(&self) -> TimeTrackingService<C> {
        TimeTrackingService::new(self.ctx.clone())
    }

    pub fn webhooks(&self) -> WebhookService<C> {
        WebhookService::new(self.ctx.clone())
    }
}
