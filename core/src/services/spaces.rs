//! Spaces inside a workspace.

use serde::{Deserialize, Serialize};

use crate::connection::ApiConnection;
use crate::error::ApiError;
use crate::query::{path_segment, QueryString};
use crate::request::RequestModel;
use crate::response::or_empty;
use crate::services::ServiceContext;
use crate::types::Space;

#[derive(Debug, Deserialize)]
struct SpacesResponse {
    spaces: Option<Vec<Space>>,
}

/// Body for creating or updating a space.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SpaceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    multiple_assignees: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

impl SpaceRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_multiple_assignees(mut self, enabled: bool) -> Self {
        self.multiple_assignees = Some(enabled);
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = Some(private);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

impl RequestModel for SpaceRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ApiError::validation("space name must not be empty"));
        }
        Ok(())
    }
}

pub struct SpaceService<C> {
    ctx: ServiceContext<C>,
}

impl<C> SpaceService<C> {
    pub(crate) fn new(ctx: ServiceContext<C>) -> Self {
        Self { ctx }
    }
}

impl<C: ApiConnection> SpaceService<C> {
    pub async fn get_space(&self, space_id: &str) -> Result<Space, ApiError> {
        self.ctx.get_required(&format!("/space/{}", path_segment(space_id)), "get_space").await
    }

    pub async fn get_spaces(&self, team_id: &str, archived: Option<bool>) -> Result<Vec<Space>, ApiError> {
        let mut query = QueryString::new();
        query.push_bool("archived", archived);
        let path = format!("/team/{}/space{}", path_segment(team_id), query.render());
        let response: Option<SpacesResponse> = self.ctx.get_optional(&path).await?;
        Ok(or_empty(response.and_then(|r| r.spaces)))
    }

    pub async fn create_space(&self, team_id: &str, request: SpaceRequest) -> Result<Space, ApiError> {
        let request = request.validated()?;
        if request.name.is_none() {
            return Err(ApiError::validation("a new space needs a name"));
        }
        let path = format!("/team/{}/space", path_segment(team_id));
        self.ctx.post_required(&path, &request, "create_space").await
    }

    pub async fn update_space(&self, space_id: &str, request: SpaceRequest) -> Result<Space, ApiError> {
        let request = request.validated()?;
        let path = format!("/space/{}", path_segment(space_id));
        self.ctx.put_required(&path, &request, "update_space").await
    }

    pub async fn delete_space(&self, space_id: &str) -> Result<(), ApiError> {
        self.ctx.delete(&format!("/space/{}", path_segment(space_id))).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::{context, ScriptedConnection};

    fn service(conn: ScriptedConnection) -> (SpaceService<ScriptedConnection>, std::sync::Arc<ScriptedConnection>) {
        let (ctx, conn) = context(conn);
        (SpaceService::new(ctx), conn)
    }

    #[tokio::test]
    async fn get_spaces_unwraps_collection() {
        let (spaces, conn) = service(ScriptedConnection::replying(vec![json!({
            "spaces": [{ "id": "s1", "name": "Engineering", "statuses": [{ "status": "open" }] }]
        })]));
        let found = spaces.get_spaces("t1", None).await.unwrap();
        assert_eq!(found[0].statuses[0].status, "open");
        assert_eq!(conn.paths(), vec!["/team/t1/space"]);
    }

    #[tokio::test]
    async fn create_space_needs_name() {
        let (spaces, conn) = service(ScriptedConnection::default());
        let err = spaces
            .create_space("t1", SpaceRequest::default().with_private(true))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(conn.calls().is_empty());
    }

    #[tokio::test]
    async fn create_space_sends_options() {
        let (spaces, conn) = service(ScriptedConnection::replying(vec![json!({ "id": "s2", "name": "Ops" })]));
        spaces
            .create_space("t1", SpaceRequest::named("Ops").with_multiple_assignees(true))
            .await
            .unwrap();
        assert_eq!(conn.calls()[0].body, Some(json!({ "name": "Ops", "multiple_assignees": true })));
    }
}
