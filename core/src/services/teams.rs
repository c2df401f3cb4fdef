//! Workspaces the token is authorized for.

use serde::Deserialize;

use crate::connection::ApiConnection;
use crate::error::ApiError;
use crate::response::or_empty;
use crate::services::ServiceContext;
use crate::types::Team;

#[derive(Debug, Deserialize)]
struct TeamsResponse {
    teams: Option<Vec<Team>>,
}

pub struct TeamService<C> {
    ctx: ServiceContext<C>,
}

impl<C> TeamService<C> {
    pub(crate) fn new(ctx: ServiceContext<C>) -> Self {
        Self { ctx }
    }
}

impl<C: ApiConnection> TeamService<C> {
    pub async fn get_authorized_teams(&self) -> Result<Vec<Team>, ApiError> {
        let response: Option<TeamsResponse> = self.ctx.get_optional("/team").await?;
        Ok(or_empty(response.and_then(|r| r.teams)))
    }
}
