//! Folders inside a space.

use serde::{Deserialize, Serialize};

use crate::connection::ApiConnection;
use crate::error::ApiError;
use crate::query::{path_segment, QueryString};
use crate::response::or_empty;
use crate::services::ServiceContext;
use crate::types::Folder;

#[derive(Debug, Deserialize)]
struct FoldersResponse {
    folders: Option<Vec<Folder>>,
}

#[derive(Debug, Serialize)]
struct FolderName<'a> {
    name: &'a str,
}

fn check_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("folder name must not be empty"));
    }
    Ok(())
}

pub struct FolderService<C> {
    ctx: ServiceContext<C>,
}

impl<C> FolderService<C> {
    pub(crate) fn new(ctx: ServiceContext<C>) -> Self {
        Self { ctx }
    }
}

impl<C: ApiConnection> FolderService<C> {
    pub async fn get_folder(&self, folder_id: &str) -> Result<Folder, ApiError> {
        self.ctx.get_required(&format!("/folder/{}", path_segment(folder_id)), "get_folder").await
    }

    pub async fn get_folders(&self, space_id: &str, archived: Option<bool>) -> Result<Vec<Folder>, ApiError> {
        let mut query = QueryString::new();
        query.push_bool("archived", archived);
        let path = format!("/space/{}/folder{}", path_segment(space_id), query.render());
        let response: Option<FoldersResponse> = self.ctx.get_optional(&path).await?;
        Ok(or_empty(response.and_then(|r| r.folders)))
    }

    pub async fn create_folder(&self, space_id: &str, name: &str) -> Result<Folder, ApiError> {
        check_name(name)?;
        let path = format!("/space/{}/folder", path_segment(space_id));
        self.ctx.post_required(&path, &FolderName { name }, "create_folder").await
    }

    pub async fn update_folder(&self, folder_id: &str, name: &str) -> Result<Folder, ApiError> {
        check_name(name)?;
        let path = format!("/folder/{}", path_segment(folder_id));
        self.ctx.put_required(&path, &FolderName { name }, "update_folder").await
    }

    pub async fn delete_folder(&self, folder_id: &str) -> Result<(), ApiError> {
        self.ctx.delete(&format!("/folder/{}", path_segment(folder_id))).await
    }
}
