//! Tasks visible through a saved view.

use serde::Deserialize;

use crate::connection::ApiConnection;
use crate::pagination::{PageResponse, PageStream};
use crate::query::{path_segment, QueryString};
use crate::services::ServiceContext;
use crate::types::Task;

/// Page of `/view/{id}/task`, which reports `last_page`.
#[derive(Debug, Deserialize)]
pub struct ViewTasksPage {
    tasks: Option<Vec<Task>>,
    last_page: Option<bool>,
}

impl PageResponse for ViewTasksPage {
    type Item = Task;

    fn last_page(&self) -> Option<bool> {
        self.last_page
    }

    fn into_items(self) -> Option<Vec<Task>> {
        self.tasks
    }
}

pub struct ViewService<C> {
    ctx: ServiceContext<C>,
}

impl<C> ViewService<C> {
    pub(crate) fn new(ctx: ServiceContext<C>) -> Self {
        Self { ctx }
    }
}

impl<C: ApiConnection + 'static> ViewService<C> {
    pub fn get_view_tasks_stream(&self, view_id: &str) -> PageStream<'static, Task> {
        self.ctx
            .stream_pages::<_, ViewTasksPage, _>(view_id.to_string(), |view_id, page| {
                let mut query = QueryString::new();
                query.push("page", page);
                format!("/view/{}/task{}", path_segment(view_id), query.render())
            })
    }
}
