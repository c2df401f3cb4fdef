//! Resource services, one per API resource family.
//!
//! Every service is a cheap handle over a shared `ApiConnection` and the
//! client's cancellation scope. Services are the only callers of the
//! connection; builders delegate to them.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::connection::ApiConnection;
use crate::error::ApiError;
use crate::pagination::{paginate, PageRequest, PageResponse, PageStream};
use crate::response::require;

pub mod folders;
pub mod lists;
pub mod spaces;
pub mod tasks;
pub mod teams;
pub mod time_tracking;
pub mod views;
pub mod webhooks;

/// Connection plus cancellation scope shared by every service of a client.
#[derive(Debug)]
pub(crate) struct ServiceContext<C> {
    conn: Arc<C>,
    cancel: CancellationToken,
}

impl<C> Clone for ServiceContext<C> {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            cancel: self.cancel.clone(),
        }
    }
}

impl<C> ServiceContext<C> {
    pub(crate) fn new(conn: Arc<C>, cancel: CancellationToken) -> Self {
        Self { conn, cancel }
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            cancel,
        }
    }
}

impl<C: ApiConnection> ServiceContext<C> {
    pub(crate) async fn get_optional<T>(&self, path: &str) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        self.conn.get(path, &self.cancel).await
    }

    pub(crate) async fn get_required<T>(&self, path: &str, what: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        require(self.conn.get(path, &self.cancel).await?, what)
    }

    pub(crate) async fn post_required<B, T>(&self, path: &str, body: &B, what: &str) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        require(self.conn.post(path, body, &self.cancel).await?, what)
    }

    pub(crate) async fn put_required<B, T>(&self, path: &str, body: &B, what: &str) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        require(self.conn.put(path, body, &self.cancel).await?, what)
    }

    pub(crate) async fn post_no_content<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + Sync,
    {
        self.conn.post_no_content(path, body, &self.cancel).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.conn.delete(path, &self.cancel).await
    }
}

impl<C: ApiConnection + 'static> ServiceContext<C> {
    /// Stream a paginated GET endpoint.
    ///
    /// `path_for` renders the full path, query string included, for a base
    /// request and page index.
    pub(crate) fn stream_pages<Q, R, P>(&self, base: Q, path_for: P) -> PageStream<'static, R::Item>
    where
        Q: Send + Sync + 'static,
        R: PageResponse + DeserializeOwned + Send + 'static,
        R::Item: Send + 'static,
        P: Fn(&Q, u32) -> String + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        paginate(base, self.cancel.clone(), move |req: PageRequest<Q>| {
            let conn = Arc::clone(&conn);
            let path = path_for(req.base(), req.page());
            async move {
                let page: Option<R> = conn.get(&path, req.cancellation()).await?;
                Ok(page)
            }
        })
    }
}
