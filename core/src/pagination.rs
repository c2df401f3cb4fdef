//! Turns a "fetch page N" operation into one lazy stream of items.
//!
//! # Design
//! The engine owns the page cursor. Starting at page 0 it calls the fetch
//! function, yields that page's items in server order, and decides whether
//! another page exists before asking for it. Pages are fetched strictly one
//! after another and only when the consumer polls past the end of the
//! current page, so at most one page is buffered.
//!
//! Two termination signals exist across the API: an explicit `last_page`
//! flag, and an implicit empty page. A `null` response or a `null` item
//! collection also ends the stream without error. The cancellation scope is
//! checked before every fetch; a fired scope ends the stream with
//! `ApiError::Cancelled` so callers can tell it apart from normal completion.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ApiError;

/// One page of a paginated response.
pub trait PageResponse {
    type Item;

    /// Explicit last-page flag, or `None` for resources that signal the end
    /// with an empty page.
    fn last_page(&self) -> Option<bool>;

    /// The page's items. `None` when the server sent no collection at all.
    fn into_items(self) -> Option<Vec<Self::Item>>;
}

/// A base request plus the page index the engine is asking for.
///
/// Only the engine constructs these, so the page index is never chosen by a
/// caller once streaming has started.
#[derive(Debug)]
pub struct PageRequest<Q> {
    base: Arc<Q>,
    page: u32,
    cancel: CancellationToken,
}

impl<Q> PageRequest<Q> {
    pub fn base(&self) -> &Q {
        &self.base
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A lazily consumed, finite stream of items from a paginated endpoint.
pub type PageStream<'a, T> = BoxStream<'a, Result<T, ApiError>>;

struct Cursor<Q, F> {
    base: Arc<Q>,
    next_page: u32,
    finished: bool,
    cancel: CancellationToken,
    fetch: F,
}

/// Stream every item of a paginated endpoint.
///
/// `fetch` is called with page 0, 1, 2, ... until a page signals the end.
/// Each call to `paginate` starts a fresh cursor.
pub fn paginate<'a, Q, R, F, Fut>(base: Q, cancel: CancellationToken, fetch: F) -> PageStream<'a, R::Item>
where
    Q: Send + Sync + 'a,
    R: PageResponse + Send + 'a,
    R::Item: Send + 'a,
    F: FnMut(PageRequest<Q>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Option<R>, ApiError>> + Send + 'a,
{
    let cursor = Cursor {
        base: Arc::new(base),
        next_page: 0,
        finished: false,
        cancel,
        fetch,
    };

    stream::try_unfold(cursor, |mut cursor| async move {
        if cursor.finished {
            return Ok(None);
        }
        if cursor.cancel.is_cancelled() {
            warn!(page = cursor.next_page, "pagination cancelled before fetch");
            return Err(ApiError::Cancelled);
        }

        let page = cursor.next_page;
        let request = PageRequest {
            base: Arc::clone(&cursor.base),
            page,
            cancel: cursor.cancel.clone(),
        };
        let Some(response) = (cursor.fetch)(request).await? else {
            debug!(page, "null page response, ending stream");
            return Ok(None);
        };
        let last_page = response.last_page();
        let Some(items) = response.into_items() else {
            debug!(page, "page without item collection, ending stream");
            return Ok(None);
        };

        debug!(page, items = items.len(), ?last_page, "fetched page");
        // An empty page ends the stream even when a flag says otherwise.
        cursor.finished = items.is_empty() || last_page == Some(true);
        cursor.next_page += 1;
        Ok(Some((items, cursor)))
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
    .try_flatten()
    .boxed()
}

/// Drain a page stream into a `Vec`, stopping at the first error.
pub async fn collect_all<T>(stream: PageStream<'_, T>) -> Result<Vec<T>, ApiError> {
    stream.try_collect().await
}
