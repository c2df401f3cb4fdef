//! Scripted `ApiConnection` for service-level unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::connection::ApiConnection;
use crate::error::{ApiError, TransportError};
use crate::http::HttpMethod;
use crate::services::ServiceContext;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

/// Answers calls in order from a script of JSON payloads.
///
/// `Ok(None)` replays an empty 2xx body. Calls past the end of the script
/// answer `Ok(None)`.
#[derive(Default)]
pub(crate) struct ScriptedConnection {
    script: Mutex<VecDeque<Result<Option<Value>, ApiError>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedConnection {
    pub fn new(script: Vec<Result<Option<Value>, ApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Arc::default(),
        }
    }

    pub fn replying(payloads: Vec<Value>) -> Self {
        Self::new(payloads.into_iter().map(|v| Ok(Some(v))).collect())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    fn record(&self, method: HttpMethod, path: &str, body: Option<Value>) -> Result<Option<Value>, ApiError> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body,
        });
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    fn decode<T: DeserializeOwned>(reply: Result<Option<Value>, ApiError>) -> Result<Option<T>, ApiError> {
        match reply? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| TransportError::Deserialization(e.to_string()).into()),
        }
    }
}

#[async_trait]
impl ApiConnection for ScriptedConnection {
    async fn get<T>(&self, path: &str, cancel: &CancellationToken) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        Self::decode(self.record(HttpMethod::Get, path, None))
    }

    async fn post<B, T>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<Option<T>, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let body = serde_json::to_value(body).ok();
        Self::decode(self.record(HttpMethod::Post, path, body))
    }

    async fn put<B, T>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<Option<T>, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let body = serde_json::to_value(body).ok();
        Self::decode(self.record(HttpMethod::Put, path, body))
    }

    async fn post_no_content<B>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<(), ApiError>
    where
        B: Serialize + Sync,
    {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let body = serde_json::to_value(body).ok();
        self.record(HttpMethod::Post, path, body).map(|_| ())
    }

    async fn delete(&self, path: &str, cancel: &CancellationToken) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.record(HttpMethod::Delete, path, None).map(|_| ())
    }
}

/// A service context over a scripted connection, returning the connection
/// for call inspection.
pub(crate) fn context(conn: ScriptedConnection) -> (ServiceContext<ScriptedConnection>, Arc<ScriptedConnection>) {
    let conn = Arc::new(conn);
    (ServiceContext::new(Arc::clone(&conn), CancellationToken::new()), conn)
}
