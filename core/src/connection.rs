//! The `ApiConnection` seam and its HTTP implementation.
//!
//! # Design
//! Resource services only ever talk to an `ApiConnection`. The HTTP
//! implementation keeps request construction and response interpretation as
//! separate, synchronous steps (`build_request` / `parse_response`) around a
//! single awaited `HttpTransport::execute`, so both halves are testable
//! without I/O.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, TransportError};
use crate::http::{self, HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Typed HTTP verbs against the API.
///
/// Typed responses come back as `Option<T>`: `None` means the server answered
/// 2xx with an empty body or a JSON `null`. Deciding whether that is
/// acceptable is left to the calling service.
#[async_trait]
pub trait ApiConnection: Send + Sync {
    async fn get<T>(&self, path: &str, cancel: &CancellationToken) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned + Send;

    async fn post<B, T>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<Option<T>, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send;

    async fn put<B, T>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<Option<T>, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send;

    /// POST whose response body is ignored.
    async fn post_no_content<B>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<(), ApiError>
    where
        B: Serialize + Sync;

    async fn delete(&self, path: &str, cancel: &CancellationToken) -> Result<(), ApiError>;
}

/// `ApiConnection` that speaks JSON over an `HttpTransport`.
#[derive(Debug, Clone)]
pub struct HttpApiConnection<T = ReqwestTransport> {
    base_url: String,
    api_token: String,
    transport: T,
}

impl HttpApiConnection<ReqwestTransport> {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_transport(config, ReqwestTransport::new(config)?))
    }
}

impl<T: HttpTransport> HttpApiConnection<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            api_token: config.api_token().to_string(),
            transport,
        }
    }

    pub fn build_request(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        let mut headers = vec![("authorization".to_string(), self.api_token.clone())];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body,
        }
    }

    pub fn parse_response<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<Option<R>, ApiError> {
        check_status(&response)?;
        decode_body(&response.body)
    }

    async fn send(&self, request: HttpRequest, cancel: &CancellationToken) -> Result<HttpResponse, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let method = request.method;
        let path = request.path.clone();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(method = method.as_str(), %path, "request cancelled in flight");
                return Err(ApiError::Cancelled);
            }
            result = self.transport.execute(request) => result?,
        };
        debug!(method = method.as_str(), %path, status = response.status, "response received");
        Ok(response)
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn decode_body<R: DeserializeOwned>(body: &str) -> Result<Option<R>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<R>>(body)
        .map_err(|e| ApiError::Transport(TransportError::Deserialization(e.to_string())))
}

/// Error body the API returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    err: Option<String>,
    #[serde(rename = "ECODE")]
    ecode: Option<String>,
}

/// Map non-success status codes to the appropriate `TransportError`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        404 => Err(TransportError::NotFound.into()),
        429 => Err(TransportError::RateLimited {
            retry_after: http::retry_after(response),
        }
        .into()),
        status => {
            let parsed = serde_json::from_str::<ErrorBody>(&response.body).ok();
            let code = parsed.as_ref().and_then(|b| b.ecode.clone());
            let message = parsed
                .and_then(|b| b.err)
                .unwrap_or_else(|| response.body.clone());
            Err(TransportError::Status { status, code, message }.into())
        }
    }
}

#[async_trait]
impl<T: HttpTransport> ApiConnection for HttpApiConnection<T> {
    async fn get<R>(&self, path: &str, cancel: &CancellationToken) -> Result<Option<R>, ApiError>
    where
        R: DeserializeOwned + Send,
    {
        let request = self.build_request(HttpMethod::Get, path, None);
        let response = self.send(request, cancel).await?;
        self.parse_response(response)
    }

    async fn post<B, R>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<Option<R>, ApiError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let request = self.build_request(HttpMethod::Post, path, Some(encode_body(body)?));
        let response = self.send(request, cancel).await?;
        self.parse_response(response)
    }

    async fn put<B, R>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<Option<R>, ApiError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let request = self.build_request(HttpMethod::Put, path, Some(encode_body(body)?));
        let response = self.send(request, cancel).await?;
        self.parse_response(response)
    }

    async fn post_no_content<B>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<(), ApiError>
    where
        B: Serialize + Sync,
    {
        let request = self.build_request(HttpMethod::Post, path, Some(encode_body(body)?));
        let response = self.send(request, cancel).await?;
        check_status(&response)
    }

    async fn delete(&self, path: &str, cancel: &CancellationToken) -> Result<(), ApiError> {
        let request = self.build_request(HttpMethod::Delete, path, None);
        let response = self.send(request, cancel).await?;
        check_status(&response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    /// Transport that replays one canned response and records the request.
    struct CannedTransport {
        response: HttpResponse,
        seen: Arc<Mutex<Vec<HttpRequest>>>,
    }

    #[async_trait]
    impl HttpTransport for CannedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    /// Transport that never answers.
    struct HangingTransport;

    #[async_trait]
    impl HttpTransport for HangingTransport {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("the test cancels before the sleep completes")
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("pk_test").with_base_url("http://localhost:3000")
    }

    fn canned(status: u16, body: &str) -> (HttpApiConnection<CannedTransport>, Arc<Mutex<Vec<HttpRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let transport = CannedTransport {
            response: HttpResponse {
                status,
                headers: vec![("Retry-After".to_string(), "3".to_string())],
                body: body.to_string(),
            },
            seen: Arc::clone(&seen),
        };
        (HttpApiConnection::with_transport(&config(), transport), seen)
    }

    #[test]
    fn build_get_request_has_auth_and_no_body() {
        let (conn, _) = canned(200, "");
        let req = conn.build_request(HttpMethod::Get, "/task/abc", None);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/task/abc");
        assert_eq!(req.headers, vec![("authorization".to_string(), "pk_test".to_string())]);
        assert!(req.body.is_none());
    }

    #[test]
    fn build_post_request_sets_content_type() {
        let (conn, _) = canned(200, "");
        let req = conn.build_request(HttpMethod::Post, "/list/1/task", Some("{}".to_string()));
        assert!(req
            .headers
            .contains(&("content-type".to_string(), "application/json".to_string())));
    }

    #[tokio::test]
    async fn get_decodes_json() {
        let (conn, seen) = canned(200, r#"{"id":"abc"}"#);
        let value: Option<serde_json::Value> = conn.get("/task/abc", &CancellationToken::new()).await.unwrap();
        assert_eq!(value.unwrap()["id"], "abc");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn null_and_empty_bodies_are_none() {
        let (conn, _) = canned(200, "null");
        let value: Option<serde_json::Value> = conn.get("/x", &CancellationToken::new()).await.unwrap();
        assert!(value.is_none());

        let (conn, _) = canned(200, "  ");
        let value: Option<serde_json::Value> = conn.get("/x", &CancellationToken::new()).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn not_found_maps_to_dedicated_variant() {
        let (conn, _) = canned(404, "");
        let err = conn.get::<serde_json::Value>("/x", &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let (conn, _) = canned(429, "");
        let err = conn.delete("/x", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport(TransportError::RateLimited { retry_after: Some(d) }) if d == Duration::from_secs(3)
        ));
    }

    #[tokio::test]
    async fn api_error_body_is_extracted() {
        let (conn, _) = canned(401, r#"{"err":"Token invalid","ECODE":"OAUTH_025"}"#);
        let err = conn.get::<serde_json::Value>("/x", &CancellationToken::new()).await.unwrap_err();
        match err {
            ApiError::Transport(TransportError::Status { status, code, message }) => {
                assert_eq!(status, 401);
                assert_eq!(code.as_deref(), Some("OAUTH_025"));
                assert_eq!(message, "Token invalid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_json_is_a_transport_error() {
        let (conn, _) = canned(200, "not json");
        let err = conn.get::<serde_json::Value>("/x", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::Deserialization(_))));
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_transport() {
        let (conn, seen) = canned(200, "{}");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = conn.get::<serde_json::Value>("/x", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_interrupts_in_flight_request() {
        let conn = HttpApiConnection::with_transport(&config(), HangingTransport);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = conn.get::<serde_json::Value>("/x", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
