//! Async client core for the ClickUp v2 REST API.
//!
//! # Overview
//! Resource services (`tasks`, `lists`, `time_tracking`, ...) are reached
//! through [`ClickUpClient`]. Paginated endpoints come back as a lazy
//! [`PageStream`] that fetches one page at a time as the consumer pulls
//! items. Requests with several optional or mutually exclusive parameters
//! are assembled with consuming builders and validated once, at the
//! terminal call.
//!
//! # Design
//! - Services only talk to an [`ApiConnection`]. The HTTP implementation
//!   splits each call into `build_request` and `parse_response` around a
//!   single transport round-trip, so both halves are testable without I/O.
//! - Cancellation is scoped: each client carries a `CancellationToken` that
//!   every call and every page fetch observes.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.
//! - The library logs through `tracing` and never installs a subscriber.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod pagination;
pub mod query;
pub mod request;
pub mod response;
pub mod services;
pub mod types;

#[cfg(test)]
mod test_support;

pub use client::ClickUpClient;
pub use config::ClientConfig;
pub use connection::{ApiConnection, HttpApiConnection};
pub use error::{ApiError, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use pagination::{collect_all, paginate, PageRequest, PageResponse, PageStream};
pub use query::{ListStyle, QueryString};
pub use request::RequestModel;
pub use services::tasks::TaskFilterBuilder;
pub use types::{
    Folder, Priority, Space, Status, Tag, Task, TaskList, Team, TimeEntry, User, Webhook, WebhookEvent,
};
