//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port with a small page
//! size, then drives the public client over real HTTP through
//! `ReqwestTransport`. Validates that request building, status mapping,
//! response parsing and pagination agree with an actual server.

use futures::StreamExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use clickup_core::services::webhooks::{UpdateWebhookRequest, WebhookStatus};
use clickup_core::{ApiError, ClickUpClient, ClientConfig, Priority, TransportError, WebhookEvent};

const PAGE_SIZE: usize = 2;

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run_with_page_size(listener, PAGE_SIZE));
    format!("http://{addr}")
}

async fn client() -> ClickUpClient {
    let base_url = start_server().await;
    ClickUpClient::new(&ClientConfig::new("pk_test").with_base_url(&base_url)).unwrap()
}

async fn seed(client: &ClickUpClient, list_id: &str, names: &[&str]) {
    for name in names {
        client.tasks().new_task(list_id, *name).create().await.unwrap();
    }
}

#[tokio::test]
async fn task_lifecycle() {
    let client = client().await;
    let tasks = client.tasks();

    let created = tasks
        .new_task("l1", "Write docs")
        .with_description("for the release")
        .with_priority(Priority::High)
        .with_tag("docs")
        .create()
        .await
        .unwrap();
    assert_eq!(created.name, "Write docs");
    assert_eq!(created.priority.as_ref().and_then(|p| p.priority.as_deref()), Some("high"));
    assert_eq!(created.tags[0].name, "docs");

    let fetched = tasks.task(&created.id).get().await.unwrap();
    assert_eq!(fetched, created);

    let updated = tasks.edit_task(&created.id).with_status("done").update().await.unwrap();
    assert_eq!(updated.status.as_ref().map(|s| s.status.as_str()), Some("done"));
    assert_eq!(updated.description.as_deref(), Some("for the release"));

    tasks.delete_task(&created.id).await.unwrap();
    let err = tasks.task(&created.id).get().await.unwrap_err();
    assert!(err.is_not_found(), "expected not found, got {err:?}");
}

#[tokio::test]
async fn list_tasks_stream_across_flagged_pages() {
    let client = client().await;
    seed(&client, "l1", &["a", "b", "c", "d", "e"]).await;
    seed(&client, "l2", &["other"]).await;

    let names: Vec<String> = client
        .tasks()
        .list_tasks("l1")
        .collect()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn exact_page_multiple_stops_on_flag() {
    let client = client().await;
    seed(&client, "l1", &["a", "b", "c", "d"]).await;

    let tasks = client.tasks().list_tasks("l1").collect().await.unwrap();
    assert_eq!(tasks.len(), 4);
}

#[tokio::test]
async fn single_page_fetch() {
    let client = client().await;
    seed(&client, "l1", &["a", "b", "c"]).await;

    let second = client.tasks().list_tasks("l1").page(1).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].name, "c");
}

#[tokio::test]
async fn team_tasks_stop_on_empty_page() {
    let client = client().await;
    seed(&client, "l1", &["a", "b"]).await;
    seed(&client, "l2", &["c"]).await;

    let tasks = client.tasks().team_tasks("1").collect().await.unwrap();
    assert_eq!(tasks.len(), 3);
}

#[tokio::test]
async fn empty_list_streams_nothing() {
    let client = client().await;
    let tasks = client.tasks().list_tasks("empty").collect().await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn cancelling_mid_stream_ends_with_cancelled() {
    let client = client().await;
    seed(&client, "l1", &["a", "b", "c", "d"]).await;

    let token = CancellationToken::new();
    let scoped = client.scoped(token.clone());
    let mut stream = scoped.tasks().list_tasks("l1").stream().unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap().name, "a");
    assert_eq!(stream.next().await.unwrap().unwrap().name, "b");
    token.cancel();
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert!(stream.next().await.is_none());

    // The unscoped client is unaffected.
    assert_eq!(client.tasks().list_tasks("l1").collect().await.unwrap().len(), 4);
}

#[tokio::test]
async fn missing_token_maps_to_status_error() {
    let base_url = start_server().await;
    let client = ClickUpClient::new(&ClientConfig::new("").with_base_url(&base_url)).unwrap();

    let err = client.teams().get_authorized_teams().await.unwrap_err();
    match err {
        ApiError::Transport(TransportError::Status { status, code, message }) => {
            assert_eq!(status, 401);
            assert_eq!(code.as_deref(), Some("OAUTH_025"));
            assert_eq!(message, "Token invalid");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let client = client().await;
    let created = client.tasks().new_task("l1", "Triage").with_status("open").create().await.unwrap();

    let updated = client
        .tasks()
        .edit_task(&created.id)
        .with_priority(Priority::Low)
        .update()
        .await
        .unwrap();
    assert_eq!(updated.name, "Triage");
    assert_eq!(updated.status.map(|s| s.status).as_deref(), Some("open"));
    assert_eq!(updated.priority.and_then(|p| p.priority).as_deref(), Some("low"));
}

#[tokio::test]
async fn authorized_teams() {
    let client = client().await;
    let teams = client.teams().get_authorized_teams().await.unwrap();
    assert_eq!(teams[0].name, "Mock Workspace");
    assert_eq!(teams[0].members[0].user.username.as_deref(), Some("mock"));
}

#[tokio::test]
async fn webhook_lifecycle() {
    let client = client().await;
    let hooks = client.webhooks();

    let created = hooks
        .new_webhook("1")
        .with_endpoint("https://example.com/hook")
        .with_event(WebhookEvent::TaskCreated)
        .in_list("l1")
        .create()
        .await
        .unwrap();
    assert_eq!(created.list_id.as_deref(), Some("l1"));
    assert_eq!(created.events, vec![WebhookEvent::TaskCreated]);

    let updated = hooks
        .update_webhook(&created.id, UpdateWebhookRequest::new().with_status(WebhookStatus::Suspended))
        .await
        .unwrap();
    assert_eq!(updated.health.and_then(|h| h.status).as_deref(), Some("suspended"));

    assert_eq!(hooks.get_webhooks("1").await.unwrap().len(), 1);
    hooks.delete_webhook(&created.id).await.unwrap();
    assert!(hooks.get_webhooks("1").await.unwrap().is_empty());

    let err = hooks.delete_webhook(&created.id).await.unwrap_err();
    assert!(err.is_not_found());
}
