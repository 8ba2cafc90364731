//! Shared test utilities for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use a2a_runtime::builders::AgentCardBuilder;
use a2a_runtime::error::{A2AError, A2AResult};
use a2a_runtime::server::{
    a2a_router, A2AServer, AgentContext, AgentHandler, EventQueue, InMemoryTaskStore, TaskStore,
    TaskUpdater,
};
use a2a_runtime::types::{AgentCard, Part, StreamEvent};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Replies with a single direct agent message; no task events at all.
pub struct EchoAgent;

#[async_trait]
impl AgentHandler for EchoAgent {
    async fn execute(
        &self,
        context: AgentContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        let updater = TaskUpdater::new(
            queue.clone(),
            context.task_id.clone(),
            context.context_id.clone(),
        );
        let input = context.user_input("\n");
        let reply = updater.new_agent_message(vec![Part::text(format!("Echo: {}", input))]);
        queue.enqueue(StreamEvent::Message(reply)).await
    }
}

/// Runs the full lifecycle: submit, start work, one artifact, complete.
pub struct LifecycleAgent;

#[async_trait]
impl AgentHandler for LifecycleAgent {
    async fn execute(
        &self,
        context: AgentContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        let updater = TaskUpdater::new(queue, context.task_id, context.context_id);
        updater.submit().await?;
        updater.start_work(None).await?;
        updater
            .add_artifact(vec![Part::text("done")], None, None, None, false, true)
            .await?;
        updater.complete(None).await?;
        Ok(())
    }
}

/// Emits one agent message event; useful for continuation flows where the
/// reply should land in task history.
pub struct ReplyAgent;

#[async_trait]
impl AgentHandler for ReplyAgent {
    async fn execute(
        &self,
        context: AgentContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        let updater = TaskUpdater::new(
            queue.clone(),
            context.task_id.clone(),
            context.context_id.clone(),
        );
        let reply = updater.new_agent_message(vec![Part::text("reply")]);
        queue.enqueue(StreamEvent::Message(reply)).await
    }
}

/// Always fails without emitting anything.
pub struct FailingAgent;

#[async_trait]
impl AgentHandler for FailingAgent {
    async fn execute(
        &self,
        _context: AgentContext,
        _queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        Err(A2AError::internal_error("agent intentionally failed"))
    }
}

/// Build a default agent card for testing.
pub fn test_agent_card(url: &str) -> AgentCard {
    AgentCardBuilder::new("Test Echo Agent")
        .description("An echo agent for testing")
        .version("0.1.0")
        .url(url)
        .with_streaming(true)
        .with_skill("echo", "Echo", "Echoes back messages", vec!["test".to_string()])
        .build()
        .unwrap()
}

/// Start a test server on an ephemeral port. Returns the base URL and a
/// handle to shut it down.
pub async fn start_test_server(
    handler: Arc<dyn AgentHandler>,
) -> (String, tokio::task::JoinHandle<()>) {
    let (base_url, handle, _store) =
        start_test_server_with_store(handler, Arc::new(InMemoryTaskStore::new())).await;
    (base_url, handle)
}

/// Start a test server on an ephemeral port with a caller-held store, so
/// tests can seed tasks or append events out of band.
pub async fn start_test_server_with_store(
    handler: Arc<dyn AgentHandler>,
    store: Arc<dyn TaskStore>,
) -> (String, tokio::task::JoinHandle<()>, Arc<dyn TaskStore>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    let server = Arc::new(A2AServer::new(handler, Arc::clone(&store)));
    let agent_card = test_agent_card(&format!("{}/a2a", base_url));
    let app = a2a_router(server, agent_card);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Brief wait for the server to start accepting connections.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (base_url, handle, store)
}

/// Helper to build a JSON-RPC request body.
pub fn jsonrpc_request(
    id: serde_json::Value,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Helper to build a `message/send` request body.
pub fn message_send_request(id: i64, text: &str) -> serde_json::Value {
    jsonrpc_request(
        serde_json::json!(id),
        "message/send",
        message_params(id, text, None),
    )
}

/// Helper to build `message/send`/`message/stream` params.
pub fn message_params(id: i64, text: &str, task_id: Option<&str>) -> serde_json::Value {
    let mut message = serde_json::json!({
        "messageId": format!("test-msg-{}", id),
        "role": "ROLE_USER",
        "parts": [{"kind": "text", "text": text}]
    });
    if let Some(task_id) = task_id {
        message["taskId"] = serde_json::json!(task_id);
    }
    serde_json::json!({ "message": message })
}

/// Collect every SSE `data:` payload from a streaming response until the
/// server closes the stream.
pub async fn collect_sse_data(response: reqwest::Response) -> Vec<serde_json::Value> {
    use futures::StreamExt;

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    let text = String::from_utf8(body).unwrap();

    text.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|payload| !payload.is_empty())
        .map(|payload| serde_json::from_str(payload).unwrap())
        .collect()
}
