//! SSE streaming tests — `message/stream`, `tasks/subscribe`, and the
//! REST streaming path.

mod common;

use common::{
    collect_sse_data, jsonrpc_request, message_params, start_test_server,
    start_test_server_with_store, EchoAgent, LifecycleAgent,
};
use std::sync::Arc;

use a2a_runtime::server::{InMemoryTaskStore, TaskStore};
use a2a_runtime::types::{AgentTask, StreamEvent, TaskState, TaskStatus, TaskStatusUpdateEvent};
use serde_json::json;

fn status_update(task_id: &str, state: TaskState) -> StreamEvent {
    StreamEvent::StatusUpdate(TaskStatusUpdateEvent {
        task_id: task_id.to_string(),
        context_id: "ctx-sub".to_string(),
        kind: "status-update".to_string(),
        status: TaskStatus::now(state),
        r#final: state.is_terminal(),
        metadata: None,
    })
}

#[tokio::test]
async fn message_stream_emits_jsonrpc_envelopes_in_order() {
    let (base_url, _handle) = start_test_server(Arc::new(LifecycleAgent)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/a2a", base_url))
        .json(&jsonrpc_request(
            json!("stream-1"),
            "message/stream",
            message_params(1, "run", None),
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let content_type = resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));
    let cache_control = resp
        .headers()
        .get("cache-control")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cache_control.contains("no-store"));

    let frames = collect_sse_data(resp).await;
    assert_eq!(frames.len(), 4);

    // Every frame is a JSON-RPC envelope echoing the request id.
    for frame in &frames {
        assert_eq!(frame["jsonrpc"], "2.0");
        assert_eq!(frame["id"], "stream-1");
    }

    let kinds: Vec<&str> = frames
        .iter()
        .map(|f| f["result"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["task", "status-update", "artifact-update", "status-update"]);
    assert_eq!(
        frames[3]["result"]["status"]["state"],
        "TASK_STATE_COMPLETED"
    );
    assert_eq!(frames[3]["result"]["final"], true);
}

#[tokio::test]
async fn subscribe_catches_up_then_tails_live() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (base_url, _handle, store) =
        start_test_server_with_store(Arc::new(EchoAgent), store).await;
    let client = reqwest::Client::new();

    // Seed a task at version 1: Task(Submitted), StatusUpdate(Working).
    let task_id = "t-sub";
    store
        .append(task_id, StreamEvent::Task(AgentTask::new(task_id, "ctx-sub")), None)
        .await
        .unwrap();
    store
        .append(task_id, status_update(task_id, TaskState::Working), None)
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/a2a", base_url))
        .json(&jsonrpc_request(
            json!("sub-1"),
            "tasks/subscribe",
            json!({"id": task_id}),
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Append the terminal event while the subscriber is attached.
    let store_for_append = Arc::clone(&store);
    let appender = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        store_for_append
            .append(task_id, status_update(task_id, TaskState::Completed), None)
            .await
            .unwrap();
    });

    let frames = collect_sse_data(resp).await;
    appender.await.unwrap();

    // First yield: the current Task projection. Then the live completion.
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["result"]["kind"], "task");
    assert_eq!(frames[0]["result"]["id"], task_id);
    assert_eq!(frames[0]["result"]["status"]["state"], "TASK_STATE_WORKING");
    assert_eq!(frames[1]["result"]["kind"], "status-update");
    assert_eq!(
        frames[1]["result"]["status"]["state"],
        "TASK_STATE_COMPLETED"
    );
}

#[tokio::test]
async fn subscribe_to_terminal_task_rejected() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (base_url, _handle, store) =
        start_test_server_with_store(Arc::new(EchoAgent), store).await;
    let client = reqwest::Client::new();

    let mut task = AgentTask::new("t-fin", "ctx");
    task.status = TaskStatus::now(TaskState::Completed);
    store
        .append("t-fin", StreamEvent::Task(task), None)
        .await
        .unwrap();

    let json: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&jsonrpc_request(json!(1), "tasks/subscribe", json!({"id": "t-fin"})))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["error"]["code"], -32004);
}

#[tokio::test]
async fn subscribe_unknown_task_not_found() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    let json: serde_json::Value = client
        .post(format!("{}/a2a", base_url))
        .json(&jsonrpc_request(json!(1), "tasks/resubscribe", json!({"id": "nope"})))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["error"]["code"], -32001);
}

#[tokio::test]
async fn rest_stream_emits_raw_events() {
    let (base_url, _handle) = start_test_server(Arc::new(LifecycleAgent)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/v1/message:stream", base_url))
        .json(&message_params(1, "run", None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let frames = collect_sse_data(resp).await;
    assert_eq!(frames.len(), 4);

    // Raw events: no JSON-RPC envelope, the kind field is at top level.
    assert!(frames[0].get("jsonrpc").is_none());
    assert_eq!(frames[0]["kind"], "task");
    assert_eq!(frames[3]["kind"], "status-update");
    assert_eq!(frames[3]["status"]["state"], "TASK_STATE_COMPLETED");
}
