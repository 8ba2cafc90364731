//! REST surface tests — `/v1/…` routes and their HTTP status mapping.

mod common;

use common::{message_params, start_test_server, start_test_server_with_store, LifecycleAgent, EchoAgent};
use std::sync::Arc;

use a2a_runtime::server::{InMemoryTaskStore, TaskStore};
use a2a_runtime::types::{AgentTask, StreamEvent, TaskState, TaskStatus};

#[tokio::test]
async fn card_served_at_v1_card() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let resp = reqwest::get(format!("{}/v1/card", base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let card: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(card["name"], "Test Echo Agent");
}

#[tokio::test]
async fn message_send_roundtrip() {
    let (base_url, _handle) = start_test_server(Arc::new(LifecycleAgent)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/v1/message:send", base_url))
        .json(&message_params(1, "run", None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let task: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(task["kind"], "task");
    assert_eq!(task["status"]["state"], "TASK_STATE_COMPLETED");
}

#[tokio::test]
async fn wrong_content_type_is_422() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/v1/message:send", base_url))
        .header("content-type", "text/plain")
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    let error: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(error["code"], -32005);
}

#[tokio::test]
async fn get_task_and_not_found() {
    let (base_url, _handle) = start_test_server(Arc::new(LifecycleAgent)).await;
    let client = reqwest::Client::new();

    let task: serde_json::Value = client
        .post(format!("{}/v1/message:send", base_url))
        .json(&message_params(1, "run", None))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let task_id = task["id"].as_str().unwrap();

    let resp = client
        .get(format!("{}/v1/tasks/{}", base_url, task_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(fetched["id"], task_id);

    let resp = client
        .get(format!("{}/v1/tasks/missing", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn get_task_history_length_query() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (base_url, _handle, store) =
        start_test_server_with_store(Arc::new(EchoAgent), store).await;
    let client = reqwest::Client::new();

    let mut task = AgentTask::new("t-hist", "ctx");
    task.status = TaskStatus::now(TaskState::Working);
    for i in 0..3 {
        task.history
            .push(a2a_runtime::types::Message::user(format!("m{}", i), "x"));
    }
    store
        .append("t-hist", StreamEvent::Task(task), None)
        .await
        .unwrap();

    let fetched: serde_json::Value = client
        .get(format!("{}/v1/tasks/t-hist?historyLength=1", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["history"].as_array().unwrap().len(), 1);
    assert_eq!(fetched["history"][0]["messageId"], "m2");

    let resp = client
        .get(format!("{}/v1/tasks/t-hist?historyLength=-2", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn cancel_custom_verb() {
    let store = Arc::new(InMemoryTaskStore::new());
    let (base_url, _handle, store) =
        start_test_server_with_store(Arc::new(EchoAgent), store).await;
    let client = reqwest::Client::new();

    let mut task = AgentTask::new("t-c", "ctx");
    task.status = TaskStatus::now(TaskState::Working);
    store
        .append("t-c", StreamEvent::Task(task), None)
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/v1/tasks/t-c:cancel", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let canceled: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(canceled["status"]["state"], "TASK_STATE_CANCELED");

    // Canceling again: terminal task → 400.
    let resp = client
        .post(format!("{}/v1/tasks/t-c:cancel", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown verb suffix → 404.
    let resp = client
        .post(format!("{}/v1/tasks/t-c:pause", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn list_tasks_with_query_params() {
    let (base_url, _handle) = start_test_server(Arc::new(LifecycleAgent)).await;
    let client = reqwest::Client::new();

    for i in 0..3 {
        client
            .post(format!("{}/v1/message:send", base_url))
            .json(&message_params(i, "run", None))
            .send()
            .await
            .unwrap();
    }

    let page: serde_json::Value = client
        .get(format!(
            "{}/v1/tasks?pageSize=2&status=TASK_STATE_COMPLETED",
            base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["totalSize"], 3);
    assert_eq!(page["tasks"].as_array().unwrap().len(), 2);

    let resp = client
        .get(format!("{}/v1/tasks?pageToken=banana", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{}/v1/tasks?status=TASK_STATE_NAPPING", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn push_notification_configs_unsupported() {
    let (base_url, _handle) = start_test_server(Arc::new(EchoAgent)).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/v1/tasks/t1/pushNotificationConfigs", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let error: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(error["code"], -32003);

    let resp = client
        .post(format!("{}/v1/tasks/t1/pushNotificationConfigs", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let error: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(error["code"], -32003);

    let resp = client
        .delete(format!(
            "{}/v1/tasks/t1/pushNotificationConfigs/cfg-1",
            base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
