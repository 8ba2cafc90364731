//! Event-log properties under concurrency: contiguous versions, replay
//! equivalence, and exactly-once subscriber delivery.

mod common;

use std::sync::Arc;

use a2a_runtime::server::{apply_event, InMemoryTaskStore, TaskStore};
use a2a_runtime::types::{
    AgentTask, Artifact, Message, Part, StreamEvent, TaskArtifactUpdateEvent, TaskState,
    TaskStatus, TaskStatusUpdateEvent,
};
use futures::StreamExt;

fn working_update(task_id: &str, note: &str) -> StreamEvent {
    StreamEvent::StatusUpdate(TaskStatusUpdateEvent {
        task_id: task_id.to_string(),
        context_id: "c1".to_string(),
        kind: "status-update".to_string(),
        status: TaskStatus {
            state: TaskState::Working,
            message: Some(Message::agent(format!("m-{}", note), note)),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        },
        r#final: false,
        metadata: None,
    })
}

fn artifact_chunk(task_id: &str, artifact_id: &str, text: &str, append: bool) -> StreamEvent {
    StreamEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
        task_id: task_id.to_string(),
        context_id: "c1".to_string(),
        kind: "artifact-update".to_string(),
        artifact: Artifact {
            artifact_id: artifact_id.to_string(),
            name: None,
            description: None,
            parts: vec![Part::text(text)],
            metadata: None,
            extensions: None,
        },
        append,
        last_chunk: false,
        metadata: None,
    })
}

fn completed_update(task_id: &str) -> StreamEvent {
    StreamEvent::StatusUpdate(TaskStatusUpdateEvent {
        task_id: task_id.to_string(),
        context_id: "c1".to_string(),
        kind: "status-update".to_string(),
        status: TaskStatus::now(TaskState::Completed),
        r#final: true,
        metadata: None,
    })
}

#[tokio::test]
async fn concurrent_appenders_produce_contiguous_versions() {
    let store = Arc::new(InMemoryTaskStore::new());
    store
        .append("t1", StreamEvent::Task(AgentTask::new("t1", "c1")), None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let mut versions = Vec::new();
            for j in 0..10 {
                let v = store
                    .append("t1", working_update("t1", &format!("{}-{}", i, j)), None)
                    .await
                    .unwrap();
                versions.push(v);
            }
            versions
        }));
    }

    let mut all_versions = vec![0i64];
    for handle in handles {
        all_versions.extend(handle.await.unwrap());
    }
    all_versions.sort_unstable();

    let expected: Vec<i64> = (0..81).collect();
    assert_eq!(all_versions, expected);
    assert_eq!(store.latest_version("t1").await.unwrap(), 80);
}

#[tokio::test]
async fn replay_equals_inline_projection_for_mixed_sequence() {
    let store = InMemoryTaskStore::new();
    let task_id = "t-mixed";

    store
        .append(task_id, StreamEvent::Task(AgentTask::new(task_id, "c1")), None)
        .await
        .unwrap();
    store
        .append(task_id, working_update(task_id, "step 1"), None)
        .await
        .unwrap();
    store
        .append(task_id, artifact_chunk(task_id, "a1", "chunk-1", false), None)
        .await
        .unwrap();
    store
        .append(task_id, artifact_chunk(task_id, "a1", "chunk-2", true), None)
        .await
        .unwrap();
    store
        .append(
            task_id,
            StreamEvent::Message(Message::user("m-u", "keep going")),
            None,
        )
        .await
        .unwrap();
    store
        .append(task_id, completed_update(task_id), None)
        .await
        .unwrap();

    let mut replayed = None;
    for envelope in store.read(task_id, 0).await.unwrap() {
        apply_event(&mut replayed, &envelope.event);
    }
    let replayed = replayed.unwrap();
    let inline = store.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(replayed, inline);

    // Projecting a prefix twice yields equal results.
    let mut first = None;
    let mut second = None;
    let prefix = store.read(task_id, 0).await.unwrap();
    for envelope in &prefix[..4] {
        apply_event(&mut first, &envelope.event);
        apply_event(&mut second, &envelope.event);
    }
    assert_eq!(first, second);

    // Artifact chunks accumulated in arrival order.
    assert_eq!(inline.artifacts.len(), 1);
    assert_eq!(inline.artifacts[0].parts.len(), 2);
    // Superseded status messages landed in history ahead of the user message.
    assert_eq!(inline.history.len(), 2);
    assert_eq!(inline.status.state, TaskState::Completed);
}

#[tokio::test]
async fn every_subscriber_sees_each_version_exactly_once() {
    let store = Arc::new(InMemoryTaskStore::new());
    let task_id = "t-fan";
    store
        .append(task_id, StreamEvent::Task(AgentTask::new(task_id, "c1")), None)
        .await
        .unwrap();

    // Attach several subscribers at different cursors while appends race.
    let mut subscribers = Vec::new();
    for _ in 0..4 {
        let stream = store.subscribe(task_id, -1).await.unwrap();
        subscribers.push(tokio::spawn(async move {
            stream.map(|envelope| envelope.version).collect::<Vec<i64>>().await
        }));
    }

    let appender = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..20 {
                store
                    .append(task_id, working_update(task_id, &format!("s{}", i)), None)
                    .await
                    .unwrap();
            }
            store.append(task_id, completed_update(task_id), None).await.unwrap();
        })
    };

    appender.await.unwrap();
    let expected: Vec<i64> = (0..22).collect();
    for subscriber in subscribers {
        let versions = subscriber.await.unwrap();
        assert_eq!(versions, expected);
    }
}

#[tokio::test]
async fn late_subscriber_terminates_after_catchup() {
    let store = InMemoryTaskStore::new();
    let task_id = "t-late";
    store
        .append(task_id, StreamEvent::Task(AgentTask::new(task_id, "c1")), None)
        .await
        .unwrap();
    store
        .append(task_id, completed_update(task_id), None)
        .await
        .unwrap();

    // Subscribing after completion replays the log and ends immediately.
    let versions: Vec<i64> = store
        .subscribe(task_id, -1)
        .await
        .unwrap()
        .map(|envelope| envelope.version)
        .collect()
        .await;
    assert_eq!(versions, vec![0, 1]);
}

#[tokio::test]
async fn dropped_subscriber_does_not_block_appends() {
    let store = InMemoryTaskStore::new();
    let task_id = "t-drop";
    store
        .append(task_id, StreamEvent::Task(AgentTask::new(task_id, "c1")), None)
        .await
        .unwrap();

    let stream = store.subscribe(task_id, -1).await.unwrap();
    drop(stream);

    for i in 0..50 {
        store
            .append(task_id, working_update(task_id, &format!("s{}", i)), None)
            .await
            .unwrap();
    }
    assert_eq!(store.latest_version(task_id).await.unwrap(), 50);
}
