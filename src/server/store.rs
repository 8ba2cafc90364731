//! Task store — the per-task event log, its projection, and pub/sub fan-out.
//!
//! The store is the source of truth: every task is an append-only,
//! versioned log of [`StreamEvent`]s, and the current [`AgentTask`] is a
//! pure fold over that log, maintained inline on every append so lookups
//! are O(1). Subscribers tail a task's log with catch-up-then-live
//! semantics and version-based de-duplication.
//!
//! [`InMemoryTaskStore`] is the reference implementation; production
//! deployments can implement [`TaskStore`] over a database, as long as the
//! projection is folded with [`apply_event`] so merge rules stay identical.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::stream::BoxStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::types::{
    AgentTask, EventEnvelope, ListTasksParams, ListTasksResponse, StreamEvent,
};
use crate::utils::artifact::apply_artifact_update;
use crate::utils::task::apply_history_length;

/// Default page size for task listings.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Folds one event into a task projection.
///
/// The projection is a pure function of the event prefix: replaying a log
/// through this function from `None` yields exactly the state the store
/// maintains inline.
///
/// - `Task` replaces the entire state.
/// - `Message` appends to history (ignored before the first `Task`).
/// - `StatusUpdate` moves a superseded status message into history, then
///   assigns the new status.
/// - `ArtifactUpdate` applies the shared artifact delta rules.
pub fn apply_event(state: &mut Option<AgentTask>, event: &StreamEvent) {
    match event {
        StreamEvent::Task(task) => {
            *state = Some(task.clone());
        }
        StreamEvent::Message(message) => {
            if let Some(task) = state {
                task.history.push(message.clone());
            }
        }
        StreamEvent::StatusUpdate(update) => {
            if let Some(task) = state {
                if let Some(superseded) = task.status.message.take() {
                    task.history.push(superseded);
                }
                task.status = update.status.clone();
            }
        }
        StreamEvent::ArtifactUpdate(update) => {
            if let Some(task) = state {
                apply_artifact_update(&mut task.artifacts, update);
            }
        }
    }
}

/// Interface to a task event store.
///
/// Implementations must be `Send + Sync`. All returned tasks are owned
/// copies — callers may mutate them freely without affecting stored state.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Append an event to a task's log, returning its assigned version.
    ///
    /// Versions are 0-based and contiguous. When `expected_version` is
    /// given it must equal the current log length, otherwise the append
    /// fails with `InvalidRequest` (optimistic concurrency). A successful
    /// append updates the inline projection and notifies subscribers.
    async fn append(
        &self,
        task_id: &str,
        event: StreamEvent,
        expected_version: Option<i64>,
    ) -> A2AResult<i64>;

    /// Read persisted events from `from_version` onward.
    ///
    /// Returns a snapshot of events already stored at the time of the
    /// call; an unknown task yields an empty sequence.
    async fn read(&self, task_id: &str, from_version: i64) -> A2AResult<Vec<EventEnvelope>>;

    /// Whether any events exist for the task.
    async fn exists(&self, task_id: &str) -> A2AResult<bool>;

    /// The highest version stored for the task, `-1` when absent.
    async fn latest_version(&self, task_id: &str) -> A2AResult<i64>;

    /// The current projection for the task, as an owned copy.
    async fn get_task(&self, task_id: &str) -> A2AResult<Option<AgentTask>>;

    /// Atomic snapshot of the projection together with its version.
    async fn get_task_with_version(&self, task_id: &str)
        -> A2AResult<(Option<AgentTask>, i64)>;

    /// List task projections with filtering, sorting, and pagination.
    async fn list_tasks(&self, params: &ListTasksParams) -> A2AResult<ListTasksResponse>;

    /// Tail a task's event log from `after_version` (exclusive).
    ///
    /// Catch-up-then-live: persisted events are replayed first, then the
    /// stream switches to live delivery without gaps or duplicates. The
    /// stream ends after a terminal event, or when dropped by the caller.
    async fn subscribe(
        &self,
        task_id: &str,
        after_version: i64,
    ) -> A2AResult<BoxStream<'static, EventEnvelope>>;
}

/// One task's slice of the store.
///
/// The mutex serializes the version-assignment / append / projection-update
/// critical section; reads take it briefly to snapshot.
#[derive(Default)]
struct TaskPartition {
    events: Vec<EventEnvelope>,
    projection: Option<AgentTask>,
    subscribers: Vec<mpsc::UnboundedSender<EventEnvelope>>,
}

/// In-memory event store backed by a concurrent map of task partitions.
///
/// Suitable for development, testing, and single-instance deployments. All
/// data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryTaskStore {
    partitions: DashMap<String, Arc<Mutex<TaskPartition>>>,
}

impl InMemoryTaskStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, task_id: &str) -> Option<Arc<Mutex<TaskPartition>>> {
        self.partitions.get(task_id).map(|entry| Arc::clone(&entry))
    }

    fn partition_or_create(&self, task_id: &str) -> Arc<Mutex<TaskPartition>> {
        let entry = self
            .partitions
            .entry(task_id.to_string())
            .or_default();
        Arc::clone(entry.value())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn append(
        &self,
        task_id: &str,
        event: StreamEvent,
        expected_version: Option<i64>,
    ) -> A2AResult<i64> {
        let partition = self.partition_or_create(task_id);

        let (envelope, receivers) = {
            let mut part = partition.lock().await;
            let current = part.events.len() as i64;

            if let Some(expected) = expected_version {
                if expected != current {
                    debug!(
                        task_id = %task_id,
                        expected = expected,
                        actual = current,
                        "Version conflict on append"
                    );
                    return Err(A2AError::invalid_request(format!(
                        "version conflict for task {}: expected {}, log is at {}",
                        task_id, expected, current
                    )));
                }
            }

            let envelope = EventEnvelope {
                version: current,
                event,
            };
            apply_event(&mut part.projection, &envelope.event);
            part.events.push(envelope.clone());

            // Snapshot live subscribers under the lock; deliver outside it.
            part.subscribers.retain(|tx| !tx.is_closed());
            let receivers = part.subscribers.clone();
            if envelope.event.is_terminal() {
                // Dropping the stored senders closes every subscriber queue
                // once the terminal envelope below has been delivered.
                part.subscribers.clear();
            }
            (envelope, receivers)
        };

        debug!(
            task_id = %task_id,
            version = envelope.version,
            kind = envelope.event.kind(),
            subscriber_count = receivers.len(),
            "Event appended"
        );

        for tx in receivers {
            // Non-blocking: queues are unbounded and a closed receiver just
            // means the subscriber went away.
            let _ = tx.send(envelope.clone());
        }

        Ok(envelope.version)
    }

    async fn read(&self, task_id: &str, from_version: i64) -> A2AResult<Vec<EventEnvelope>> {
        let Some(partition) = self.partition(task_id) else {
            return Ok(Vec::new());
        };
        let part = partition.lock().await;
        let from = from_version.max(0) as usize;
        Ok(part.events.get(from..).map(<[_]>::to_vec).unwrap_or_default())
    }

    async fn exists(&self, task_id: &str) -> A2AResult<bool> {
        match self.partition(task_id) {
            Some(partition) => Ok(!partition.lock().await.events.is_empty()),
            None => Ok(false),
        }
    }

    async fn latest_version(&self, task_id: &str) -> A2AResult<i64> {
        match self.partition(task_id) {
            Some(partition) => Ok(partition.lock().await.events.len() as i64 - 1),
            None => Ok(-1),
        }
    }

    async fn get_task(&self, task_id: &str) -> A2AResult<Option<AgentTask>> {
        match self.partition(task_id) {
            Some(partition) => Ok(partition.lock().await.projection.clone()),
            None => Ok(None),
        }
    }

    async fn get_task_with_version(
        &self,
        task_id: &str,
    ) -> A2AResult<(Option<AgentTask>, i64)> {
        match self.partition(task_id) {
            Some(partition) => {
                let part = partition.lock().await;
                Ok((part.projection.clone(), part.events.len() as i64 - 1))
            }
            None => Ok((None, -1)),
        }
    }

    async fn list_tasks(&self, params: &ListTasksParams) -> A2AResult<ListTasksResponse> {
        let page_size = match params.page_size {
            Some(size) if size < 0 => {
                return Err(A2AError::invalid_params(format!(
                    "pageSize must be non-negative, got {}",
                    size
                )))
            }
            Some(size) => size as usize,
            None => DEFAULT_PAGE_SIZE,
        };

        let offset = match params.page_token.as_deref() {
            None | Some("") => 0usize,
            Some(token) => token.parse::<usize>().map_err(|_| {
                A2AError::invalid_params(format!("invalid page token '{}'", token))
            })?,
        };

        let after = params
            .status_timestamp_after
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| {
                        A2AError::invalid_params(format!(
                            "invalid statusTimestampAfter '{}'",
                            raw
                        ))
                    })
            })
            .transpose()?;

        if let Some(length) = params.history_length {
            if length < 0 {
                return Err(A2AError::invalid_params(format!(
                    "historyLength must be non-negative, got {}",
                    length
                )));
            }
        }

        // Snapshot partition handles first so no map shard lock is held
        // across an await.
        let handles: Vec<Arc<Mutex<TaskPartition>>> = self
            .partitions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut tasks = Vec::new();
        for handle in handles {
            let part = handle.lock().await;
            if let Some(task) = &part.projection {
                tasks.push(task.clone());
            }
        }

        tasks.retain(|task| {
            if let Some(ref context_id) = params.context_id {
                if task.context_id != *context_id {
                    return false;
                }
            }
            if let Some(status) = params.status {
                if task.status.state != status {
                    return false;
                }
            }
            if let Some(after) = after {
                match status_timestamp(task) {
                    Some(ts) if ts > after => {}
                    _ => return false,
                }
            }
            true
        });

        // Newest status first; tasks without a timestamp sort last.
        tasks.sort_by(|a, b| {
            match (status_timestamp(a), status_timestamp(b)) {
                (Some(ta), Some(tb)) => tb.cmp(&ta),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.id.cmp(&b.id),
            }
        });

        let total_size = tasks.len();
        let end = (offset + page_size).min(total_size);
        let mut page: Vec<AgentTask> = if offset < total_size {
            tasks[offset..end].to_vec()
        } else {
            Vec::new()
        };

        let include_artifacts = params.include_artifacts.unwrap_or(false);
        for task in &mut page {
            apply_history_length(task, params.history_length)?;
            if !include_artifacts {
                task.artifacts.clear();
            }
        }

        let next_page_token = if end < total_size {
            end.to_string()
        } else {
            String::new()
        };

        debug!(
            count = page.len(),
            total = total_size,
            has_more = !next_page_token.is_empty(),
            "Listed tasks"
        );

        Ok(ListTasksResponse {
            page_size: page.len() as i32,
            tasks: page,
            next_page_token,
            total_size: total_size as i32,
        })
    }

    async fn subscribe(
        &self,
        task_id: &str,
        after_version: i64,
    ) -> A2AResult<BoxStream<'static, EventEnvelope>> {
        let Some(partition) = self.partition(task_id) else {
            return Err(A2AError::task_not_found(task_id));
        };

        // Register the live queue and snapshot the catch-up range in one
        // critical section, so nothing appended afterwards can be missed.
        // Anything delivered both ways is filtered below by version.
        let (receiver, catchup) = {
            let mut part = partition.lock().await;
            let (tx, rx) = mpsc::unbounded_channel();
            part.subscribers.push(tx);
            let from = (after_version + 1).max(0) as usize;
            let catchup = part.events.get(from..).map(<[_]>::to_vec).unwrap_or_default();
            (rx, catchup)
        };

        let task_id = task_id.to_string();
        let stream = async_stream::stream! {
            let mut rx = receiver;
            let mut cursor = after_version;

            for envelope in catchup {
                cursor = envelope.version;
                let terminal = envelope.event.is_terminal();
                yield envelope;
                if terminal {
                    debug!(task_id = %task_id, "Subscription ended during catch-up");
                    return;
                }
            }

            while let Some(envelope) = rx.recv().await {
                if envelope.version <= cursor {
                    // Already delivered during catch-up.
                    continue;
                }
                if envelope.version > cursor + 1 {
                    warn!(
                        task_id = %task_id,
                        cursor = cursor,
                        version = envelope.version,
                        "Gap in subscriber delivery"
                    );
                }
                cursor = envelope.version;
                let terminal = envelope.event.is_terminal();
                yield envelope;
                if terminal {
                    break;
                }
            }
            debug!(task_id = %task_id, cursor = cursor, "Subscription ended");
        };

        Ok(Box::pin(stream))
    }
}

fn status_timestamp(task: &AgentTask) -> Option<DateTime<Utc>> {
    task.status
        .timestamp
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
