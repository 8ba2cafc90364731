//! The request-lifecycle orchestrator.
//!
//! [`A2AServer`] binds each incoming message to a task, enforces the
//! state-machine guards, spawns the handler worker, persists the events it
//! emits, and materializes either a single response or a lazy event
//! stream. Both protocol surfaces (JSON-RPC and REST) dispatch into this
//! type.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::error::{A2AError, A2AResult};
use crate::metrics::metrics;
use crate::types::{
    AgentCard, AgentTask, CancelTaskParams, GetTaskParams, ListTasksParams, ListTasksResponse,
    Message, Role, SendMessageParams, SendMessageResponse, StreamEvent, SubscribeToTaskParams,
};
use crate::utils::task::{apply_history_length, last_history_message};

use super::event_queue::{EventQueue, EventReceiver};
use super::handler::{AgentContext, AgentHandler};
use super::store::{apply_event, TaskStore};

/// The A2A request orchestrator.
///
/// Owns the handler, the task store, and the runtime configuration. One
/// instance serves all tasks; per-request state lives in the worker it
/// spawns for each send.
pub struct A2AServer {
    handler: Arc<dyn AgentHandler>,
    store: Arc<dyn TaskStore>,
    config: RuntimeConfig,
}

/// A message bound to its task, ready for handler invocation.
struct ResolvedContext {
    message: Message,
    task: Option<AgentTask>,
    task_id: String,
    context_id: String,
}

enum ResponseKind {
    Task,
    Message(Message),
}

impl A2AServer {
    /// Create an orchestrator with default configuration.
    pub fn new(handler: Arc<dyn AgentHandler>, store: Arc<dyn TaskStore>) -> Self {
        Self::with_config(handler, store, RuntimeConfig::default())
    }

    /// Create an orchestrator with explicit configuration.
    pub fn with_config(
        handler: Arc<dyn AgentHandler>,
        store: Arc<dyn TaskStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            handler,
            store,
            config,
        }
    }

    /// The task store backing this orchestrator.
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// The runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// Handle `message/send` — run the handler to completion and return a
    /// single task or message response.
    pub async fn send_message(
        &self,
        params: SendMessageParams,
        cancel: CancellationToken,
    ) -> A2AResult<SendMessageResponse> {
        let history_length = params.configuration.as_ref().and_then(|c| c.history_length);
        if let Some(length) = history_length {
            if length < 0 {
                return Err(A2AError::invalid_params(format!(
                    "historyLength must be non-negative, got {}",
                    length
                )));
            }
        }

        let resolved = self.resolve_context(params.message).await?;
        let task_id = resolved.task_id.clone();

        self.append_continuation_history(&resolved).await?;

        let context = AgentContext {
            message: resolved.message,
            task: resolved.task.clone(),
            task_id: task_id.clone(),
            context_id: resolved.context_id,
            is_streaming: false,
            metadata: params.metadata,
        };
        let (mut rx, worker) = self.spawn_worker(context, cancel.child_token());

        // Drain the handler queue, persisting as we go. The first Task or
        // Message event fixes the response payload kind.
        let mut first: Option<ResponseKind> = None;
        let mut local = resolved.task;
        let mut drained = 0u64;
        while let Some(event) = rx.recv().await {
            drained += 1;
            if self.config.auto_persist_events {
                self.store.append(&task_id, event.clone(), None).await?;
            }
            if first.is_none() {
                match &event {
                    StreamEvent::Task(_) => first = Some(ResponseKind::Task),
                    StreamEvent::Message(message) => {
                        first = Some(ResponseKind::Message(message.clone()))
                    }
                    _ => {}
                }
            }
            apply_event(&mut local, &event);
        }

        Self::join_worker(worker).await?;

        if drained == 0 {
            return Err(A2AError::invalid_agent_response(
                "handler produced no events",
            ));
        }

        match first {
            Some(ResponseKind::Message(message)) => Ok(SendMessageResponse::Message(message)),
            _ => {
                // Re-fetch so the synchronous response reflects every event
                // that followed the initial Task snapshot.
                let task = if self.config.auto_persist_events {
                    self.store.get_task(&task_id).await?
                } else {
                    local
                };
                let mut task = task.ok_or_else(|| {
                    A2AError::invalid_agent_response("handler produced no task or message")
                })?;
                apply_history_length(&mut task, history_length)?;
                Ok(SendMessageResponse::Task(task))
            }
        }
    }

    /// Handle `message/stream` — run the handler and yield its events as
    /// they arrive, persisting each immediately before it is yielded.
    ///
    /// Context resolution and guard failures surface as an error from this
    /// method, before any stream is produced; handler failures surface as
    /// a final `Err` item after drainage.
    pub async fn send_streaming_message(
        &self,
        params: SendMessageParams,
        cancel: CancellationToken,
    ) -> A2AResult<BoxStream<'static, A2AResult<StreamEvent>>> {
        let resolved = self.resolve_context(params.message).await?;
        let task_id = resolved.task_id.clone();

        self.append_continuation_history(&resolved).await?;

        let context = AgentContext {
            message: resolved.message,
            task: resolved.task,
            task_id: task_id.clone(),
            context_id: resolved.context_id,
            is_streaming: true,
            metadata: params.metadata,
        };
        let worker_cancel = cancel.child_token();
        let (mut rx, worker) = self.spawn_worker(context, worker_cancel.clone());

        let store = Arc::clone(&self.store);
        let auto_persist = self.config.auto_persist_events;

        let stream = async_stream::stream! {
            // Dropping the stream (client disconnect) cancels the worker.
            let _cancel_guard = worker_cancel.drop_guard();

            let mut count = 0u64;
            while let Some(event) = rx.recv().await {
                count += 1;
                if auto_persist {
                    if let Err(err) = store.append(&task_id, event.clone(), None).await {
                        error!(task_id = %task_id, error = %err, "Failed to persist stream event");
                        yield Err(err);
                        return;
                    }
                }
                yield Ok(event);
            }
            metrics().stream_events.observe(count as f64);

            match Self::join_worker(worker).await {
                Ok(()) if count == 0 => {
                    yield Err(A2AError::invalid_agent_response("handler produced no events"));
                }
                Ok(()) => {}
                Err(err) => yield Err(err),
            }
        };
        Ok(Box::pin(stream))
    }

    /// Handle `tasks/get`.
    pub async fn get_task(&self, params: GetTaskParams) -> A2AResult<AgentTask> {
        let mut task = self
            .store
            .get_task(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;
        apply_history_length(&mut task, params.history_length)?;
        Ok(task)
    }

    /// Handle `tasks/list`.
    pub async fn list_tasks(&self, params: ListTasksParams) -> A2AResult<ListTasksResponse> {
        self.store.list_tasks(&params).await
    }

    /// Handle `tasks/cancel` — invoke the handler's cancel path and return
    /// the post-drain projection.
    pub async fn cancel_task(
        &self,
        params: CancelTaskParams,
        cancel: CancellationToken,
    ) -> A2AResult<AgentTask> {
        let task = self
            .store
            .get_task(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;

        if task.status.state.is_terminal() {
            return Err(A2AError::task_not_cancelable(format!(
                "task {} is already {}",
                params.id, task.status.state
            )));
        }

        // The cancel context replays the last user-visible message, or an
        // empty placeholder for tasks with no history.
        let message = last_history_message(&task).cloned().unwrap_or_else(|| Message {
            message_id: Uuid::new_v4().to_string(),
            role: Role::User,
            kind: "message".to_string(),
            parts: Vec::new(),
            task_id: Some(task.id.clone()),
            context_id: Some(task.context_id.clone()),
            reference_task_ids: None,
            extensions: None,
            metadata: None,
        });

        let task_id = task.id.clone();
        let context = AgentContext {
            message,
            task: Some(task.clone()),
            task_id: task_id.clone(),
            context_id: task.context_id.clone(),
            is_streaming: false,
            metadata: params.metadata,
        };

        let (queue, mut rx) = EventQueue::bounded(self.config.handler_queue_capacity);
        let handler = Arc::clone(&self.handler);
        let worker_queue = queue.clone();
        let worker_cancel = cancel.child_token();
        let worker: JoinHandle<A2AResult<()>> = tokio::spawn(async move {
            let result = handler.cancel(context, worker_queue.clone(), worker_cancel).await;
            worker_queue.close();
            result
        });

        let mut local = Some(task);
        while let Some(event) = rx.recv().await {
            if self.config.auto_persist_events {
                self.store.append(&task_id, event.clone(), None).await?;
            }
            apply_event(&mut local, &event);
        }
        Self::join_worker(worker).await?;

        info!(task_id = %task_id, "Task canceled");

        let task = if self.config.auto_persist_events {
            self.store.get_task(&task_id).await?
        } else {
            local
        };
        task.ok_or_else(|| A2AError::task_not_found(task_id))
    }

    /// Handle `tasks/subscribe` / `tasks/resubscribe` — yield the current
    /// task snapshot first, then tail the event log from that version.
    pub async fn subscribe_to_task(
        &self,
        params: SubscribeToTaskParams,
    ) -> A2AResult<BoxStream<'static, A2AResult<StreamEvent>>> {
        let (task, version) = self.store.get_task_with_version(&params.id).await?;
        let task = task.ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;

        if task.status.state.is_terminal() {
            return Err(A2AError::unsupported_operation(format!(
                "task {} is {}; cannot subscribe to a finished task",
                params.id, task.status.state
            )));
        }

        let subscription = self.store.subscribe(&params.id, version).await?;
        debug!(task_id = %params.id, from_version = version, "Subscriber attached");

        let stream = async_stream::stream! {
            yield Ok(StreamEvent::Task(task));
            let mut subscription = subscription;
            while let Some(envelope) = subscription.next().await {
                yield Ok(envelope.event);
            }
        };
        Ok(Box::pin(stream))
    }

    /// Handle `agent/getAuthenticatedExtendedCard`.
    pub fn extended_agent_card(&self) -> A2AResult<AgentCard> {
        self.config
            .extended_agent_card
            .clone()
            .ok_or_else(|| {
                A2AError::extended_agent_card_not_configured(
                    "no extended agent card has been configured",
                )
            })
    }

    /// Handle `tasks/pushNotificationConfig/set`. Unsupported by default.
    pub fn set_push_notification_config(&self) -> A2AResult<serde_json::Value> {
        Err(A2AError::push_notification_not_supported(
            "push notifications are not supported by this agent",
        ))
    }

    /// Handle `tasks/pushNotificationConfig/get`. Unsupported by default.
    pub fn get_push_notification_config(&self) -> A2AResult<serde_json::Value> {
        Err(A2AError::push_notification_not_supported(
            "push notifications are not supported by this agent",
        ))
    }

    /// Handle deletion of a push notification config. Unsupported by
    /// default.
    pub fn delete_push_notification_config(&self) -> A2AResult<()> {
        Err(A2AError::push_notification_not_supported(
            "push notifications are not supported by this agent",
        ))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Bind a message to its task: look up continuations (inheriting the
    /// stored context id when the client omitted one) or mint fresh ids.
    /// Terminal tasks reject further sends.
    async fn resolve_context(&self, mut message: Message) -> A2AResult<ResolvedContext> {
        if message.parts.is_empty() {
            return Err(A2AError::invalid_params("Message parts cannot be empty"));
        }

        let (task, task_id, context_id) = match message.task_id.clone() {
            Some(task_id) => {
                let task = self
                    .store
                    .get_task(&task_id)
                    .await?
                    .ok_or_else(|| A2AError::task_not_found(task_id.clone()))?;

                if task.status.state.is_terminal() {
                    warn!(
                        task_id = %task_id,
                        state = %task.status.state,
                        "Send rejected: task is terminal"
                    );
                    return Err(A2AError::unsupported_operation(format!(
                        "task {} is {}; no further messages are accepted",
                        task_id, task.status.state
                    )));
                }

                let context_id = message
                    .context_id
                    .clone()
                    .unwrap_or_else(|| task.context_id.clone());
                (Some(task), task_id, context_id)
            }
            None => {
                let task_id = Uuid::new_v4().to_string();
                let context_id = message
                    .context_id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                metrics().tasks_created_total.inc();
                debug!(task_id = %task_id, context_id = %context_id, "Minted new task");
                (None, task_id, context_id)
            }
        };

        message.task_id = Some(task_id.clone());
        message.context_id = Some(context_id.clone());

        Ok(ResolvedContext {
            message,
            task,
            task_id,
            context_id,
        })
    }

    /// For continuations, persist the incoming user message into the log
    /// before any handler event is drained.
    async fn append_continuation_history(&self, resolved: &ResolvedContext) -> A2AResult<()> {
        if self.config.auto_append_history && resolved.task.is_some() {
            self.store
                .append(
                    &resolved.task_id,
                    StreamEvent::Message(resolved.message.clone()),
                    None,
                )
                .await?;
        }
        Ok(())
    }

    /// Spawn the handler worker. The worker always closes the queue when
    /// the handler returns or fails; its result is surfaced through the
    /// join handle after drainage.
    fn spawn_worker(
        &self,
        context: AgentContext,
        cancel: CancellationToken,
    ) -> (EventReceiver, JoinHandle<A2AResult<()>>) {
        let (queue, rx) = EventQueue::bounded(self.config.handler_queue_capacity);
        let handler = Arc::clone(&self.handler);
        let task_id = context.task_id.clone();

        let handle = tokio::spawn(async move {
            let result = handler.execute(context, queue.clone(), cancel).await;
            queue.close();
            if let Err(ref err) = result {
                error!(task_id = %task_id, error = %err, "Handler execution failed");
            }
            result
        });
        (rx, handle)
    }

    async fn join_worker(worker: JoinHandle<A2AResult<()>>) -> A2AResult<()> {
        match worker.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(error = %join_err, "Handler worker panicked");
                Err(A2AError::internal_error("handler worker failed"))
            }
        }
    }
}
