//! Agent handler trait — the integration point for user-supplied agent
//! logic.
//!
//! Implementors read the incoming [`AgentContext`] and publish lifecycle
//! events (status updates, artifacts, messages, task snapshots) to the
//! [`EventQueue`]. The orchestrator spawns one worker per send, detects
//! completion through queue closure, and surfaces handler errors to the
//! caller after the queue is drained.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::A2AResult;
use crate::types::{AgentTask, Message, Part};

use super::event_queue::EventQueue;
use super::task_updater::TaskUpdater;

/// Per-request execution context handed to the handler.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// The incoming user message that triggered this execution. For cancel
    /// requests this is the last history message or an empty placeholder.
    pub message: Message,

    /// The existing task when this request continues one; `None` for new
    /// tasks.
    pub task: Option<AgentTask>,

    /// Unique identifier for this task.
    pub task_id: String,

    /// Conversation context identifier.
    pub context_id: String,

    /// Whether the caller is consuming a live event stream.
    pub is_streaming: bool,

    /// Optional metadata from the client request.
    pub metadata: Option<serde_json::Value>,
}

impl AgentContext {
    /// Whether this request continues an existing task.
    pub fn is_continuation(&self) -> bool {
        self.task.is_some()
    }

    /// Extracts the text content of the user message, joined by
    /// `delimiter`. Empty when the message has no text parts.
    pub fn user_input(&self, delimiter: &str) -> String {
        self.message
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

/// Core trait for agent logic.
///
/// # Example
///
/// ```rust,ignore
/// use a2a_runtime::server::{AgentHandler, AgentContext, EventQueue, TaskUpdater};
/// use a2a_runtime::error::A2AResult;
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
///
/// struct EchoAgent;
///
/// #[async_trait]
/// impl AgentHandler for EchoAgent {
///     async fn execute(
///         &self,
///         context: AgentContext,
///         queue: EventQueue,
///         _cancel: CancellationToken,
///     ) -> A2AResult<()> {
///         let updater = TaskUpdater::new(queue, context.task_id, context.context_id);
///         updater.submit().await?;
///         updater.start_work(None).await?;
///         updater.complete(Some(&format!("Echo: {}", context.user_input(" ")))).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait AgentHandler: Send + Sync {
    /// Execute the agent's logic for a request.
    ///
    /// Write any number of events to `queue`; the orchestrator persists
    /// and forwards them. Observe `cancel` cooperatively for shutdown. The
    /// worker closes the queue when this method returns, so there is no
    /// need to close it here unless finishing early.
    async fn execute(
        &self,
        context: AgentContext,
        queue: EventQueue,
        cancel: CancellationToken,
    ) -> A2AResult<()>;

    /// Request cancellation of an ongoing task.
    ///
    /// The default implementation publishes a `Canceled` status update and
    /// closes the queue.
    async fn cancel(
        &self,
        context: AgentContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        let updater = TaskUpdater::new(queue, context.task_id, context.context_id);
        updater.cancel(None).await
    }
}
