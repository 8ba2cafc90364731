//! Task updater — a façade for publishing task state transitions.
//!
//! Wraps an [`EventQueue`] and provides ergonomic methods for the common
//! lifecycle transitions. Every status event is stamped with the current
//! UTC time. Terminal transitions set the `final` flag, close the queue,
//! and reject any further updates.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::types::{
    AgentTask, Artifact, Message, Part, Role, StreamEvent, TaskArtifactUpdateEvent, TaskState,
    TaskStatus, TaskStatusUpdateEvent,
};

use super::event_queue::EventQueue;

/// Publishes lifecycle events for one task.
///
/// Safe to share across workers via `Arc<TaskUpdater>`; the terminal flag
/// is guarded by a mutex.
pub struct TaskUpdater {
    queue: EventQueue,
    task_id: String,
    context_id: String,
    terminal_reached: Mutex<bool>,
}

impl TaskUpdater {
    /// Create a new updater for the given task and context.
    pub fn new(queue: EventQueue, task_id: String, context_id: String) -> Self {
        Self {
            queue,
            task_id,
            context_id,
            terminal_reached: Mutex::new(false),
        }
    }

    /// The task ID this updater publishes for.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The context ID this updater publishes for.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Whether a terminal transition has already been published.
    pub async fn is_terminal(&self) -> bool {
        *self.terminal_reached.lock().await
    }

    /// Publish the initial task snapshot in `Submitted` state.
    ///
    /// This is normally the first event a handler emits for a new task; it
    /// seeds the projection that later status and artifact updates fold
    /// into.
    pub async fn submit(&self) -> A2AResult<()> {
        let task = AgentTask::new(self.task_id.clone(), self.context_id.clone());
        self.queue.enqueue(StreamEvent::Task(task)).await?;
        debug!(task_id = %self.task_id, "Task submitted");
        Ok(())
    }

    /// Publish a status update.
    ///
    /// For terminal states the `final` flag is forced on and the queue is
    /// closed after the event is enqueued.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` when the task already reached a terminal
    /// state through this updater.
    pub async fn update_status(
        &self,
        state: TaskState,
        message: Option<Message>,
    ) -> A2AResult<()> {
        let terminal = state.is_terminal();

        {
            let mut reached = self.terminal_reached.lock().await;
            if *reached {
                warn!(
                    task_id = %self.task_id,
                    requested_state = %state,
                    "Status update after terminal state"
                );
                return Err(A2AError::unsupported_operation(format!(
                    "task {} already reached a terminal state, cannot transition to {}",
                    self.task_id, state
                )));
            }
            if terminal {
                *reached = true;
            }
        }

        let event = StreamEvent::StatusUpdate(TaskStatusUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            kind: "status-update".to_string(),
            status: TaskStatus {
                state,
                message,
                timestamp: Some(Utc::now().to_rfc3339()),
            },
            r#final: terminal,
            metadata: None,
        });
        self.queue.enqueue(event).await?;

        if terminal {
            self.queue.close();
        }

        debug!(
            task_id = %self.task_id,
            state = %state,
            terminal = terminal,
            "Status update published"
        );
        Ok(())
    }

    /// Publish an artifact update.
    ///
    /// An artifact ID is minted when not supplied. Artifact updates carry
    /// no terminal-state guard; chunks may continue while a task is
    /// working.
    pub async fn add_artifact(
        &self,
        parts: Vec<Part>,
        artifact_id: Option<String>,
        name: Option<String>,
        description: Option<String>,
        append: bool,
        last_chunk: bool,
    ) -> A2AResult<String> {
        let artifact_id = artifact_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let event = StreamEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            kind: "artifact-update".to_string(),
            artifact: Artifact {
                artifact_id: artifact_id.clone(),
                name,
                description,
                parts,
                metadata: None,
                extensions: None,
            },
            append,
            last_chunk,
            metadata: None,
        });
        self.queue.enqueue(event).await?;
        debug!(
            task_id = %self.task_id,
            artifact_id = %artifact_id,
            append = append,
            "Artifact update published"
        );
        Ok(artifact_id)
    }

    /// Publish a standalone agent message event.
    pub async fn add_message(&self, parts: Vec<Part>) -> A2AResult<()> {
        let message = self.new_agent_message(parts);
        self.queue.enqueue(StreamEvent::Message(message)).await
    }

    // ---- Lifecycle transitions ----

    /// Transition to `Working`.
    pub async fn start_work(&self, text: Option<&str>) -> A2AResult<()> {
        self.update_status(TaskState::Working, self.text_message(text))
            .await
    }

    /// Transition to `Completed`. Terminal — closes the queue.
    pub async fn complete(&self, text: Option<&str>) -> A2AResult<()> {
        self.update_status(TaskState::Completed, self.text_message(text))
            .await
    }

    /// Transition to `Failed`. Terminal — closes the queue.
    pub async fn fail(&self, text: Option<&str>) -> A2AResult<()> {
        self.update_status(TaskState::Failed, self.text_message(text))
            .await
    }

    /// Transition to `Canceled`. Terminal — closes the queue.
    pub async fn cancel(&self, text: Option<&str>) -> A2AResult<()> {
        self.update_status(TaskState::Canceled, self.text_message(text))
            .await
    }

    /// Transition to `Rejected`. Terminal — closes the queue.
    pub async fn reject(&self, text: Option<&str>) -> A2AResult<()> {
        self.update_status(TaskState::Rejected, self.text_message(text))
            .await
    }

    /// Transition to `InputRequired`, pausing the task until the user
    /// responds. The prompt message is required.
    pub async fn require_input(&self, text: &str) -> A2AResult<()> {
        self.update_status(TaskState::InputRequired, self.text_message(Some(text)))
            .await
    }

    /// Transition to `AuthRequired`. Terminal — closes the queue.
    pub async fn require_auth(&self, text: Option<&str>) -> A2AResult<()> {
        self.update_status(TaskState::AuthRequired, self.text_message(text))
            .await
    }

    /// Build an agent message bound to this task (without publishing it).
    pub fn new_agent_message(&self, parts: Vec<Part>) -> Message {
        Message {
            message_id: Uuid::new_v4().to_string(),
            role: Role::Agent,
            kind: "message".to_string(),
            parts,
            task_id: Some(self.task_id.clone()),
            context_id: Some(self.context_id.clone()),
            reference_task_ids: None,
            extensions: None,
            metadata: None,
        }
    }

    fn text_message(&self, text: Option<&str>) -> Option<Message> {
        text.map(|t| self.new_agent_message(vec![Part::text(t)]))
    }
}
