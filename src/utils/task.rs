//! Helpers for creating and shaping [`AgentTask`] objects.

use crate::error::{A2AError, A2AResult};
use crate::types::{AgentTask, Message};
use uuid::Uuid;

/// Mint a collision-resistant task identifier.
pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

/// Mint a collision-resistant context identifier.
pub fn new_context_id() -> String {
    Uuid::new_v4().to_string()
}

/// Creates a new task from an initial user message.
///
/// Task and context identifiers are taken from the message when present,
/// minted otherwise. The message itself is not added to history; history
/// accumulation is driven by the event log.
///
/// # Errors
///
/// `InvalidParams` when the message has no parts.
pub fn new_task(request: &Message) -> A2AResult<AgentTask> {
    if request.parts.is_empty() {
        return Err(A2AError::invalid_params("Message parts cannot be empty"));
    }

    let task_id = request.task_id.clone().unwrap_or_else(new_task_id);
    let context_id = request.context_id.clone().unwrap_or_else(new_context_id);
    Ok(AgentTask::new(task_id, context_id))
}

/// Applies a `historyLength` bound to a task's history.
///
/// - `None` leaves the history untouched.
/// - `Some(0)` drops the history entirely.
/// - `Some(n)` keeps the most recent `n` messages.
///
/// # Errors
///
/// `InvalidParams` when the length is negative.
pub fn apply_history_length(task: &mut AgentTask, history_length: Option<i32>) -> A2AResult<()> {
    let Some(length) = history_length else {
        return Ok(());
    };
    if length < 0 {
        return Err(A2AError::invalid_params(format!(
            "historyLength must be non-negative, got {}",
            length
        )));
    }
    let keep = length as usize;
    if keep == 0 {
        task.history.clear();
    } else if task.history.len() > keep {
        let drop = task.history.len() - keep;
        task.history.drain(..drop);
    }
    Ok(())
}

/// Returns the most recent history message, if any.
pub fn last_history_message(task: &AgentTask) -> Option<&Message> {
    task.history.last()
}
