//! Helpers for creating and reading [`Message`] objects.

use crate::types::{Message, Part, Role};
use crate::utils::parts::get_text_parts;
use uuid::Uuid;

/// Creates a new agent message containing a single text part.
///
/// # Example
///
/// ```
/// use a2a_runtime::utils::new_agent_text_message;
///
/// let message = new_agent_text_message("Hello", None::<String>, None::<String>);
/// assert_eq!(message.role, a2a_runtime::types::Role::Agent);
/// ```
pub fn new_agent_text_message(
    text: impl Into<String>,
    context_id: Option<impl Into<String>>,
    task_id: Option<impl Into<String>>,
) -> Message {
    new_agent_parts_message(vec![Part::text(text)], context_id, task_id)
}

/// Creates a new agent message from a list of parts.
pub fn new_agent_parts_message(
    parts: Vec<Part>,
    context_id: Option<impl Into<String>>,
    task_id: Option<impl Into<String>>,
) -> Message {
    Message {
        message_id: Uuid::new_v4().to_string(),
        role: Role::Agent,
        kind: "message".to_string(),
        parts,
        task_id: task_id.map(|id| id.into()),
        context_id: context_id.map(|id| id.into()),
        reference_task_ids: None,
        extensions: None,
        metadata: None,
    }
}

/// Creates a new user message containing a single text part.
pub fn new_user_text_message(
    text: impl Into<String>,
    context_id: Option<impl Into<String>>,
    task_id: Option<impl Into<String>>,
) -> Message {
    Message {
        message_id: Uuid::new_v4().to_string(),
        role: Role::User,
        kind: "message".to_string(),
        parts: vec![Part::text(text)],
        task_id: task_id.map(|id| id.into()),
        context_id: context_id.map(|id| id.into()),
        reference_task_ids: None,
        extensions: None,
        metadata: None,
    }
}

/// Extracts and joins all text content from a message's parts.
pub fn get_message_text(message: &Message, delimiter: &str) -> String {
    get_text_parts(&message.parts).join(delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn agent_text_message_basics() {
        let message = new_agent_text_message("Hello", None::<String>, None::<String>);
        assert_eq!(message.role, Role::Agent);
        assert_eq!(message.parts.len(), 1);
        assert!(Uuid::parse_str(&message.message_id).is_ok());
        assert!(message.context_id.is_none());
        assert!(message.task_id.is_none());
    }

    #[test]
    fn parts_message_carries_ids() {
        let message =
            new_agent_parts_message(vec![Part::text("x")], Some("ctx-1"), Some("task-1"));
        assert_eq!(message.context_id, Some("ctx-1".to_string()));
        assert_eq!(message.task_id, Some("task-1".to_string()));
    }

    #[test]
    fn user_text_message_role() {
        let message = new_user_text_message("hi", None::<String>, None::<String>);
        assert_eq!(message.role, Role::User);
    }

    #[test]
    fn message_text_empty_when_no_text_parts() {
        let message = new_agent_parts_message(Vec::new(), None::<String>, None::<String>);
        assert_eq!(get_message_text(&message, "\n"), "");
    }
}
