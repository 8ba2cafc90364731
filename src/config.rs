//! Runtime configuration for the orchestrator.

use crate::types::AgentCard;

/// Default capacity of the per-request handler event queue.
pub const DEFAULT_HANDLER_QUEUE_CAPACITY: usize = 16;

/// Knobs controlling how the orchestrator materializes handler output.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Persist every handler event into the task's event log as it is
    /// drained. Disabling this turns the runtime into a pure relay.
    pub auto_persist_events: bool,

    /// When a request continues an existing task, append the incoming user
    /// message to the task history before draining handler events.
    pub auto_append_history: bool,

    /// Capacity of the bounded handler event queue. Writers block when the
    /// queue is full.
    pub handler_queue_capacity: usize,

    /// Card served for `agent/getAuthenticatedExtendedCard`. When absent
    /// the endpoint fails with `ExtendedAgentCardNotConfigured`.
    pub extended_agent_card: Option<AgentCard>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            auto_persist_events: true,
            auto_append_history: true,
            handler_queue_capacity: DEFAULT_HANDLER_QUEUE_CAPACITY,
            extended_agent_card: None,
        }
    }
}

impl RuntimeConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether handler events are persisted as they are drained.
    pub fn with_auto_persist_events(mut self, enabled: bool) -> Self {
        self.auto_persist_events = enabled;
        self
    }

    /// Set whether continuation requests append the user message to history.
    pub fn with_auto_append_history(mut self, enabled: bool) -> Self {
        self.auto_append_history = enabled;
        self
    }

    /// Set the handler event queue capacity.
    pub fn with_handler_queue_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than 0");
        self.handler_queue_capacity = capacity;
        self
    }

    /// Configure the authenticated extended agent card.
    pub fn with_extended_agent_card(mut self, card: AgentCard) -> Self {
        self.extended_agent_card = Some(card);
        self
    }
}
