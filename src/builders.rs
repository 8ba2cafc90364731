//! Builder patterns for ergonomic construction of runtime pieces.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::error::{A2AError, A2AResult};
use crate::server::{a2a_router, A2AServer, AgentHandler, InMemoryTaskStore, TaskStore};
use crate::types::{AgentCapabilities, AgentCard, AgentSkill};

/// Builder for constructing an [`AgentCard`] with sensible defaults.
///
/// # Example
///
/// ```
/// use a2a_runtime::builders::AgentCardBuilder;
///
/// let card = AgentCardBuilder::new("Echo Agent")
///     .description("Echoes back whatever it receives")
///     .version("1.0.0")
///     .url("http://localhost:3000/a2a")
///     .with_streaming(true)
///     .with_skill("echo", "Echo", "Repeat the input text", vec!["text".to_string()])
///     .build()
///     .unwrap();
/// assert_eq!(card.name, "Echo Agent");
/// ```
#[derive(Debug, Clone)]
pub struct AgentCardBuilder {
    name: String,
    description: String,
    version: String,
    url: String,
    capabilities: AgentCapabilities,
    default_input_modes: Vec<String>,
    default_output_modes: Vec<String>,
    skills: Vec<AgentSkill>,
    preferred_transport: Option<String>,
    protocol_version: Option<String>,
    supports_authenticated_extended_card: Option<bool>,
    documentation_url: Option<String>,
}

impl AgentCardBuilder {
    /// Create a new builder for an agent with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: "0.1.0".to_string(),
            url: String::new(),
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            skills: Vec::new(),
            preferred_transport: Some("JSONRPC".to_string()),
            protocol_version: Some("0.3.0".to_string()),
            supports_authenticated_extended_card: None,
            documentation_url: None,
        }
    }

    /// Set the agent description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the agent version string.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the primary URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Enable or disable streaming support.
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.capabilities.streaming = Some(enabled);
        self
    }

    /// Enable or disable push notification support.
    pub fn with_push_notifications(mut self, enabled: bool) -> Self {
        self.capabilities.push_notifications = Some(enabled);
        self
    }

    /// Add a skill.
    pub fn with_skill(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        self.skills.push(AgentSkill {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags,
            examples: None,
        });
        self
    }

    /// Set the default input MIME types.
    pub fn with_input_modes(mut self, modes: Vec<String>) -> Self {
        self.default_input_modes = modes;
        self
    }

    /// Set the default output MIME types.
    pub fn with_output_modes(mut self, modes: Vec<String>) -> Self {
        self.default_output_modes = modes;
        self
    }

    /// Declare authenticated extended card support.
    pub fn with_authenticated_extended_card(mut self, supported: bool) -> Self {
        self.supports_authenticated_extended_card = Some(supported);
        self
    }

    /// Set the documentation URL.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Build the [`AgentCard`].
    ///
    /// # Errors
    ///
    /// `InvalidParams` when the name is empty.
    pub fn build(self) -> A2AResult<AgentCard> {
        if self.name.is_empty() {
            return Err(A2AError::invalid_params("agent card name cannot be empty"));
        }
        Ok(AgentCard {
            name: self.name,
            description: self.description,
            version: self.version,
            url: self.url,
            capabilities: self.capabilities,
            default_input_modes: self.default_input_modes,
            default_output_modes: self.default_output_modes,
            skills: self.skills,
            preferred_transport: self.preferred_transport,
            protocol_version: self.protocol_version,
            supports_authenticated_extended_card: self.supports_authenticated_extended_card,
            documentation_url: self.documentation_url,
        })
    }
}

/// Builder that assembles a handler, store, config, and card into a ready
/// axum `Router`.
///
/// # Example
///
/// ```rust,ignore
/// let app = ServerBuilder::new(Arc::new(MyAgent))
///     .with_card(card)
///     .build_router();
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// ```
pub struct ServerBuilder {
    handler: Arc<dyn AgentHandler>,
    store: Option<Arc<dyn TaskStore>>,
    config: RuntimeConfig,
    card: Option<AgentCard>,
}

impl ServerBuilder {
    /// Create a builder for the given handler.
    pub fn new(handler: Arc<dyn AgentHandler>) -> Self {
        Self {
            handler,
            store: None,
            config: RuntimeConfig::default(),
            card: None,
        }
    }

    /// Use a custom task store (defaults to [`InMemoryTaskStore`]).
    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom runtime configuration.
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the agent card served at the well-known endpoint.
    pub fn with_card(mut self, card: AgentCard) -> Self {
        self.card = Some(card);
        self
    }

    /// Build the orchestrator alone.
    pub fn build_server(self) -> A2AServer {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        A2AServer::with_config(self.handler, store, self.config)
    }

    /// Build the orchestrator and wrap it in the full HTTP router.
    pub fn build_router(self) -> axum::Router {
        let card = self.card.clone().unwrap_or_else(|| {
            AgentCardBuilder::new("A2A Agent")
                .description("An A2A protocol agent")
                .build()
                .expect("default agent card")
        });
        let server = Arc::new(self.build_server());
        a2a_router(server, card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_builder_defaults() {
        let card = AgentCardBuilder::new("Test Agent").build().unwrap();
        assert_eq!(card.name, "Test Agent");
        assert_eq!(card.version, "0.1.0");
        assert_eq!(card.default_input_modes, vec!["text/plain"]);
        assert_eq!(card.preferred_transport.as_deref(), Some("JSONRPC"));
    }

    #[test]
    fn card_builder_rejects_empty_name() {
        let err = AgentCardBuilder::new("").build().unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_PARAMS);
    }

    #[test]
    fn card_builder_collects_skills() {
        let card = AgentCardBuilder::new("Agent")
            .with_skill("s1", "Skill", "Does things", vec!["tag".to_string()])
            .with_streaming(true)
            .build()
            .unwrap();
        assert_eq!(card.skills.len(), 1);
        assert_eq!(card.capabilities.streaming, Some(true));
    }
}
