//! Constants for well-known URIs used throughout the runtime.

/// The well-known path for the agent card.
pub const AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent-card.json";

/// The previous well-known path for the agent card (deprecated, still served).
pub const PREV_AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent.json";

/// The default JSON-RPC endpoint path.
pub const DEFAULT_RPC_PATH: &str = "/a2a";
