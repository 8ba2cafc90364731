//! # a2a-runtime — server-side runtime for the Agent-to-Agent (A2A) protocol
//!
//! A request-dispatch, task-lifecycle, and event-streaming engine. Client
//! applications send a user message; the runtime binds it to a logical
//! *task*, invokes user-supplied agent logic on a worker, streams the
//! emitted lifecycle events (status transitions, artifact chunks,
//! messages) back to the caller over a single-shot RPC or a Server-Sent
//! Events stream, and persists every event into a per-task append-only
//! log from which the current task state is projected.
//!
//! ## Architecture
//!
//! Four subsystems, leaves first:
//!
//! - **Event log + projection** ([`server::store`]) — an append-only,
//!   versioned, per-task log of [`types::StreamEvent`]s with an inline
//!   fold maintaining the current [`types::AgentTask`]. The source of
//!   truth.
//! - **Pub/sub fan-out** (also [`server::store`]) — per-task subscriber
//!   queues with catch-up-then-live tailing, version-deduplicated,
//!   terminating on terminal states.
//! - **Orchestrator** ([`server::A2AServer`]) — resolves context, enforces
//!   the state machine, spawns one handler worker per send, persists
//!   events as they flow, and materializes responses.
//! - **Protocol front-end** ([`server::jsonrpc`], [`server::rest`]) —
//!   JSON-RPC 2.0 and REST dispatch over axum, sharing one error taxonomy
//!   and SSE formatting.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use a2a_runtime::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! struct EchoAgent;
//!
//! #[async_trait::async_trait]
//! impl AgentHandler for EchoAgent {
//!     async fn execute(
//!         &self,
//!         ctx: AgentContext,
//!         queue: EventQueue,
//!         _cancel: CancellationToken,
//!     ) -> A2AResult<()> {
//!         let updater = TaskUpdater::new(queue, ctx.task_id.clone(), ctx.context_id.clone());
//!         updater.submit().await?;
//!         updater.start_work(None).await?;
//!         updater.complete(Some(&format!("Echo: {}", ctx.user_input(" ")))).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let card = AgentCardBuilder::new("Echo Agent")
//!         .description("Echoes back whatever it receives")
//!         .url("http://localhost:3000/a2a")
//!         .with_streaming(true)
//!         .build()?;
//!
//!     let app = ServerBuilder::new(Arc::new(EchoAgent))
//!         .with_card(card)
//!         .build_router();
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! The router serves:
//! - `POST /a2a` — JSON-RPC 2.0 (`message/send`, `message/stream`,
//!   `tasks/get`, `tasks/list`, `tasks/cancel`, `tasks/subscribe`,
//!   `tasks/resubscribe`, push-notification config methods, and
//!   `agent/getAuthenticatedExtendedCard`)
//! - `GET /.well-known/agent-card.json` — agent card discovery
//! - `/v1/…` — the REST surface (`/v1/card`, `/v1/message:send`,
//!   `/v1/message:stream`, `/v1/tasks`, `/v1/tasks/{id}`,
//!   `/v1/tasks/{id}:cancel`, push-notification config routes)

pub mod builders;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod types;
pub mod utils;

/// Prelude that re-exports the most frequently used types.
pub mod prelude {
    pub use crate::builders::{AgentCardBuilder, ServerBuilder};
    pub use crate::config::RuntimeConfig;
    pub use crate::error::{A2AError, A2AResult};
    pub use crate::server::{
        a2a_router, A2AServer, AgentContext, AgentHandler, EventQueue, EventReceiver,
        InMemoryTaskStore, TaskStore, TaskUpdater,
    };
    pub use crate::types::{
        AgentCapabilities, AgentCard, AgentSkill, AgentTask, Artifact, EventEnvelope,
        FileContent, FileWithBytes, FileWithUri, Message, Part, Role, SendMessageParams,
        SendMessageResponse, StreamEvent, TaskArtifactUpdateEvent, TaskState, TaskStatus,
        TaskStatusUpdateEvent,
    };
}

pub use builders::{AgentCardBuilder, ServerBuilder};
pub use config::RuntimeConfig;
pub use error::{A2AError, A2AResult};
pub use types::*;
