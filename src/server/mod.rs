//! The A2A server runtime — event log, orchestrator, and protocol
//! front-ends.
//!
//! - [`AgentHandler`] trait — implement your agent logic
//! - [`AgentContext`] — execution context with task ids, message, metadata
//! - [`TaskStore`] trait + [`InMemoryTaskStore`] — versioned event log with
//!   inline projection and pub/sub fan-out
//! - [`EventQueue`] — bounded handler event channel with backpressure
//! - [`TaskUpdater`] — task state transition façade
//! - [`A2AServer`] — request-lifecycle orchestrator
//! - [`a2a_router`] — axum routes for JSON-RPC, REST, and card discovery
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use a2a_runtime::server::*;
//! use a2a_runtime::AgentCardBuilder;
//! use tokio_util::sync::CancellationToken;
//!
//! struct MyAgent;
//!
//! #[async_trait::async_trait]
//! impl AgentHandler for MyAgent {
//!     async fn execute(
//!         &self,
//!         ctx: AgentContext,
//!         queue: EventQueue,
//!         _cancel: CancellationToken,
//!     ) -> a2a_runtime::A2AResult<()> {
//!         let updater = TaskUpdater::new(queue, ctx.task_id, ctx.context_id);
//!         updater.submit().await?;
//!         updater.start_work(None).await?;
//!         updater.complete(Some("Done!")).await?;
//!         Ok(())
//!     }
//! }
//!
//! let server = Arc::new(A2AServer::new(
//!     Arc::new(MyAgent),
//!     Arc::new(InMemoryTaskStore::new()),
//! ));
//! let card = AgentCardBuilder::new("My Agent").build().unwrap();
//! let app = a2a_router(server, card);
//! ```

pub mod event_queue;
pub mod handler;
pub mod jsonrpc;
pub mod rest;
pub mod server;
pub mod store;
pub mod task_updater;

pub use event_queue::{EventQueue, EventReceiver};
pub use handler::{AgentContext, AgentHandler};
pub use jsonrpc::a2a_router;
pub use server::A2AServer;
pub use store::{apply_event, InMemoryTaskStore, TaskStore};
pub use task_updater::TaskUpdater;
