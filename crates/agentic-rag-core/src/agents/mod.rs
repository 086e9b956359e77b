//! Pipeline agents.
//!
//! An agent accepts one [`Message`] and returns at most one message in
//! reply. Agents never hold references to each other: every reply names
//! its receiver and goes back through the [`Router`](crate::router::Router).
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐  EMBED_AND_STORE_REQUEST  ┌────────────────┐
//! │ IngestionAgent │──────────────────────────▶│ RetrievalAgent │──┐
//! └────────────────┘                           └───────┬────────┘  │ INGEST_COMPLETE
//!         ▲ INGEST_REQUEST                             │           │ FINAL_RESPONSE (greeting)
//!         │                         CONTEXT_RESPONSE   ▼           ▼
//!   Coordinator ◀──── FINAL_RESPONSE ──── ┌──────────────────┐  Coordinator
//!                                         │ LlmResponseAgent │
//!                                         └──────────────────┘
//! ```
//!
//! # Agents
//!
//! | Agent | Accepts | Replies |
//! |-------|---------|---------|
//! | [`IngestionAgent`] | `INGEST_REQUEST` | `EMBED_AND_STORE_REQUEST` |
//! | [`RetrievalAgent`] | `EMBED_AND_STORE_REQUEST`, `RETRIEVAL_REQUEST` | `INGEST_COMPLETE`, `FINAL_RESPONSE`, `CONTEXT_RESPONSE` |
//! | [`LlmResponseAgent`] | `CONTEXT_RESPONSE` | `FINAL_RESPONSE` |

mod ingestion;
mod response;
mod retrieval;

pub use ingestion::IngestionAgent;
pub use response::{
    LlmResponseAgent, GENERATION_FAILED_ANSWER, MODEL_NOT_CONFIGURED_ANSWER, NO_CONTEXT_ANSWER,
};
pub use retrieval::{RetrievalAgent, DEFAULT_TOP_K, GREETING_ANSWER};

use async_trait::async_trait;
use serde::Serialize;

use crate::message::{AgentId, Message};

/// A participant in the message protocol.
///
/// # Contract
///
/// - `process_message` must not mutate shared state visible through the
///   inbound message; it builds a fresh reply.
/// - Every reply copies the inbound `trace_id` (use [`Message::reply`]).
/// - A message type the agent does not handle yields `None`.
/// - Collaborator failures are handled inside the agent and never surface
///   as a panic or error to the caller.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The protocol identity this agent is registered under.
    fn id(&self) -> AgentId;

    /// Returns a one-line description for discovery.
    fn description(&self) -> &str;

    /// Handle one inbound message, returning the reply if there is one.
    async fn process_message(&self, message: &Message) -> Option<Message>;
}

/// Serializable agent info for the `/agents` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
}

impl AgentInfo {
    pub fn of(agent: &dyn Agent) -> Self {
        Self {
            name: agent.id().to_string(),
            description: agent.description().to_string(),
        }
    }
}
