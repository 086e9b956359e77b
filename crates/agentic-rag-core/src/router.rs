//! Coordinator dispatch table.
//!
//! The [`Router`] maps a message's `receiver` to the registered agent that
//! handles it. It performs exactly one hop per [`route`](Router::route)
//! call and never forwards a reply on its own: the workflow driver decides
//! how many hops a request takes.
//!
//! # Usage
//!
//! ```rust
//! use agentic_rag_core::message::{AgentId, Message, Payload, RetrievalRequest};
//! use agentic_rag_core::router::Router;
//!
//! # async fn example() {
//! let router = Router::new();
//! let m = Message::new(
//!     AgentId::RetrievalAgent,
//!     AgentId::Coordinator,
//!     Payload::RetrievalRequest(RetrievalRequest { query: "q".into() }),
//!     None,
//! );
//! // Messages addressed to the coordinator come straight back.
//! assert_eq!(router.route(&m).await, Some(m.clone()));
//! # }
//! ```

use tracing::{debug, warn};

use crate::agents::{Agent, AgentInfo};
use crate::message::{AgentId, Message};

/// Registry of agents keyed by [`AgentId`].
pub struct Router {
    agents: Vec<Box<dyn Agent>>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Register an agent, replacing any agent already registered under the same id.
    ///
    /// Registering under [`AgentId::Coordinator`] is ignored: the coordinator
    /// is always the terminal sink.
    pub fn register(&mut self, agent: Box<dyn Agent>) {
        if agent.id() == AgentId::Coordinator {
            warn!("refusing to register an agent as the Coordinator");
            return;
        }
        self.agents.retain(|a| a.id() != agent.id());
        self.agents.push(agent);
    }

    /// Builder-style [`register`](Router::register).
    pub fn with(mut self, agent: Box<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    /// Find an agent by id.
    pub fn find(&self, id: AgentId) -> Option<&dyn Agent> {
        self.agents
            .iter()
            .find(|a| a.id() == id)
            .map(|a| a.as_ref())
    }

    /// Discovery info for every registered agent.
    pub fn agents(&self) -> Vec<AgentInfo> {
        self.agents.iter().map(|a| AgentInfo::of(a.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Deliver one message and return the result of that single hop.
    ///
    /// - Receiver is a registered agent: that agent's reply (possibly `None`).
    /// - Receiver is the coordinator: the message itself, unchanged.
    /// - Receiver is not registered: `None`.
    pub async fn route(&self, message: &Message) -> Option<Message> {
        debug!(
            trace_id = %message.trace_id,
            sender = %message.sender,
            receiver = %message.receiver,
            kind = %message.kind(),
            "routing message"
        );

        if message.receiver == AgentId::Coordinator {
            return Some(message.clone());
        }

        match self.find(message.receiver) {
            Some(agent) => agent.process_message(message).await,
            None => {
                warn!(
                    trace_id = %message.trace_id,
                    receiver = %message.receiver,
                    "no agent registered for receiver"
                );
                None
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
