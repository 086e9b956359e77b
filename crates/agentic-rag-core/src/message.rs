//! Message envelope exchanged between the coordinator and the agents.
//!
//! Every hop in a workflow carries one [`Message`]: who sent it, who should
//! receive it, a `trace_id` correlating every message of one logical
//! request, and a [`Payload`] whose variant is the message type.
//!
//! # Wire Format
//!
//! Messages serialize to the flat JSON envelope used at the HTTP and log
//! boundaries:
//!
//! ```json
//! {
//!   "sender": "Coordinator",
//!   "receiver": "RetrievalAgent",
//!   "type": "RETRIEVAL_REQUEST",
//!   "trace_id": "0b5f1c8e-3c1e-4a53-9d5e-2f4c1d0b6a77",
//!   "payload": { "query": "what is the refund policy?" }
//! }
//! ```
//!
//! # Example
//!
//! ```rust
//! use agentic_rag_core::message::{AgentId, Message, MessageType, Payload, RetrievalRequest};
//!
//! let request = Message::new(
//!     AgentId::Coordinator,
//!     AgentId::RetrievalAgent,
//!     Payload::RetrievalRequest(RetrievalRequest { query: "hello".into() }),
//!     None,
//! );
//! assert_eq!(request.kind(), MessageType::RetrievalRequest);
//! assert!(!request.trace_id.is_empty());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ChunkRecord;

/// Identifies a participant in the message protocol.
///
/// `Coordinator` is the workflow driver itself; a message addressed to it
/// is terminal and is handed back to the caller rather than to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentId {
    Coordinator,
    IngestionAgent,
    RetrievalAgent,
    #[serde(rename = "LLMResponseAgent")]
    LlmResponseAgent,
}

impl AgentId {
    /// The protocol name of this participant.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Coordinator => "Coordinator",
            AgentId::IngestionAgent => "IngestionAgent",
            AgentId::RetrievalAgent => "RetrievalAgent",
            AgentId::LlmResponseAgent => "LLMResponseAgent",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an agent name that is not part of the protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent: {0}")]
pub struct UnknownAgent(pub String);

impl FromStr for AgentId {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Coordinator" => Ok(AgentId::Coordinator),
            "IngestionAgent" => Ok(AgentId::IngestionAgent),
            "RetrievalAgent" => Ok(AgentId::RetrievalAgent),
            "LLMResponseAgent" => Ok(AgentId::LlmResponseAgent),
            other => Err(UnknownAgent(other.to_string())),
        }
    }
}

/// The fixed message-type vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    IngestRequest,
    EmbedAndStoreRequest,
    IngestComplete,
    RetrievalRequest,
    ContextResponse,
    FinalResponse,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::IngestRequest => "INGEST_REQUEST",
            MessageType::EmbedAndStoreRequest => "EMBED_AND_STORE_REQUEST",
            MessageType::IngestComplete => "INGEST_COMPLETE",
            MessageType::RetrievalRequest => "RETRIEVAL_REQUEST",
            MessageType::ContextResponse => "CONTEXT_RESPONSE",
            MessageType::FinalResponse => "FINAL_RESPONSE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Payloads
// ═══════════════════════════════════════════════════════════════════════

/// Files to parse, chunk, and index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub file_paths: Vec<PathBuf>,
}

/// Chunks ready to be persisted in the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAndStoreRequest {
    pub chunks: Vec<ChunkRecord>,
}

/// Outcome status carried by [`IngestComplete`]. Only success is ever reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Success,
}

/// Acknowledges that a batch of chunks was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestComplete {
    pub status: IngestStatus,
    pub chunks_added: usize,
}

/// A user query to classify and, if needed, retrieve context for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
}

/// Retrieved chunks, nearest first, together with the query they answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextResponse {
    pub retrieved_context: Vec<ChunkRecord>,
    pub query: String,
}

/// The answer delivered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Message body; the variant is the message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Payload {
    IngestRequest(IngestRequest),
    EmbedAndStoreRequest(EmbedAndStoreRequest),
    IngestComplete(IngestComplete),
    RetrievalRequest(RetrievalRequest),
    ContextResponse(ContextResponse),
    FinalResponse(FinalResponse),
}

impl Payload {
    pub fn kind(&self) -> MessageType {
        match self {
            Payload::IngestRequest(_) => MessageType::IngestRequest,
            Payload::EmbedAndStoreRequest(_) => MessageType::EmbedAndStoreRequest,
            Payload::IngestComplete(_) => MessageType::IngestComplete,
            Payload::RetrievalRequest(_) => MessageType::RetrievalRequest,
            Payload::ContextResponse(_) => MessageType::ContextResponse,
            Payload::FinalResponse(_) => MessageType::FinalResponse,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Message
// ═══════════════════════════════════════════════════════════════════════

/// One hop of a workflow.
///
/// Messages are treated as immutable snapshots: agents read the inbound
/// message by reference and build a new one for their reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: AgentId,
    pub receiver: AgentId,
    pub trace_id: String,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Message {
    /// Create a message, generating a fresh UUIDv4 `trace_id` when none is given.
    pub fn new(
        sender: AgentId,
        receiver: AgentId,
        payload: Payload,
        trace_id: Option<String>,
    ) -> Self {
        Self {
            sender,
            receiver,
            trace_id: trace_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            payload,
        }
    }

    /// Build a response to `self`, carrying its `trace_id` forward unchanged.
    pub fn reply(&self, sender: AgentId, receiver: AgentId, payload: Payload) -> Self {
        Self::new(sender, receiver, payload, Some(self.trace_id.clone()))
    }

    pub fn kind(&self) -> MessageType {
        self.payload.kind()
    }
}
